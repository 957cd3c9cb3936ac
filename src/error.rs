use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("API request failed with status {status}: {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("API error for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid release payload from {url}: {source}")]
    InvalidResponse {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download failed with status {status}: {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("download error for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{algorithm} checksum mismatch for {name}")]
    ChecksumMismatch { name: String, algorithm: String },

    #[error("progress bar template: {0}")]
    Progress(#[from] indicatif::style::TemplateError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot serialize {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} is missing required field `{field}`", path.display())]
    MissingField { path: PathBuf, field: &'static str },

    #[error("invalid value {value:?} for {field}")]
    InvalidValue { field: &'static str, value: String },

    #[error("not a GitHub repository URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("no valid input after {attempts} attempts")]
    Exhausted { attempts: usize },

    #[error("input closed")]
    Eof,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure of one application's install or update; the batch continues.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error(transparent)]
    Release(#[from] ReleaseError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no AppImage asset in the latest release of {owner}/{repo}")]
    NoAppImage { owner: String, repo: String },
}
