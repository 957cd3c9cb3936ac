//! Per-application JSON records, one `<repo>.json` per tracked AppImage.

use crate::error::ConfigError;
use crate::model::{AppRecord, InstallChoice};
use clap::ValueEnum;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_CONFIG_DIR: &str = "config_files/";
pub const DEFAULT_APP_FOLDER: &str = "~/Documents/appimages";
pub const DEFAULT_BACKUP_FOLDER: &str = "~/Documents/appimages/backup";

/// Expands a leading `~` to the home directory.
pub fn expand_home(path: &str) -> String {
    shellexpand::tilde(path).into_owned()
}

/// Record fields that can be edited after setup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EditableField {
    ShaName,
    HashType,
    Choice,
    Folder,
    FolderBackup,
}

impl EditableField {
    pub const ALL: [EditableField; 5] = [
        Self::ShaName,
        Self::HashType,
        Self::Choice,
        Self::Folder,
        Self::FolderBackup,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::ShaName => "sha_name",
            Self::HashType => "hash_type",
            Self::Choice => "choice",
            Self::Folder => "folder",
            Self::FolderBackup => "folder_backup",
        }
    }

    pub fn apply(self, record: &mut AppRecord, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match self {
            Self::ShaName => record.sha_name = Some(value.to_string()),
            Self::HashType => record.hash_type = value.to_string(),
            Self::Choice => {
                let choice = value
                    .parse::<u8>()
                    .ok()
                    .and_then(|n| InstallChoice::try_from(n).ok())
                    .ok_or_else(|| ConfigError::InvalidValue {
                        field: "choice",
                        value: value.to_string(),
                    })?;
                record.choice = Some(choice);
            }
            Self::Folder => record.folder = with_trailing_slash(value),
            Self::FolderBackup => record.folder_backup = with_trailing_slash(value),
        }
        Ok(())
    }
}

fn with_trailing_slash(value: &str) -> String {
    if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{value}/")
    }
}

pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, repo: &str) -> PathBuf {
        self.dir.join(format!("{repo}.json"))
    }

    /// Repo names of all records, sorted. A missing directory is empty.
    pub fn list(&self) -> Result<Vec<String>, ConfigError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };
        let mut repos: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        repos.sort();
        Ok(repos)
    }

    pub fn load(&self, repo: &str) -> Result<AppRecord, ConfigError> {
        let path = self.path_for(repo);
        let text = fs::read_to_string(&path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                ConfigError::NotFound(path.clone())
            } else {
                ConfigError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        let mut record: AppRecord =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
        validate(&record, &path)?;
        record.folder = expand_home(&record.folder);
        record.folder_backup = expand_home(&record.folder_backup);
        debug!("loaded {}", path.display());
        Ok(record)
    }

    /// Loads every record; broken files are reported and skipped.
    pub fn load_all(&self) -> Result<Vec<AppRecord>, ConfigError> {
        let mut records = Vec::new();
        for repo in self.list()? {
            match self.load(&repo) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("skipping {repo}: {e}");
                    println!("Skipping {repo}: {e}");
                }
            }
        }
        Ok(records)
    }

    /// Writes the record to `<repo>.json`, replacing the file.
    pub fn save(&self, record: &AppRecord) -> Result<PathBuf, ConfigError> {
        let path = self.path_for(&record.repo);
        let io_err = |source| ConfigError::Io {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let json = serde_json::to_string_pretty(record).map_err(|source| {
            ConfigError::Serialize {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(&path, json).map_err(io_err)?;
        Ok(path)
    }

    pub fn update_field(
        &self,
        repo: &str,
        field: EditableField,
        value: &str,
    ) -> Result<AppRecord, ConfigError> {
        let mut record = self.load(repo)?;
        field.apply(&mut record, value)?;
        self.save(&record)?;
        Ok(record)
    }
}

/// Once a record carries a `choice` it has been installed and must identify
/// its release.
fn validate(record: &AppRecord, path: &Path) -> Result<(), ConfigError> {
    if record.choice.is_none() {
        return Ok(());
    }
    let required = [
        ("owner", &record.owner),
        ("repo", &record.repo),
        ("appimage_name", &record.appimage_name),
        ("version", &record.version),
    ];
    for (field, value) in required {
        if value.is_empty() {
            return Err(ConfigError::MissingField {
                path: path.to_path_buf(),
                field,
            });
        }
    }
    Ok(())
}

/// `repo -> version` as recorded in the config files.
pub fn external_versions(records: &[AppRecord]) -> HashMap<String, String> {
    records
        .iter()
        .map(|r| (r.repo.clone(), r.version.clone()))
        .collect()
}
