//! GitHub "latest release" lookups and the version gate.

use crate::error::ReleaseError;
use crate::filter::release_info;
use crate::model::{InstallChoice, Release, ReleaseInfo};
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Per-request timeout for API calls; also the connect timeout for downloads.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("appimage-updater/", env!("CARGO_PKG_VERSION"));

/// Anything that can answer "what is the latest release of owner/repo".
pub trait ReleaseSource {
    fn latest_release(&self, owner: &str, repo: &str) -> Result<ReleaseInfo, ReleaseError>;
}

pub struct GitHubClient {
    client: Client,
    base_url: String,
}

impl GitHubClient {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Shared HTTP client, reused for asset downloads.
    pub fn http(&self) -> &Client {
        &self.client
    }

    pub fn latest_release_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/repos/{}/{}/releases/latest", self.base_url, owner, repo)
    }
}

impl ReleaseSource for GitHubClient {
    fn latest_release(&self, owner: &str, repo: &str) -> Result<ReleaseInfo, ReleaseError> {
        let url = self.latest_release_url(owner, repo);
        debug!("querying {url}");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .timeout(REQUEST_TIMEOUT)
            .send()
            .map_err(|source| ReleaseError::Network {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!("GitHub API returned status {}: {}", status, url);
            return Err(ReleaseError::Status { url, status });
        }

        let release: Release = response
            .json()
            .map_err(|source| ReleaseError::InvalidResponse {
                url: url.clone(),
                source,
            })?;

        Ok(release_info(&release))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionStatus {
    UpToDate,
    Outdated { current: String, latest: String },
    /// Initial-install records are not gated.
    NotChecked,
}

/// Version gate for update-check records. Plain string equality: "1.0" and
/// "1.0.0" count as different versions.
pub fn check_version(choice: Option<InstallChoice>, recorded: &str, latest: &str) -> VersionStatus {
    match choice {
        Some(c) if c.is_update_check() => {
            if recorded == latest {
                VersionStatus::UpToDate
            } else {
                VersionStatus::Outdated {
                    current: recorded.to_string(),
                    latest: latest.to_string(),
                }
            }
        }
        _ => VersionStatus::NotChecked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[test]
    fn latest_release_strips_v_and_selects_assets() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/repos/laurent22/joplin/releases/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "tag_name": "v3.0.15",
                    "assets": [
                        {"name": "Joplin-3.0.15.dmg",
                         "browser_download_url": "https://dl/Joplin-3.0.15.dmg"},
                        {"name": "Joplin-3.0.15.AppImage",
                         "browser_download_url": "https://dl/Joplin-3.0.15.AppImage"},
                        {"name": "latest-linux.yml",
                         "browser_download_url": "https://dl/latest-linux.yml"}
                    ]
                }"#,
            )
            .create();

        let client = GitHubClient::new(&server.url()).unwrap();
        let info = client.latest_release("laurent22", "joplin").unwrap();

        mock.assert();
        assert_eq!(info.version, "3.0.15");
        let appimage = info.appimage.unwrap();
        assert_eq!(appimage.name, "Joplin-3.0.15.AppImage");
        assert_eq!(appimage.url, "https://dl/Joplin-3.0.15.AppImage");
        assert_eq!(info.checksum.unwrap().name, "latest-linux.yml");
    }

    #[test]
    fn release_without_appimage_is_not_an_error() {
        let mut server = Server::new();
        let _mock = server
            .mock("GET", "/repos/o/r/releases/latest")
            .with_status(200)
            .with_body(r#"{"tag_name": "1.0", "assets": []}"#)
            .create();

        let client = GitHubClient::new(&server.url()).unwrap();
        let info = client.latest_release("o", "r").unwrap();

        assert_eq!(info.version, "1.0");
        assert!(info.appimage.is_none());
        assert!(info.checksum.is_none());
    }

    #[test]
    fn non_200_reports_the_requested_url() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/repos/nobody/nothing/releases/latest")
            .with_status(404)
            .with_body(r#"{"message": "Not Found"}"#)
            .expect(1)
            .create();

        let client = GitHubClient::new(&server.url()).unwrap();
        let err = client.latest_release("nobody", "nothing").unwrap_err();

        mock.assert();
        match err {
            ReleaseError::Status { url, status } => {
                assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
                assert!(url.ends_with("/repos/nobody/nothing/releases/latest"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn garbage_body_is_invalid_response() {
        let mut server = Server::new();
        let _mock = server
            .mock("GET", "/repos/o/r/releases/latest")
            .with_status(200)
            .with_body("not json")
            .create();

        let client = GitHubClient::new(&server.url()).unwrap();
        let err = client.latest_release("o", "r").unwrap_err();
        assert!(matches!(err, ReleaseError::InvalidResponse { .. }));
    }

    #[test]
    fn gate_uses_plain_string_equality() {
        let update = Some(InstallChoice::UpdateKeepBackup);
        assert_eq!(check_version(update, "1.0.0", "1.0.0"), VersionStatus::UpToDate);
        assert_eq!(
            check_version(update, "1.0", "1.0.0"),
            VersionStatus::Outdated {
                current: "1.0".to_string(),
                latest: "1.0.0".to_string()
            }
        );
    }

    #[test]
    fn gate_skips_install_mode_records() {
        assert_eq!(
            check_version(Some(InstallChoice::InstallNoBackup), "1.0.0", "1.0.0"),
            VersionStatus::NotChecked
        );
        assert_eq!(check_version(None, "", "2.0"), VersionStatus::NotChecked);
    }
}
