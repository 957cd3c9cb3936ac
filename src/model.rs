use serde::{Deserialize, Serialize};
use std::fmt;

/// One tracked application, stored as `<repo>.json` in the config directory.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppRecord {
    pub owner: String,
    pub repo: String,
    #[serde(alias = "appimage")]
    pub appimage_name: String,
    pub version: String,
    #[serde(alias = "sha", skip_serializing_if = "Option::is_none")]
    pub sha_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha_url: Option<String>,
    pub hash_type: String,
    #[serde(alias = "appimage_folder")]
    pub folder: String,
    #[serde(alias = "appimage_folder_backup")]
    pub folder_backup: String,
    pub choice: Option<InstallChoice>,
}

/// Install policy stored in the record's `choice` field (1..=4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum InstallChoice {
    InstallKeepBackup = 1,
    InstallNoBackup = 2,
    UpdateKeepBackup = 3,
    UpdateNoBackup = 4,
}

impl InstallChoice {
    pub fn is_update_check(self) -> bool {
        matches!(self, Self::UpdateKeepBackup | Self::UpdateNoBackup)
    }

    pub fn keeps_backup(self) -> bool {
        matches!(self, Self::InstallKeepBackup | Self::UpdateKeepBackup)
    }

    /// After the first successful install a record switches to update-check mode.
    pub fn into_update_check(self) -> Self {
        match self {
            Self::InstallKeepBackup => Self::UpdateKeepBackup,
            Self::InstallNoBackup => Self::UpdateNoBackup,
            other => other,
        }
    }
}

impl TryFrom<u8> for InstallChoice {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::InstallKeepBackup),
            2 => Ok(Self::InstallNoBackup),
            3 => Ok(Self::UpdateKeepBackup),
            4 => Ok(Self::UpdateNoBackup),
            other => Err(format!("choice must be between 1 and 4, got {other}")),
        }
    }
}

impl From<InstallChoice> for u8 {
    fn from(choice: InstallChoice) -> Self {
        choice as u8
    }
}

/// Subset of the GitHub `releases/latest` payload.
#[derive(Debug, Deserialize, Clone)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub name: String,
    pub url: String,
}

/// What a release query yields for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub version: String,
    pub appimage: Option<AssetRef>,
    pub checksum: Option<AssetRef>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    #[serde(default)]
    pub owner: String,
    pub version: String,
    pub appimage_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discrepancy {
    pub repo: String,
    pub ledger_version: String,
    pub external_version: String,
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Discrepancy in {}: versions.json={}, config_files={}",
            self.repo, self.ledger_version, self.external_version
        )
    }
}

/// One row of the `check` report.
#[derive(Debug, Serialize, Clone)]
pub struct CheckRow {
    pub repo: String,
    pub owner: String,
    pub current: String,
    pub latest: Option<String>,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_accepts_legacy_field_names() {
        let record: AppRecord = serde_json::from_value(json!({
            "owner": "mockOwner",
            "repo": "mockRepo",
            "appimage": "mockRepo-1.0.0.AppImage",
            "version": "1.0.0",
            "sha": "mock-latest-linux.yml",
            "hash_type": "sha512",
            "choice": 2,
            "appimage_folder_backup": "~/Documents/mockAppimages/backup/",
            "appimage_folder": "~/Documents/mockAppimages/"
        }))
        .unwrap();

        assert_eq!(record.appimage_name, "mockRepo-1.0.0.AppImage");
        assert_eq!(record.sha_name.as_deref(), Some("mock-latest-linux.yml"));
        assert_eq!(record.folder, "~/Documents/mockAppimages/");
        assert_eq!(record.choice, Some(InstallChoice::InstallNoBackup));
    }

    #[test]
    fn record_rejects_out_of_range_choice() {
        let result = serde_json::from_value::<AppRecord>(json!({ "repo": "x", "choice": 7 }));
        assert!(result.is_err());
    }

    #[test]
    fn choice_serializes_as_integer() {
        let record = AppRecord {
            choice: Some(InstallChoice::UpdateKeepBackup),
            ..Default::default()
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["choice"], json!(3));
    }

    #[test]
    fn install_choices_switch_to_update_mode() {
        assert_eq!(
            InstallChoice::InstallKeepBackup.into_update_check(),
            InstallChoice::UpdateKeepBackup
        );
        assert_eq!(
            InstallChoice::InstallNoBackup.into_update_check(),
            InstallChoice::UpdateNoBackup
        );
        assert!(InstallChoice::UpdateNoBackup.is_update_check());
        assert!(!InstallChoice::UpdateNoBackup.keeps_backup());
    }
}
