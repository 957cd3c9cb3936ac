//! `versions.json`: the last known release of every tracked repository.
//!
//! Entries are keyed by repository name alone, so two owners publishing a
//! repository with the same name share one entry. Every change rewrites the
//! whole file; there is no merge with concurrent writers.

use crate::config::expand_home;
use crate::error::{ConfigError, InstallError};
use crate::model::{AppRecord, Discrepancy, LedgerEntry, ReleaseInfo};
use crate::release::ReleaseSource;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const LEDGER_FILE: &str = "versions.json";

#[derive(Debug)]
pub struct VersionLedger {
    path: PathBuf,
    versions: BTreeMap<String, LedgerEntry>,
    /// Parse error of a malformed file that was replaced by an empty ledger.
    recovered_from: Option<String>,
}

/// Result of querying one record during [`VersionLedger::fetch_and_record_all`].
#[derive(Debug)]
pub struct RecordOutcome {
    pub repo: String,
    pub result: Result<ReleaseInfo, InstallError>,
}

impl VersionLedger {
    /// Opens `<app_folder>/versions.json`. A missing file gives an empty
    /// ledger; so does a malformed one, with a warning.
    pub fn load(app_folder: &str) -> Result<Self, ConfigError> {
        let path = Path::new(&expand_home(app_folder)).join(LEDGER_FILE);
        Self::load_from(path)
    }

    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        let mut recovered_from = None;
        let versions = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(versions) => versions,
                Err(e) => {
                    warn!("ignoring malformed {}: {e}", path.display());
                    recovered_from = Some(e.to_string());
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no ledger at {}", path.display());
                BTreeMap::new()
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        Ok(Self {
            path,
            versions,
            recovered_from,
        })
    }

    /// Set when the file on disk was malformed and loading fell back to empty.
    pub fn recovered_from(&self) -> Option<&str> {
        self.recovered_from.as_deref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, repo: &str) -> Option<&LedgerEntry> {
        self.versions.get(repo)
    }

    /// Overwrites the entry for `repo` and persists immediately.
    pub fn add_or_update(
        &mut self,
        owner: &str,
        repo: &str,
        version: &str,
        appimage_name: &str,
    ) -> Result<(), ConfigError> {
        self.versions.insert(
            repo.to_string(),
            LedgerEntry {
                owner: owner.to_string(),
                version: version.to_string(),
                appimage_name: appimage_name.to_string(),
            },
        );
        self.save()
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json =
            serde_json::to_string_pretty(&self.versions).map_err(|source| ConfigError::Serialize {
                path: self.path.clone(),
                source,
            })?;
        fs::write(&self.path, json).map_err(io_err)?;
        info!("saved app versions to {}", self.path.display());
        Ok(())
    }

    /// Ledger entries whose repo appears in `external` with another version.
    /// Keys present on only one side are ignored.
    pub fn reconcile(&self, external: &HashMap<String, String>) -> Vec<Discrepancy> {
        self.versions
            .iter()
            .filter_map(|(repo, entry)| {
                let external_version = external.get(repo)?;
                (external_version != &entry.version).then(|| Discrepancy {
                    repo: repo.clone(),
                    ledger_version: entry.version.clone(),
                    external_version: external_version.clone(),
                })
            })
            .collect()
    }

    /// Queries every record and records each success. Failures are reported
    /// per record and never stop the batch.
    pub fn fetch_and_record_all(
        &mut self,
        source: &dyn ReleaseSource,
        records: &[AppRecord],
    ) -> Vec<RecordOutcome> {
        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            let result = self.fetch_and_record(source, record);
            if let Err(e) = &result {
                warn!("{}: {e}", record.repo);
                println!("Failed to fetch version info for {}: {e}", record.repo);
            }
            outcomes.push(RecordOutcome {
                repo: record.repo.clone(),
                result,
            });
        }
        outcomes
    }

    fn fetch_and_record(
        &mut self,
        source: &dyn ReleaseSource,
        record: &AppRecord,
    ) -> Result<ReleaseInfo, InstallError> {
        let info = source.latest_release(&record.owner, &record.repo)?;
        let appimage = info.appimage.as_ref().ok_or_else(|| InstallError::NoAppImage {
            owner: record.owner.clone(),
            repo: record.repo.clone(),
        })?;
        self.add_or_update(&record.owner, &record.repo, &info.version, &appimage.name)?;
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReleaseError;
    use crate::model::AssetRef;
    use tempfile::tempdir;

    struct StubSource;

    impl ReleaseSource for StubSource {
        fn latest_release(&self, owner: &str, repo: &str) -> Result<ReleaseInfo, ReleaseError> {
            match repo {
                "broken" => Err(ReleaseError::Status {
                    url: format!("https://api.github.com/repos/{owner}/{repo}/releases/latest"),
                    status: reqwest::StatusCode::NOT_FOUND,
                }),
                "noimage" => Ok(ReleaseInfo {
                    version: "3.0".into(),
                    appimage: None,
                    checksum: None,
                }),
                _ => Ok(ReleaseInfo {
                    version: "2.0.0".into(),
                    appimage: Some(AssetRef {
                        name: format!("{repo}-2.0.0.AppImage"),
                        url: format!("https://dl/{repo}-2.0.0.AppImage"),
                    }),
                    checksum: None,
                }),
            }
        }
    }

    fn record(repo: &str) -> AppRecord {
        AppRecord {
            owner: "o".into(),
            repo: repo.into(),
            version: "1.0.0".into(),
            ..Default::default()
        }
    }

    fn ledger_with(dir: &Path, entries: &[(&str, &str)]) -> VersionLedger {
        let mut ledger = VersionLedger::load_from(dir.join(LEDGER_FILE)).unwrap();
        for (repo, version) in entries {
            ledger.versions.insert(
                repo.to_string(),
                LedgerEntry {
                    owner: "o".into(),
                    version: version.to_string(),
                    appimage_name: format!("{repo}.AppImage"),
                },
            );
        }
        ledger
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let ledger = VersionLedger::load(&dir.path().join("apps").to_string_lossy()).unwrap();
        assert!(ledger.versions.is_empty());
        assert!(ledger.path().ends_with("apps/versions.json"));
    }

    #[test]
    fn malformed_file_loads_empty_and_reports_why() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(LEDGER_FILE), "{ not json").unwrap();
        let ledger = VersionLedger::load_from(dir.path().join(LEDGER_FILE)).unwrap();
        assert!(ledger.versions.is_empty());
        assert!(ledger.recovered_from().is_some_and(|e| !e.is_empty()));
    }

    #[test]
    fn well_formed_file_reports_no_recovery() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(LEDGER_FILE),
            r#"{"appA": {"version": "1.0", "appimage_name": "appA.AppImage"}}"#,
        )
        .unwrap();
        let ledger = VersionLedger::load_from(dir.path().join(LEDGER_FILE)).unwrap();
        assert_eq!(ledger.get("appA").unwrap().owner, "");
        assert!(ledger.recovered_from().is_none());
    }

    #[test]
    fn add_or_update_persists_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(LEDGER_FILE);
        let mut ledger = VersionLedger::load_from(path.clone()).unwrap();

        ledger.add_or_update("o", "appA", "1.1.0", "appA-1.1.0.AppImage").unwrap();
        let once = fs::read_to_string(&path).unwrap();
        ledger.add_or_update("o", "appA", "1.1.0", "appA-1.1.0.AppImage").unwrap();
        let twice = fs::read_to_string(&path).unwrap();
        assert_eq!(once, twice);

        let reloaded = VersionLedger::load_from(path).unwrap();
        assert_eq!(
            reloaded.get("appA"),
            Some(&LedgerEntry {
                owner: "o".into(),
                version: "1.1.0".into(),
                appimage_name: "appA-1.1.0.AppImage".into(),
            })
        );
    }

    #[test]
    fn same_repo_name_from_other_owner_overwrites() {
        let dir = tempdir().unwrap();
        let mut ledger = VersionLedger::load_from(dir.path().join(LEDGER_FILE)).unwrap();
        ledger.add_or_update("alice", "tool", "1.0", "tool.AppImage").unwrap();
        ledger.add_or_update("bob", "tool", "9.0", "tool.AppImage").unwrap();
        assert_eq!(ledger.versions.len(), 1);
        assert_eq!(ledger.get("tool").unwrap().owner, "bob");
    }

    #[test]
    fn reconcile_reports_only_shared_mismatches() {
        let dir = tempdir().unwrap();
        let ledger = ledger_with(dir.path(), &[("A", "1.0")]);

        let same = HashMap::from([("A".to_string(), "1.0".to_string())]);
        assert!(ledger.reconcile(&same).is_empty());

        let differs = HashMap::from([("A".to_string(), "2.0".to_string())]);
        assert_eq!(
            ledger.reconcile(&differs),
            vec![Discrepancy {
                repo: "A".into(),
                ledger_version: "1.0".into(),
                external_version: "2.0".into(),
            }]
        );

        let other = HashMap::from([("B".to_string(), "5.0".to_string())]);
        assert!(ledger.reconcile(&other).is_empty());
    }

    #[test]
    fn batch_continues_past_failures() {
        let dir = tempdir().unwrap();
        let mut ledger = VersionLedger::load_from(dir.path().join(LEDGER_FILE)).unwrap();
        let records = vec![record("broken"), record("noimage"), record("appA")];

        let outcomes = ledger.fetch_and_record_all(&StubSource, &records);

        assert_eq!(outcomes.len(), 3);
        assert!(matches!(outcomes[0].result, Err(InstallError::Release(_))));
        assert!(matches!(outcomes[1].result, Err(InstallError::NoAppImage { .. })));
        assert_eq!(outcomes[2].result.as_ref().unwrap().version, "2.0.0");
        assert_eq!(ledger.versions.keys().collect::<Vec<_>>(), vec!["appA"]);
        assert!(ledger.path().exists());
    }
}
