//! Command orchestration. Every per-application failure is returned as a
//! value so batch commands can move on to the next record.

use crate::config::{
    DEFAULT_APP_FOLDER, DEFAULT_BACKUP_FOLDER, EditableField, RecordStore, expand_home,
    external_versions,
};
use crate::downloader::{already_present, download_asset, fetch_text, install};
use crate::error::{ConfigError, DownloadError, InstallError};
use crate::filter::parse_github_url;
use crate::ledger::{RecordOutcome, VersionLedger};
use crate::model::{AppRecord, AssetRef, CheckRow, Discrepancy, InstallChoice, ReleaseInfo};
use crate::prompt::{MAX_ATTEMPTS, Prompter};
use crate::release::{GitHubClient, ReleaseSource, VersionStatus, check_version};
use crate::verify::{VerifyOutcome, verify_file};
use anyhow::{Context, Result, bail};
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    UpToDate,
    AlreadyPresent,
    Installed { from: String, to: String },
}

pub struct App {
    store: RecordStore,
    ledger: VersionLedger,
    github: GitHubClient,
    work_dir: PathBuf,
}

impl App {
    /// `work_dir` is where assets are downloaded before being installed.
    pub fn new(
        store: RecordStore,
        ledger: VersionLedger,
        github: GitHubClient,
        work_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            ledger,
            github,
            work_dir,
        }
    }

    pub fn setup<R: BufRead, W: Write>(
        &mut self,
        prompter: &mut Prompter<R, W>,
    ) -> Result<InstallOutcome> {
        let (owner, repo) = ask_repository(prompter)?;
        if self.store.path_for(&repo).exists() {
            bail!("{repo} is already tracked; use `install {repo}` or `edit {repo}`");
        }

        let folder = prompter.ask_line_or(
            "Which directory to save appimage \n\
             (Default: '~/Documents/appimages/' if you leave it blank):",
            &format!("{DEFAULT_APP_FOLDER}/"),
        )?;
        let folder_backup = prompter.ask_line_or(
            "Which directory to save old appimage \n\
             (Default: '~/Documents/appimages/backup/' if you leave it blank):",
            &format!("{DEFAULT_BACKUP_FOLDER}/"),
        )?;
        let hash_type =
            prompter.ask_line("Enter the hash type for your sha(sha256, sha512) file: ")?;

        println!("Choose one of the following options:");
        println!("====================================");
        println!("1. Download new appimage, save old appimage");
        println!("2. Download new appimage, don't save old appimage");
        println!("====================================");
        let choice = match prompter.ask_choice("Enter your choice: ", 1..=2)? {
            1 => InstallChoice::InstallKeepBackup,
            _ => InstallChoice::InstallNoBackup,
        };

        let record = AppRecord {
            owner,
            repo,
            hash_type,
            folder: expand_home(&folder),
            folder_backup: expand_home(&folder_backup),
            choice: Some(choice),
            ..Default::default()
        };
        let repo = record.repo.clone();
        let outcome = self.install_record(record)?;
        if outcome == InstallOutcome::AlreadyPresent {
            bail!(
                "{repo} was not tracked: an AppImage for it already exists in {}; \
                 remove it and run setup again",
                self.work_dir.display()
            );
        }
        Ok(outcome)
    }

    pub fn list(&self) -> Result<Vec<AppRecord>> {
        let records = self.store.load_all()?;
        if records.is_empty() {
            println!("There is no .json file in {}", self.store.dir().display());
        }
        for record in &records {
            let recorded = self.ledger.get(&record.repo).map_or("-", |e| e.version.as_str());
            println!(
                "{:<30} {:<20} {:<15} {:<15} {}",
                record.repo, record.owner, record.version, recorded, record.folder
            );
        }
        Ok(records)
    }

    /// Picks the record named `repo`, the only record, or asks.
    pub fn select_repo<R: BufRead, W: Write>(
        &self,
        repo: Option<String>,
        prompter: &mut Prompter<R, W>,
    ) -> Result<String> {
        if let Some(repo) = repo {
            return Ok(repo);
        }
        let repos = self.store.list()?;
        match repos.len() {
            0 => bail!(
                "There is no .json file in {}; run `setup` first",
                self.store.dir().display()
            ),
            1 => Ok(repos[0].clone()),
            _ => {
                let files: Vec<String> = repos.iter().map(|r| format!("{r}.json")).collect();
                let index = prompter.select("Available json files:", &files)?;
                Ok(repos[index].clone())
            }
        }
    }

    pub fn install_repo(&mut self, repo: &str) -> Result<InstallOutcome> {
        let record = self.store.load(repo)?;
        Ok(self.install_record(record)?)
    }

    /// Queries the latest release, applies the version gate and installs.
    pub fn install_record(&mut self, record: AppRecord) -> Result<InstallOutcome, InstallError> {
        let info = self.github.latest_release(&record.owner, &record.repo)?;
        match check_version(record.choice, &record.version, &info.version) {
            VersionStatus::UpToDate => {
                println!("{}.AppImage is up to date", record.repo);
                println!("Version: {}", info.version);
                return Ok(InstallOutcome::UpToDate);
            }
            VersionStatus::Outdated { current, latest } => {
                println!("-------------------------------------------------");
                println!("Current version: {current}");
                println!("Latest version: {latest}");
                println!("-------------------------------------------------");
            }
            VersionStatus::NotChecked => {}
        }
        self.install_release(record, info)
    }

    /// Downloads, verifies and installs `info` for `record`, then rewrites the
    /// record file and the ledger entry.
    pub fn install_release(
        &mut self,
        record: AppRecord,
        info: ReleaseInfo,
    ) -> Result<InstallOutcome, InstallError> {
        let appimage = info.appimage.as_ref().ok_or_else(|| InstallError::NoAppImage {
            owner: record.owner.clone(),
            repo: record.repo.clone(),
        })?;

        if already_present(&self.work_dir, &appimage.name, &record.repo) {
            println!("{} already exists in the current directory", appimage.name);
            return Ok(InstallOutcome::AlreadyPresent);
        }

        println!("{} downloading...", record.repo);
        let downloaded = self.work_dir.join(&appimage.name);
        download_asset(self.github.http(), &appimage.url, &downloaded)?;

        // A leftover download would make every later run report AlreadyPresent.
        let result = self.finish_install(record, &info, appimage, &downloaded);
        if result.is_err() && downloaded.exists() {
            if let Err(e) = fs::remove_file(&downloaded) {
                warn!("could not remove {}: {e}", downloaded.display());
            }
        }
        result
    }

    fn finish_install(
        &mut self,
        mut record: AppRecord,
        info: &ReleaseInfo,
        appimage: &AssetRef,
        downloaded: &Path,
    ) -> Result<InstallOutcome, InstallError> {
        match &info.checksum {
            Some(checksum) => {
                let text = fetch_text(self.github.http(), &checksum.url)?;
                let outcome =
                    verify_file(downloaded, &record.hash_type, &text).map_err(DownloadError::Io)?;
                match outcome {
                    VerifyOutcome::Verified => println!("{} checksum verified", record.hash_type),
                    VerifyOutcome::Mismatch => {
                        return Err(DownloadError::ChecksumMismatch {
                            name: appimage.name.clone(),
                            algorithm: record.hash_type,
                        }
                        .into());
                    }
                    VerifyOutcome::Unsupported(label) => warn!(
                        "unsupported hash type {label:?}, skipping verification of {}",
                        appimage.name
                    ),
                }
                record.sha_name = Some(checksum.name.clone());
                record.sha_url = Some(checksum.url.clone());
            }
            None => warn!("no checksum asset for {}, skipping verification", appimage.name),
        }

        let choice = record.choice.unwrap_or(InstallChoice::InstallKeepBackup);
        let target = install(&record, downloaded, &record.appimage_name, choice.keeps_backup())?;
        info!("installed {}", target.display());

        let from = std::mem::replace(&mut record.version, info.version.clone());
        record.appimage_name = appimage.name.clone();
        record.choice = Some(choice.into_update_check());
        self.store.save(&record)?;
        self.ledger
            .add_or_update(&record.owner, &record.repo, &record.version, &record.appimage_name)?;

        println!("-------------------------------------------------");
        println!("Download completed! {} installed.", appimage.name);
        println!("-------------------------------------------------");
        Ok(InstallOutcome::Installed {
            from,
            to: info.version.clone(),
        })
    }

    /// Batch update-check over every record. Records the ledger, reports
    /// per-record status and, with `install_outdated`, installs new releases.
    pub fn check(&mut self, install_outdated: bool) -> Result<Vec<CheckRow>> {
        let records = self.store.load_all()?;
        let outcomes = self.ledger.fetch_and_record_all(&self.github, &records);

        let mut rows = Vec::with_capacity(records.len());
        let mut outdated = Vec::new();
        for (record, RecordOutcome { repo, result }) in records.iter().zip(outcomes) {
            let (latest, status) = match result {
                Ok(info) if info.version == record.version => {
                    (Some(info.version), "up to date".to_string())
                }
                Ok(info) => {
                    let latest = info.version.clone();
                    outdated.push((record.clone(), info));
                    (Some(latest), "outdated".to_string())
                }
                Err(e) => (None, format!("error: {e}")),
            };
            rows.push(CheckRow {
                repo,
                owner: record.owner.clone(),
                current: record.version.clone(),
                latest,
                status,
            });
        }

        crate::output::print_report(&rows);
        print_discrepancies(&self.ledger.reconcile(&external_versions(&records)));

        if install_outdated {
            for (record, info) in outdated {
                let repo = record.repo.clone();
                if let Err(e) = self.install_release(record, info) {
                    warn!("{repo}: {e}");
                    println!("Error updating {repo}: {e}");
                }
            }
        }
        Ok(rows)
    }

    pub fn reconcile(&self) -> Result<Vec<Discrepancy>> {
        info!("reconciling {}", self.ledger.path().display());
        let records = self.store.load_all()?;
        let discrepancies = self.ledger.reconcile(&external_versions(&records));
        print_discrepancies(&discrepancies);
        Ok(discrepancies)
    }

    pub fn edit<R: BufRead, W: Write>(
        &self,
        repo: &str,
        field: Option<EditableField>,
        value: Option<String>,
        prompter: &mut Prompter<R, W>,
    ) -> Result<AppRecord> {
        let field = match field {
            Some(field) => field,
            None => {
                let labels: Vec<String> =
                    EditableField::ALL.iter().map(|f| f.label().to_string()).collect();
                EditableField::ALL[prompter.select("Field to edit:", &labels)?]
            }
        };
        let value = match value {
            Some(value) => value,
            None => prompter.ask_line(&format!("Enter the new {}: ", field.label()))?,
        };
        let record = self
            .store
            .update_field(repo, field, &value)
            .with_context(|| format!("failed to update {repo}"))?;
        println!("Credentials updated successfully");
        Ok(record)
    }

    #[cfg(test)]
    pub fn ledger(&self) -> &VersionLedger {
        &self.ledger
    }
}

fn ask_repository<R: BufRead, W: Write>(prompter: &mut Prompter<R, W>) -> Result<(String, String)> {
    for _ in 0..MAX_ATTEMPTS {
        let url = prompter.ask_line("Enter the app github url: ")?;
        match parse_github_url(&url) {
            Ok(parsed) => return Ok(parsed),
            Err(e @ ConfigError::InvalidUrl(_)) => println!("{e}"),
            Err(e) => return Err(e.into()),
        }
    }
    bail!("no valid GitHub URL after {MAX_ATTEMPTS} attempts")
}

fn print_discrepancies(discrepancies: &[Discrepancy]) {
    if discrepancies.is_empty() {
        println!("All versions are up to date.");
        return;
    }
    println!("Discrepancies found:");
    for d in discrepancies {
        println!("{d}");
    }
}
