use crate::error::DownloadError;
use crate::model::AppRecord;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::copy;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// True when the asset (or a previously renamed `<repo>.AppImage`) already
/// sits in `work_dir`. Existing files are not hashed.
pub fn already_present(work_dir: &Path, appimage_name: &str, repo: &str) -> bool {
    work_dir.join(appimage_name).exists() || work_dir.join(format!("{repo}.AppImage")).exists()
}

pub fn download_asset(client: &Client, url: &str, dest: &Path) -> Result<(), DownloadError> {
    let resp = client.get(url).send().map_err(|source| DownloadError::Network {
        url: url.to_string(),
        source,
    })?;
    if resp.status() != reqwest::StatusCode::OK {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status: resp.status(),
        });
    }

    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let pb = match resp.content_length() {
        Some(len) => {
            let pb = ProgressBar::new(len);
            pb.set_style(ProgressStyle::with_template(
                "{bar:40.cyan/blue} {bytes}/{total_bytes} {msg}",
            )?);
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::with_template("{spinner} {bytes} {msg}")?);
            pb
        }
    };
    pb.set_message(name);

    let mut out = File::create(dest)?;
    let mut reader = pb.wrap_read(resp);
    let written = match copy(&mut reader, &mut out) {
        Ok(written) => written,
        Err(e) => {
            pb.abandon();
            drop(out);
            let _ = fs::remove_file(dest);
            return Err(e.into());
        }
    };
    pb.finish_and_clear();
    debug!("wrote {written} bytes to {}", dest.display());
    Ok(())
}

/// Small GET for checksum documents.
pub fn fetch_text(client: &Client, url: &str) -> Result<String, DownloadError> {
    let network = |source| DownloadError::Network {
        url: url.to_string(),
        source,
    };
    let resp = client.get(url).send().map_err(network)?;
    if resp.status() != reqwest::StatusCode::OK {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status: resp.status(),
        });
    }
    resp.text().map_err(network)
}

/// Moves `downloaded` to `<folder>/<repo>.AppImage`, archiving or removing the
/// previously installed file. `previous_name` names the archived copy.
pub fn install(
    record: &AppRecord,
    downloaded: &Path,
    previous_name: &str,
    keep_backup: bool,
) -> Result<PathBuf, DownloadError> {
    let folder = Path::new(&record.folder);
    fs::create_dir_all(folder)?;
    let target = folder.join(format!("{}.AppImage", record.repo));

    if target.exists() {
        if keep_backup {
            let backup_dir = Path::new(&record.folder_backup);
            fs::create_dir_all(backup_dir)?;
            let backup = backup_path(backup_dir, previous_name, &record.repo);
            info!("archiving {} to {}", target.display(), backup.display());
            move_file(&target, &backup)?;
        } else {
            debug!("removing previous {}", target.display());
            fs::remove_file(&target)?;
        }
    }

    move_file(downloaded, &target)?;
    make_executable(&target)?;
    Ok(target)
}

fn backup_path(backup_dir: &Path, previous_name: &str, repo: &str) -> PathBuf {
    let name = if previous_name.is_empty() {
        format!("{repo}.AppImage")
    } else {
        previous_name.to_string()
    };
    let candidate = backup_dir.join(&name);
    if !candidate.exists() {
        return candidate;
    }
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    backup_dir.join(format!("{name}.{stamp}"))
}

fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    // rename fails across filesystems
    fs::copy(from, to)?;
    fs::remove_file(from)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
