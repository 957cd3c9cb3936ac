use crate::error::ConfigError;
use crate::model::{AssetRef, Release, ReleaseAsset, ReleaseInfo};
use regex::Regex;
use std::sync::LazyLock;

const APPIMAGE_SUFFIX: &str = ".AppImage";

const CHECKSUM_KEYWORDS: [&str; 12] = [
    "linux",
    "sum",
    "sha",
    "SHA",
    "SHA256",
    "SHA512",
    "SHA-256",
    "SHA-512",
    "checksum",
    "checksums",
    "CHECKSUM",
    "CHECKSUMS",
];

const CHECKSUM_EXTENSIONS: [&str; 7] = [
    ".sha256", ".sha512", ".yml", ".yaml", ".txt", ".sum", ".sha",
];

static GITHUB_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:https?://)?(?:www\.)?github\.com/",
        r"([^/\s]+)/([^/\s#?]+?)(?:\.git)?/?(?:[/#?].*)?$"
    ))
    .expect("github url pattern is valid")
});

/// Strips a single leading `v` from a release tag.
pub fn strip_version_prefix(tag: &str) -> &str {
    tag.strip_prefix('v').unwrap_or(tag)
}

pub fn find_appimage(assets: &[ReleaseAsset]) -> Option<&ReleaseAsset> {
    assets.iter().find(|a| a.name.ends_with(APPIMAGE_SUFFIX))
}

pub fn find_checksum(assets: &[ReleaseAsset]) -> Option<&ReleaseAsset> {
    assets.iter().find(|a| {
        CHECKSUM_KEYWORDS.iter().any(|kw| a.name.contains(kw))
            && CHECKSUM_EXTENSIONS.iter().any(|ext| a.name.ends_with(ext))
    })
}

pub fn release_info(release: &Release) -> ReleaseInfo {
    let to_ref = |a: &ReleaseAsset| AssetRef {
        name: a.name.clone(),
        url: a.browser_download_url.clone(),
    };
    ReleaseInfo {
        version: strip_version_prefix(&release.tag_name).to_string(),
        appimage: find_appimage(&release.assets).map(to_ref),
        checksum: find_checksum(&release.assets).map(to_ref),
    }
}

/// Extracts `(owner, repo)` from a GitHub repository URL.
pub fn parse_github_url(url: &str) -> Result<(String, String), ConfigError> {
    let caps = GITHUB_URL
        .captures(url.trim())
        .ok_or_else(|| ConfigError::InvalidUrl(url.to_string()))?;
    Ok((caps[1].to_string(), caps[2].to_string()))
}
