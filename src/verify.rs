//! Checksum verification of downloaded AppImages.
//!
//! Release checksum assets come in two shapes: `sha256sum`-style text with hex
//! digests, and electron-builder `latest-linux.yml` files carrying base64
//! sha512 digests. A file passes when its digest appears in either encoding.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256, Sha512};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    /// `hash_type` is free-form in records; unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Some(Self::Sha256),
            "sha512" => Some(Self::Sha512),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    Mismatch,
    Unsupported(String),
}

pub fn compute_digest(path: &Path, algorithm: HashAlgorithm) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    match algorithm {
        HashAlgorithm::Sha256 => hash_reader::<Sha256>(&mut file),
        HashAlgorithm::Sha512 => hash_reader::<Sha512>(&mut file),
    }
}

fn hash_reader<D: Digest>(reader: &mut impl Read) -> io::Result<Vec<u8>> {
    let mut hasher = D::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_vec())
}

pub fn digest_listed(digest: &[u8], checksum_text: &str) -> bool {
    let hex_digest = hex::encode(digest);
    let b64_digest = STANDARD.encode(digest);
    checksum_text.to_ascii_lowercase().contains(&hex_digest) || checksum_text.contains(&b64_digest)
}

pub fn verify_file(path: &Path, hash_type: &str, checksum_text: &str) -> io::Result<VerifyOutcome> {
    let Some(algorithm) = HashAlgorithm::from_label(hash_type) else {
        return Ok(VerifyOutcome::Unsupported(hash_type.to_string()));
    };
    let digest = compute_digest(path, algorithm)?;
    if digest_listed(&digest, checksum_text) {
        Ok(VerifyOutcome::Verified)
    } else {
        Ok(VerifyOutcome::Mismatch)
    }
}
