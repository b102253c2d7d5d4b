//! SHA-1 verification of local artifacts.
//!
//! Digests are computed on demand by streaming the file through a bounded
//! buffer, and reported as lowercase hex.

use sha1::{Digest, Sha1};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::error::ManifestError;

const BUF_SIZE: usize = 64 * 1024;

/// Length of a SHA-1 digest in hex characters.
pub const SHA1_HEX_LEN: usize = 40;

/// Compute SHA-1 of a file and return the digest as lowercase hex.
pub fn sha1_path(path: &Path) -> io::Result<String> {
    let mut f = File::open(path)?;
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// SHA-1 of an in-memory buffer as lowercase hex.
pub fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

/// An expected SHA-1 digest, validated and normalized to lowercase once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedDigest(String);

impl ExpectedDigest {
    /// Parses a 40-character hex digest in any letter case.
    pub fn parse(hex_digest: &str) -> Result<Self, ManifestError> {
        let trimmed = hex_digest.trim();
        if trimmed.len() != SHA1_HEX_LEN || !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ManifestError::InvalidDigest {
                digest: hex_digest.to_string(),
            });
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a computed hex digest.
    pub fn matches(&self, actual_hex: &str) -> bool {
        self.0.eq_ignore_ascii_case(actual_hex)
    }
}

impl fmt::Display for ExpectedDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
