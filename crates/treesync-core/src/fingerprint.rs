//! Folder fingerprints and the order-sensitive hash builder that produces them
//!
//! The builder is the classic 17/37 multiply-add accumulator: it starts at 17 and
//! every appended value `v` turns the running total `t` into `t * 37 + v`, with
//! 32-bit wrapping arithmetic. 64-bit values are folded to 32 bits by xoring the
//! high half into the low half, and strings contribute their 31-based polynomial
//! hash over UTF-16 code units.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use treesync_types::FolderHash;

const INITIAL_TOTAL: i32 = 17;
const MULTIPLIER: i32 = 37;

/// A directory paired with the hash of its recursive content
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FolderFingerprint {
    path: PathBuf,
    hash: FolderHash,
}

impl FolderFingerprint {
    /// Create a fingerprint for `path`
    pub fn new<P: Into<PathBuf>>(path: P, hash: FolderHash) -> Self {
        Self {
            path: path.into(),
            hash,
        }
    }

    /// Source directory this fingerprint describes
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hash of the directory's recursive content
    pub fn hash(&self) -> FolderHash {
        self.hash
    }
}

/// The per-file values folded into a folder fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSignature {
    /// File name (last path component)
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Modification time in milliseconds since the Unix epoch, 0 when unavailable
    pub modified_millis: i64,
}

impl FileSignature {
    /// Build a signature from a directory entry's name and metadata
    pub fn from_metadata(name: &str, metadata: &Metadata) -> Self {
        let modified_millis = metadata.modified().map_or(0, system_time_millis);
        Self {
            name: name.to_string(),
            size: metadata.len(),
            modified_millis,
        }
    }
}

/// Order-sensitive hash accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintBuilder {
    total: i32,
}

impl FingerprintBuilder {
    /// Start a new accumulator
    pub fn new() -> Self {
        Self {
            total: INITIAL_TOTAL,
        }
    }

    /// Fold a 32-bit value
    pub fn append_i32(&mut self, value: i32) -> &mut Self {
        self.total = self.total.wrapping_mul(MULTIPLIER).wrapping_add(value);
        self
    }

    /// Fold a 64-bit value
    pub fn append_i64(&mut self, value: i64) -> &mut Self {
        self.append_i32(fold_i64(value))
    }

    /// Fold a string by its polynomial hash
    pub fn append_str(&mut self, value: &str) -> &mut Self {
        self.append_i32(string_hash(value))
    }

    /// Fold a file's name, size and modification time, in that order
    pub fn append_file(&mut self, file: &FileSignature) -> &mut Self {
        self.append_str(&file.name)
            .append_i64(file.size as i64)
            .append_i64(file.modified_millis)
    }

    /// Current value of the accumulator
    pub fn finish(&self) -> FolderHash {
        self.total
    }
}

impl Default for FingerprintBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold a 64-bit value to 32 bits: `(v ^ (v >>> 32)) as i32`
pub fn fold_i64(value: i64) -> i32 {
    let bits = value as u64;
    (bits ^ (bits >> 32)) as i32
}

/// 31-based polynomial hash over the UTF-16 code units of `value`
pub fn string_hash(value: &str) -> i32 {
    value
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Milliseconds since the Unix epoch, negative for earlier times
pub fn system_time_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_millis()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_millis()).map_or(i64::MIN, |ms| -ms),
    }
}
