//! Core data types for TreeSync
//!
//! Plain value types shared by the sync engine and its front ends.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Unique identifier for a run
pub type RunId = uuid::Uuid;

/// Fingerprint of a folder's recursive content
pub type FolderHash = i32;

/// Point-in-time copy of a progress object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProgressSnapshot {
    /// Folders seen (scan) or created (transfer) so far
    pub folder_count: u64,
    /// Files seen (scan) or copied (transfer) so far
    pub file_count: u64,
    /// Whether the owning walker has finished
    pub done: bool,
}

impl ProgressSnapshot {
    /// Total number of items counted so far
    pub fn total(&self) -> u64 {
        self.folder_count + self.file_count
    }
}

/// Final outcome of one source to destination run
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunReport {
    /// Run identifier, also recorded in the worker log spans
    pub run_id: RunId,
    /// Source folder
    pub source: PathBuf,
    /// Destination folder
    pub destination: PathBuf,
    /// Scan counters when the run ended
    pub scan: ProgressSnapshot,
    /// Transfer counters when the run ended
    pub transfer: ProgressSnapshot,
    /// Whether the run was stopped before the tree was exhausted
    pub cancelled: bool,
    /// Wall-clock duration of the run
    pub duration: Duration,
}

impl RunReport {
    /// Whether both walkers reached their `done` state
    pub fn is_complete(&self) -> bool {
        self.scan.done && self.transfer.done
    }

    /// Files copied per second over the whole run
    pub fn file_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.transfer.file_count as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}
