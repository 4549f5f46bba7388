//! JSON output structures for TreeSync CLI

use serde::{Deserialize, Serialize};
use treesync_types::{FolderHash, ProgressSnapshot, RunReport};

/// Complete JSON output for a sync run
#[derive(Debug, Serialize, Deserialize)]
pub struct RunResultJson {
    /// Operation metadata
    pub metadata: OperationMetadata,
    /// Scan counters
    pub scan: ProgressSnapshot,
    /// Transfer counters
    pub transfer: ProgressSnapshot,
    /// Overall result
    pub result: OperationResult,
}

/// JSON output for a scan-only run
#[derive(Debug, Serialize, Deserialize)]
pub struct ScanResultJson {
    /// Operation metadata
    pub metadata: OperationMetadata,
    /// Scan counters
    pub scan: ProgressSnapshot,
    /// Fingerprint of the source root, absent if the scan was cancelled
    pub root_fingerprint: Option<FolderHash>,
}

/// Operation metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct OperationMetadata {
    /// TreeSync version
    pub version: String,
    /// Operation type
    pub operation: String,
    /// Run identifier
    pub run_id: String,
    /// Timestamp when the output was produced
    pub timestamp: String,
    /// Source path
    pub source_path: String,
    /// Destination path, absent for scans
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_path: Option<String>,
}

/// Overall result of a run
#[derive(Debug, Serialize, Deserialize)]
pub struct OperationResult {
    /// Both walkers finished without being stopped
    pub success: bool,
    /// The run was stopped or timed out
    pub cancelled: bool,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
    /// Files copied per second
    pub files_per_second: f64,
}

impl OperationMetadata {
    /// Metadata stamped with the current time
    pub fn new(
        operation: &str,
        run_id: impl ToString,
        source: &std::path::Path,
        destination: Option<&std::path::Path>,
    ) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            operation: operation.to_string(),
            run_id: run_id.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            source_path: source.display().to_string(),
            destination_path: destination.map(|path| path.display().to_string()),
        }
    }
}

impl RunResultJson {
    /// Build the JSON document for a finished run
    pub fn from_report(report: &RunReport) -> Self {
        Self {
            metadata: OperationMetadata::new(
                "sync",
                report.run_id,
                &report.source,
                Some(&report.destination),
            ),
            scan: report.scan,
            transfer: report.transfer,
            result: OperationResult {
                success: report.is_complete() && !report.cancelled,
                cancelled: report.cancelled,
                duration_ms: u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
                files_per_second: report.file_rate(),
            },
        }
    }
}
