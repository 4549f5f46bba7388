//! Incremental one-way folder synchronization for TreeSync
//!
//! This crate mirrors a source folder tree into a destination, skipping subtrees
//! whose content has not changed since the last run:
//!
//! - **Fingerprinting**: A scanner walks the source bottom-up and computes a
//!   deterministic 32-bit fingerprint per folder
//! - **Concurrent transfer**: A transfer worker consumes fingerprints as the scan
//!   produces them and copies only folders whose fingerprint changed
//! - **Hash markers**: The last applied fingerprint is persisted in each
//!   destination folder
//! - **Cancellation**: Both walkers observe a shared cancellation token between
//!   whole-item operations
//! - **Progress Tracking**: Live folder and file counters for both walkers
//!
//! # Examples
//!
//! ```rust,no_run
//! use treesync_core::{SyncOptions, SyncService};
//!
//! # fn example() -> treesync_types::Result<()> {
//! let service = SyncService::new(SyncOptions::default());
//! let report = service.sync("photos", "/mnt/backup")?;
//! println!(
//!     "Copied {} files into {} new folders",
//!     report.transfer.file_count, report.transfer.folder_count
//! );
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cancel;
pub mod fingerprint;
pub mod marker;
pub mod progress;
pub mod queue;
pub mod scanner;
pub mod service;
pub mod transfer;
pub mod validation;

pub use cancel::CancellationToken;
pub use fingerprint::{FileSignature, FingerprintBuilder, FolderFingerprint};
pub use marker::{read_marker, write_marker, MARKER_FILE_NAME, MARKER_KEY};
pub use progress::{ScanProgress, TransferProgress};
pub use queue::FingerprintQueue;
pub use scanner::FolderScanner;
pub use service::{SyncOptions, SyncService};
pub use transfer::TransferWorker;
pub use validation::{PathValidationResult, PathValidator};
