//! Core type system and error handling for TreeSync
//!
//! This crate provides the foundational types and error handling shared by the
//! TreeSync workspace:
//!
//! - **Error handling**: error enum with path-aware I/O constructors
//! - **Core types**: progress snapshots, run reports and fingerprint aliases
//!
//! # Features
//!
//! - `std` (default): Enable standard library features
//! - `serde`: Enable serialization support
//!
//! # Examples
//!
//! ```rust
//! use treesync_types::{ProgressSnapshot, Result};
//!
//! fn example_snapshot() -> Result<ProgressSnapshot> {
//!     Ok(ProgressSnapshot {
//!         folder_count: 3,
//!         file_count: 12,
//!         done: true,
//!     })
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod result;
pub mod types;

// Re-export commonly used types
pub use error::Error;
pub use result::Result;
pub use types::*;
