//! TreeSync Testing Suite
//!
//! This crate provides integration tests and benchmarks for the TreeSync
//! workspace. Shared fixtures live in [`test_utils`].

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Unified test utilities
///
/// Fixtures and tree inspection helpers shared by the integration tests and
/// the benchmarks.
pub mod test_utils;
