//! Unified test utilities for TreeSync tests and benchmarks
//!
//! Fixtures build source trees inside a temporary directory and inspect the
//! mirrored destination afterwards.

use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use treesync_core::MARKER_FILE_NAME;
use walkdir::WalkDir;

/// Test data generation patterns
#[derive(Debug, Clone, Copy)]
pub enum TestDataPattern {
    /// All zeros
    Zeros,
    /// Realistic file pattern similar to actual files
    Realistic,
}

/// Generate test data with specified pattern
pub fn generate_test_data(size: usize, pattern: TestDataPattern) -> Vec<u8> {
    match pattern {
        TestDataPattern::Zeros => vec![0u8; size],
        TestDataPattern::Realistic => (0..size).map(|i| ((i * 7 + 13) % 256) as u8).collect(),
    }
}

/// A source folder and an (initially absent) destination inside one temporary directory
pub struct TreeFixture {
    _temp: TempDir,
    /// Source root; its name is reproduced under the destination
    pub source: PathBuf,
    /// Destination root
    pub destination: PathBuf,
}

impl TreeFixture {
    /// Create an empty source folder called `root_name`
    pub fn new(root_name: &str) -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let source = temp.path().join(root_name);
        let destination = temp.path().join("destination");
        fs::create_dir_all(&source).expect("Failed to create source root");
        Self {
            _temp: temp,
            source,
            destination,
        }
    }

    /// Create a folder (and parents) under the source root
    pub fn mkdir(&self, relative: &str) -> PathBuf {
        let path = self.source.join(relative);
        fs::create_dir_all(&path).expect("Failed to create folder");
        path
    }

    /// Write a source file with a pinned modification time
    pub fn write_file(&self, relative: &str, content: &[u8], mtime_secs: i64) -> PathBuf {
        let path = self.source.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent folder");
        }
        fs::write(&path, content).expect("Failed to write test file");
        set_file_mtime(&path, FileTime::from_unix_time(mtime_secs, 0))
            .expect("Failed to set modification time");
        path
    }

    /// Destination counterpart of a source-relative path
    pub fn mirrored(&self, relative: &str) -> PathBuf {
        let root_name = self
            .source
            .file_name()
            .expect("Source root has a name");
        let base = self.destination.join(root_name);
        if relative.is_empty() {
            base
        } else {
            base.join(relative)
        }
    }

    /// Create the destination root
    pub fn create_destination(&self) {
        fs::create_dir_all(&self.destination).expect("Failed to create destination");
    }
}

/// Build a tree `depth` levels deep with `breadth` subfolders and `files` files per folder
pub fn generate_tree(root: &Path, depth: usize, breadth: usize, files: usize, file_size: usize) {
    fs::create_dir_all(root).expect("Failed to create tree root");
    let data = generate_test_data(file_size, TestDataPattern::Realistic);
    for index in 0..files {
        fs::write(root.join(format!("file_{index:03}.dat")), &data)
            .expect("Failed to write tree file");
    }
    if depth > 0 {
        for index in 0..breadth {
            generate_tree(
                &root.join(format!("dir_{index:03}")),
                depth - 1,
                breadth,
                files,
                file_size,
            );
        }
    }
}

/// Regular files under `root` (relative paths, sorted), excluding hash markers
pub fn data_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name() != MARKER_FILE_NAME)
        .filter_map(|entry| entry.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect();
    files.sort();
    files
}

/// Folders under `root` (inclusive) that carry a hash marker
pub fn marked_folders(root: &Path) -> Vec<PathBuf> {
    let mut folders: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| entry.path().join(MARKER_FILE_NAME).is_file())
        .map(|entry| entry.path().to_path_buf())
        .collect();
    folders.sort();
    folders
}

/// Direct regular files of `dir`, excluding hash markers
pub fn direct_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .expect("Failed to list folder")
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|entry| entry.file_name() != MARKER_FILE_NAME)
        .map(|entry| entry.path())
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_test_data_patterns() {
        let zeros = generate_test_data(64, TestDataPattern::Zeros);
        assert!(zeros.iter().all(|&b| b == 0));

        let realistic = generate_test_data(64, TestDataPattern::Realistic);
        assert_eq!(realistic.len(), 64);
        assert_eq!(realistic[0], 13);
    }

    #[test]
    fn test_generate_tree_shape() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("tree");
        generate_tree(&root, 2, 2, 3, 16);

        // 1 + 2 + 4 folders, 3 files each
        assert_eq!(data_files(&root).len(), 21);
    }

    #[test]
    fn test_fixture_mirrors_root_name() {
        let fixture = TreeFixture::new("photos");
        assert_eq!(
            fixture.mirrored("a/b"),
            fixture.destination.join("photos/a/b")
        );
        assert_eq!(fixture.mirrored(""), fixture.destination.join("photos"));
    }
}
