//! Recursive, bottom-up fingerprinting of a source tree

use crate::cancel::CancellationToken;
use crate::fingerprint::{FileSignature, FingerprintBuilder, FolderFingerprint};
use crate::marker::is_marker_name;
use crate::progress::{DoneGuard, ScanProgress};
use std::fs::{self, DirEntry};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use treesync_types::{Error, FolderHash, Result};

/// Walks a source tree depth-first, queueing one fingerprint per completed folder
#[derive(Debug, Clone)]
pub struct FolderScanner {
    progress: ScanProgress,
    cancel: CancellationToken,
}

impl FolderScanner {
    /// Create a scanner reporting into `progress`
    pub fn new(progress: ScanProgress, cancel: CancellationToken) -> Self {
        Self { progress, cancel }
    }

    /// Scan `root` to completion or cancellation.
    ///
    /// Returns the root fingerprint, or `None` if the scan was cancelled. The
    /// progress `done` flag is set on every exit path.
    pub fn scan(&self, root: &Path) -> Option<FolderHash> {
        let _done = DoneGuard::new(|| self.progress.mark_done());
        info!("Scanning {}", root.display());

        let hash = self.scan_folder(root);
        match hash {
            Some(hash) => {
                self.progress.set_root_hash(hash);
                info!(
                    "Scan finished: {} folders, {} files, root fingerprint {}",
                    self.progress.folder_count(),
                    self.progress.file_count(),
                    hash
                );
            }
            None => {
                self.progress.mark_interrupted();
                info!("Scan cancelled");
            }
        }
        hash
    }

    fn scan_folder(&self, dir: &Path) -> Option<FolderHash> {
        match self.read_children(dir) {
            Ok((folders, files)) => self.fold_children(dir, &folders, &files),
            Err(e) => {
                warn!("Skipping folder {}: {}", dir.display(), e);
                Some(0)
            }
        }
    }

    /// List and classify the direct entries of `dir`, counting each discovery
    fn read_children(&self, dir: &Path) -> Result<(Vec<PathBuf>, Vec<FileSignature>)> {
        let mut folders = Vec::new();
        let mut files = Vec::new();
        for entry in sorted_entries(dir)? {
            match self.classify(&entry) {
                Ok(Some(Child::Folder(path))) => folders.push(path),
                Ok(Some(Child::File(signature))) => files.push(signature),
                Ok(None) => {}
                Err(e) => warn!("Skipping entry {}: {}", entry.path().display(), e),
            }
        }
        Ok((folders, files))
    }

    /// Fingerprint `dir` from its children and queue it; `None` on cancellation
    fn fold_children(
        &self,
        dir: &Path,
        folders: &[PathBuf],
        files: &[FileSignature],
    ) -> Option<FolderHash> {
        let mut builder = FingerprintBuilder::new();
        for folder in folders {
            if self.cancel.is_cancelled() {
                return None;
            }
            let child = self.scan_folder(folder)?;
            builder.append_i32(child);
        }
        for file in files {
            if self.cancel.is_cancelled() {
                return None;
            }
            builder.append_file(file);
        }

        let hash = builder.finish();
        debug!("Fingerprint {} for {}", hash, dir.display());
        if !self
            .progress
            .queue()
            .push(FolderFingerprint::new(dir, hash), &self.cancel)
        {
            return None;
        }
        Some(hash)
    }

    /// Sort one entry into folder or file and count it; `None` for skipped entries
    fn classify(&self, entry: &DirEntry) -> Result<Option<Child>> {
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_marker_name(&name) {
            return Ok(None);
        }

        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| Error::io_at("read file type of", &path, &e))?;

        if file_type.is_dir() {
            self.progress.add_folder();
            Ok(Some(Child::Folder(path)))
        } else if file_type.is_file() {
            let metadata = entry
                .metadata()
                .map_err(|e| Error::io_at("read metadata of", &path, &e))?;
            self.progress.add_file();
            Ok(Some(Child::File(FileSignature::from_metadata(
                &name, &metadata,
            ))))
        } else {
            debug!("Ignoring non-regular entry {}", path.display());
            Ok(None)
        }
    }
}

enum Child {
    Folder(PathBuf),
    File(FileSignature),
}

/// Direct entries of `dir` in ascending byte-wise name order
pub(crate) fn sorted_entries(dir: &Path) -> Result<Vec<DirEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::io_at("list", dir, &e))? {
        match entry {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!("Unreadable entry in {}: {}", dir.display(), e),
        }
    }
    entries.sort_by_key(DirEntry::file_name);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::FingerprintQueue;
    use filetime::{set_file_mtime, FileTime};
    use tempfile::TempDir;
    use treesync_types::RunId;

    fn scan(root: &Path) -> (Option<FolderHash>, ScanProgress) {
        let progress = ScanProgress::new(RunId::new_v4(), FingerprintQueue::new());
        let scanner = FolderScanner::new(progress.clone(), CancellationToken::new());
        (scanner.scan(root), progress)
    }

    fn drain(progress: &ScanProgress) -> Vec<FolderFingerprint> {
        std::iter::from_fn(|| progress.queue().try_pop()).collect()
    }

    fn write_file(path: &Path, content: &str, mtime_secs: i64) {
        fs::write(path, content).unwrap();
        set_file_mtime(path, FileTime::from_unix_time(mtime_secs, 0)).unwrap();
    }

    #[test]
    fn test_empty_root() {
        let temp_dir = TempDir::new().unwrap();
        let (hash, progress) = scan(temp_dir.path());

        assert_eq!(hash, Some(17));
        assert_eq!(progress.root_hash(), Some(17));
        let snapshot = progress.snapshot();
        assert!(snapshot.done);
        assert_eq!(snapshot.total(), 0);
        assert_eq!(drain(&progress), vec![FolderFingerprint::new(temp_dir.path(), 17)]);
    }

    #[test]
    fn test_single_file_hash() {
        let temp_dir = TempDir::new().unwrap();
        write_file(&temp_dir.path().join("a"), "xyz", 1);

        let (hash, progress) = scan(temp_dir.path());

        let expected = FingerprintBuilder::new()
            .append_file(&FileSignature {
                name: "a".to_string(),
                size: 3,
                modified_millis: 1_000,
            })
            .finish();
        assert_eq!(hash, Some(expected));
        assert_eq!(progress.file_count(), 1);
    }

    #[test]
    fn test_post_order_and_counts() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("b/inner")).unwrap();
        fs::create_dir(root.join("a")).unwrap();
        write_file(&root.join("b/inner/deep.txt"), "deep", 10);
        write_file(&root.join("top.txt"), "top", 20);

        let (hash, progress) = scan(root);
        let queued = drain(&progress);

        let order: Vec<PathBuf> = queued.iter().map(|f| f.path().to_path_buf()).collect();
        assert_eq!(
            order,
            vec![
                root.join("a"),
                root.join("b/inner"),
                root.join("b"),
                root.to_path_buf(),
            ]
        );
        assert_eq!(queued.last().map(FolderFingerprint::hash), hash);
        assert_eq!(progress.folder_count(), 3);
        assert_eq!(progress.file_count(), 2);
    }

    #[test]
    fn test_marker_files_are_ignored() {
        let temp_dir = TempDir::new().unwrap();
        write_file(&temp_dir.path().join("data.bin"), "1", 5);
        let (before, _) = scan(temp_dir.path());

        crate::marker::write_marker(temp_dir.path(), 1).unwrap();
        let (after, progress) = scan(temp_dir.path());

        assert_eq!(before, after);
        assert_eq!(progress.file_count(), 1);
    }

    #[test]
    fn test_mtime_change_propagates_to_ancestors_only() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("left")).unwrap();
        fs::create_dir_all(root.join("right")).unwrap();
        write_file(&root.join("left/l.txt"), "l", 100);
        write_file(&root.join("right/r.txt"), "r", 100);

        let (_, first) = scan(root);
        let first = drain(&first);
        write_file(&root.join("left/l.txt"), "l", 200);
        let (_, second) = scan(root);
        let second = drain(&second);

        // queue order: left, right, root
        assert_ne!(first[0].hash(), second[0].hash());
        assert_eq!(first[1].hash(), second[1].hash());
        assert_ne!(first[2].hash(), second[2].hash());
    }

    #[test]
    fn test_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let (hash, progress) = scan(&temp_dir.path().join("absent"));

        assert_eq!(hash, Some(0));
        assert!(progress.is_done());
        assert!(progress.queue().is_empty());
    }

    #[test]
    fn test_cancelled_scan_queues_nothing_above_cut() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("sub")).unwrap();

        let progress = ScanProgress::new(RunId::new_v4(), FingerprintQueue::new());
        let token = CancellationToken::new();
        token.cancel();
        let scanner = FolderScanner::new(progress.clone(), token);

        assert_eq!(scanner.scan(temp_dir.path()), None);
        assert!(progress.is_done());
        assert!(progress.was_interrupted());
        assert!(progress.queue().is_empty());
    }

    #[test]
    fn test_vanished_child_contributes_zero() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::create_dir_all(root.join("b")).unwrap();
        write_file(&root.join("a/x.txt"), "x", 10);
        write_file(&root.join("b/y.txt"), "y", 10);
        write_file(&root.join("c.txt"), "c", 10);

        let progress = ScanProgress::new(RunId::new_v4(), FingerprintQueue::new());
        let scanner = FolderScanner::new(progress.clone(), CancellationToken::new());
        let (folders, files) = scanner.read_children(root).unwrap();

        // Gone between listing the root and descending into it
        fs::remove_dir_all(root.join("b")).unwrap();
        let hash = scanner.fold_children(root, &folders, &files);

        let queued = drain(&progress);
        let a = root.join("a");
        let paths: Vec<&Path> = queued.iter().map(FolderFingerprint::path).collect();
        assert_eq!(paths, vec![a.as_path(), root]);

        let c = fs::metadata(root.join("c.txt")).unwrap();
        let expected = FingerprintBuilder::new()
            .append_i32(queued[0].hash())
            .append_i32(0)
            .append_file(&FileSignature::from_metadata("c.txt", &c))
            .finish();
        assert_eq!(hash, Some(expected));
        assert_eq!(queued[1].hash(), expected);
        assert!(!progress.was_interrupted());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_followed() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("real")).unwrap();
        std::os::unix::fs::symlink(root.join("real"), root.join("link")).unwrap();

        let (_, progress) = scan(root);
        assert_eq!(progress.folder_count(), 1);
    }
}
