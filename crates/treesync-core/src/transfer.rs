//! Transfer worker: applies queued fingerprints to the destination tree

use crate::cancel::CancellationToken;
use crate::fingerprint::FolderFingerprint;
use crate::marker::{is_marker_name, read_marker, write_marker};
use crate::progress::{DoneGuard, ScanProgress, TransferProgress};
use crate::scanner::sorted_entries;
use crate::service::SyncOptions;
use filetime::FileTime;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use treesync_types::{Error, Result};

const COMPARE_BUFFER_SIZE: usize = 64 * 1024;

/// Outcome of copying one folder's files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FolderOutcome {
    /// Every file is present in the destination
    Complete { files: usize },
    /// At least one file could not be copied
    Failed,
    /// Cancellation was observed before the folder was finished
    Interrupted,
}

/// Drains a scan's fingerprint queue into a destination tree
#[derive(Debug)]
pub struct TransferWorker {
    source_root: PathBuf,
    destination_root: PathBuf,
    options: SyncOptions,
    scan: ScanProgress,
    progress: TransferProgress,
    cancel: CancellationToken,
}

impl TransferWorker {
    /// Create a worker mirroring `source_root` under `destination_root`
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(
        source_root: P,
        destination_root: Q,
        options: SyncOptions,
        scan: ScanProgress,
        progress: TransferProgress,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            destination_root: destination_root.into(),
            options,
            scan,
            progress,
            cancel,
        }
    }

    /// Process fingerprints until the scan is done and the queue is drained, or
    /// until cancellation. The progress `done` flag is set on every exit path.
    pub fn run(&self) {
        let _done = DoneGuard::new(|| self.progress.mark_done());
        info!(
            "Transferring {} -> {}",
            self.source_root.display(),
            self.destination_root.display()
        );

        let queue = self.scan.queue();
        loop {
            if self.cancel.is_cancelled() {
                self.progress.mark_interrupted();
                break;
            }
            let next = match queue.pop_timeout(self.options.idle_wait) {
                Some(fingerprint) => Some(fingerprint),
                // A fingerprint pushed just before `done` was set is still in the queue
                None if self.scan.is_done() => queue.try_pop(),
                None => continue,
            };
            let Some(fingerprint) = next else {
                break;
            };
            if let Err(e) = self.process(&fingerprint) {
                warn!("Failed to transfer {}: {}", fingerprint.path().display(), e);
            }
        }

        info!(
            "Transfer {}: {} folders created, {} files copied",
            if self.progress.was_interrupted() {
                "cancelled"
            } else {
                "finished"
            },
            self.progress.folder_count(),
            self.progress.file_count()
        );
    }

    fn process(&self, fingerprint: &FolderFingerprint) -> Result<()> {
        let destination = self.destination_for(fingerprint.path())?;
        self.create_folders(&destination)?;

        let marker = read_marker(&destination);
        if marker == Some(fingerprint.hash()) {
            debug!("Unchanged: {}", fingerprint.path().display());
            return Ok(());
        }
        debug!(
            "Changed: {} (marker {:?}, fingerprint {})",
            fingerprint.path().display(),
            marker,
            fingerprint.hash()
        );

        match self.copy_files(fingerprint.path(), &destination)? {
            FolderOutcome::Complete { files } => {
                if files == 0 && !self.options.write_empty_markers {
                    return Ok(());
                }
                if let Err(e) = write_marker(&destination, fingerprint.hash()) {
                    warn!("{}; folder will be copied again next run", e);
                }
            }
            FolderOutcome::Failed => {
                warn!(
                    "Not marking {}: some files were not copied",
                    destination.display()
                );
            }
            FolderOutcome::Interrupted => {
                debug!("Interrupted in {}", destination.display());
            }
        }
        Ok(())
    }

    /// `destination_root / (folder relative to the source root's parent)`
    pub fn destination_for(&self, folder: &Path) -> Result<PathBuf> {
        let base = self.source_root.parent().unwrap_or(&self.source_root);
        let relative = folder.strip_prefix(base).map_err(|_| {
            Error::sync(format!(
                "{} is outside the source root {}",
                folder.display(),
                self.source_root.display()
            ))
        })?;
        Ok(self.destination_root.join(relative))
    }

    /// Create `folder` and missing parents, counting each one created
    fn create_folders(&self, folder: &Path) -> Result<()> {
        let missing: Vec<&Path> = folder
            .ancestors()
            .take_while(|dir| !dir.as_os_str().is_empty() && !dir.exists())
            .collect();

        for dir in missing.into_iter().rev() {
            match fs::create_dir(dir) {
                Ok(()) => {
                    self.progress.add_folder();
                    debug!("Created folder {}", dir.display());
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => {}
                Err(e) => return Err(Error::io_at("create", dir, &e)),
            }
        }
        Ok(())
    }

    fn copy_files(&self, source: &Path, destination: &Path) -> Result<FolderOutcome> {
        let mut files = 0;
        let mut failed = false;

        for entry in sorted_entries(source)? {
            let name = entry.file_name();
            if is_marker_name(&name.to_string_lossy()) {
                continue;
            }
            match entry.file_type() {
                Ok(file_type) if file_type.is_file() => {}
                Ok(_) => continue,
                Err(e) => {
                    warn!("Skipping {}: {}", entry.path().display(), e);
                    failed = true;
                    continue;
                }
            }

            if self.cancel.is_cancelled() {
                return Ok(FolderOutcome::Interrupted);
            }

            files += 1;
            let target = destination.join(&name);
            match self.copy_file(&entry.path(), &target) {
                Ok(true) => self.progress.add_file(),
                Ok(false) => debug!("Identical: {}", target.display()),
                Err(e) => {
                    warn!("{}", e);
                    failed = true;
                }
            }
        }

        Ok(if failed {
            FolderOutcome::Failed
        } else {
            FolderOutcome::Complete { files }
        })
    }

    /// Copy one file unless the destination already holds the same bytes.
    /// Returns whether a copy was made.
    fn copy_file(&self, source: &Path, target: &Path) -> Result<bool> {
        if target.is_file() {
            match files_identical(source, target) {
                Ok(true) => return Ok(false),
                Ok(false) => {}
                Err(e) => debug!("Could not compare {}: {}", target.display(), e),
            }
            // A preserved read-only mode forbids writing into the old copy
            fs::remove_file(target).map_err(|e| Error::io_at("replace", target, &e))?;
        }

        fs::copy(source, target).map_err(|e| Error::io_at("copy", source, &e))?;
        self.preserve_metadata(source, target)?;
        debug!("Copied {} -> {}", source.display(), target.display());
        Ok(true)
    }

    fn preserve_metadata(&self, source: &Path, target: &Path) -> Result<()> {
        if !self.options.preserve_timestamps && !self.options.preserve_permissions {
            return Ok(());
        }

        let metadata =
            fs::metadata(source).map_err(|e| Error::io_at("read metadata of", source, &e))?;

        if self.options.preserve_timestamps {
            let accessed = FileTime::from_last_access_time(&metadata);
            let modified = FileTime::from_last_modification_time(&metadata);
            filetime::set_file_times(target, accessed, modified)
                .map_err(|e| Error::io_at("set timestamps on", target, &e))?;
        }

        if self.options.preserve_permissions {
            fs::set_permissions(target, metadata.permissions())
                .map_err(|e| Error::io_at("set permissions on", target, &e))?;
        }

        Ok(())
    }
}

/// Byte-for-byte comparison, short-circuiting on length
pub fn files_identical(left: &Path, right: &Path) -> io::Result<bool> {
    if fs::metadata(left)?.len() != fs::metadata(right)?.len() {
        return Ok(false);
    }

    let mut left = BufReader::new(File::open(left)?);
    let mut right = BufReader::new(File::open(right)?);
    let mut left_buf = vec![0u8; COMPARE_BUFFER_SIZE];
    let mut right_buf = vec![0u8; COMPARE_BUFFER_SIZE];

    loop {
        let read = read_full(&mut left, &mut left_buf)?;
        if read != read_full(&mut right, &mut right_buf)? {
            return Ok(false);
        }
        if read == 0 {
            return Ok(true);
        }
        if left_buf[..read] != right_buf[..read] {
            return Ok(false);
        }
    }
}

/// Fill `buf` unless EOF comes first; returns the number of bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::{marker_path, MARKER_FILE_NAME};
    use crate::queue::FingerprintQueue;
    use crate::scanner::FolderScanner;
    use std::time::Duration;
    use tempfile::TempDir;
    use treesync_types::RunId;

    struct Fixture {
        _temp: TempDir,
        source: PathBuf,
        destination: PathBuf,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src");
        let destination = temp.path().join("dst");
        fs::create_dir_all(&source).unwrap();
        Fixture {
            _temp: temp,
            source,
            destination,
        }
    }

    fn worker(fixture: &Fixture, options: SyncOptions) -> (TransferWorker, ScanProgress) {
        let run_id = RunId::new_v4();
        let scan = ScanProgress::new(run_id, FingerprintQueue::new());
        let worker = TransferWorker::new(
            &fixture.source,
            &fixture.destination,
            options,
            scan.clone(),
            TransferProgress::new(run_id),
            CancellationToken::new(),
        );
        (worker, scan)
    }

    fn run_once(fixture: &Fixture, options: SyncOptions) -> TransferProgress {
        let (worker, scan) = worker(fixture, options);
        FolderScanner::new(scan, CancellationToken::new()).scan(&fixture.source);
        worker.run();
        worker.progress.clone()
    }

    #[test]
    fn test_destination_mapping_keeps_root_name() {
        let fixture = fixture();
        let (worker, _) = worker(&fixture, SyncOptions::default());

        assert_eq!(
            worker.destination_for(&fixture.source.join("a/b")).unwrap(),
            fixture.destination.join("src/a/b")
        );
        assert!(worker.destination_for(Path::new("/elsewhere")).is_err());
    }

    #[test]
    fn test_copy_and_skip_on_second_run() {
        let fixture = fixture();
        fs::write(fixture.source.join("one.txt"), "1").unwrap();
        fs::create_dir(fixture.source.join("nested")).unwrap();
        fs::write(fixture.source.join("nested/two.txt"), "2").unwrap();

        let first = run_once(&fixture, SyncOptions::default()).snapshot();
        assert!(first.done);
        assert_eq!(first.file_count, 2);
        // dst, dst/src, dst/src/nested
        assert_eq!(first.folder_count, 3);

        let mirrored = fixture.destination.join("src");
        assert_eq!(fs::read_to_string(mirrored.join("nested/two.txt")).unwrap(), "2");
        assert!(marker_path(&mirrored).exists());
        assert!(marker_path(&mirrored.join("nested")).exists());

        let second = run_once(&fixture, SyncOptions::default()).snapshot();
        assert_eq!(second.file_count, 0);
        assert_eq!(second.folder_count, 0);
    }

    #[test]
    fn test_identical_destination_file_not_counted() {
        let fixture = fixture();
        fs::write(fixture.source.join("same.txt"), "same").unwrap();
        let mirrored = fixture.destination.join("src");
        fs::create_dir_all(&mirrored).unwrap();
        fs::write(mirrored.join("same.txt"), "same").unwrap();

        let progress = run_once(&fixture, SyncOptions::default());
        assert_eq!(progress.file_count(), 0);
        assert!(marker_path(&mirrored).exists());
    }

    #[test]
    fn test_empty_folder_marker_policy() {
        let fixture = fixture();
        fs::create_dir(fixture.source.join("empty")).unwrap();

        let options = SyncOptions {
            write_empty_markers: false,
            ..SyncOptions::default()
        };
        run_once(&fixture, options);
        let empty = fixture.destination.join("src/empty");
        assert!(empty.is_dir());
        assert!(!marker_path(&empty).exists());

        run_once(&fixture, SyncOptions::default());
        assert!(marker_path(&empty).exists());
    }

    #[test]
    fn test_source_markers_are_not_copied() {
        let fixture = fixture();
        fs::write(fixture.source.join(MARKER_FILE_NAME), "hashcode=1").unwrap();
        fs::write(fixture.source.join("data"), "x").unwrap();

        let progress = run_once(&fixture, SyncOptions::default());
        assert_eq!(progress.file_count(), 1);
        let marker = read_marker(&fixture.destination.join("src"));
        assert_ne!(marker, Some(1));
    }

    #[test]
    fn test_preserves_modification_time() {
        let fixture = fixture();
        let file = fixture.source.join("old.txt");
        fs::write(&file, "old").unwrap();
        filetime::set_file_mtime(&file, FileTime::from_unix_time(1_000_000, 0)).unwrap();

        run_once(&fixture, SyncOptions::default());

        let copied = fs::metadata(fixture.destination.join("src/old.txt")).unwrap();
        assert_eq!(
            FileTime::from_last_modification_time(&copied),
            FileTime::from_unix_time(1_000_000, 0)
        );
    }

    #[test]
    fn test_terminates_when_scan_done_and_queue_empty() {
        let fixture = fixture();
        let (worker, scan) = worker(&fixture, SyncOptions::default());
        scan.mark_done();

        worker.run();
        assert!(worker.progress.is_done());
        assert!(!worker.progress.was_interrupted());
        assert_eq!(worker.progress.file_count(), 0);
    }

    #[test]
    fn test_late_fingerprint_is_not_lost() {
        let fixture = fixture();
        let (worker, scan) = worker(&fixture, SyncOptions::default());
        scan.queue()
            .push(FolderFingerprint::new(&fixture.source, 5), &CancellationToken::new());
        scan.mark_done();

        worker.run();
        assert_eq!(read_marker(&fixture.destination.join("src")), Some(5));
    }

    #[test]
    fn test_cancelled_worker_exits() {
        let fixture = fixture();
        let run_id = RunId::new_v4();
        let scan = ScanProgress::new(run_id, FingerprintQueue::new());
        let token = CancellationToken::new();
        let worker = TransferWorker::new(
            &fixture.source,
            &fixture.destination,
            SyncOptions {
                idle_wait: Duration::from_millis(1),
                ..SyncOptions::default()
            },
            scan,
            TransferProgress::new(run_id),
            token.clone(),
        );

        token.cancel();
        worker.run();
        assert!(worker.progress.is_done());
        assert!(!fixture.destination.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_copy_is_replaced() {
        use std::os::unix::fs::PermissionsExt;

        let fixture = fixture();
        let file = fixture.source.join("ro.txt");
        fs::write(&file, "v1").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o444)).unwrap();
        run_once(&fixture, SyncOptions::default());

        let copy = fixture.destination.join("src/ro.txt");
        assert_eq!(fs::metadata(&copy).unwrap().permissions().mode() & 0o777, 0o444);

        fs::set_permissions(&file, fs::Permissions::from_mode(0o644)).unwrap();
        fs::write(&file, "version2").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o444)).unwrap();

        let second = run_once(&fixture, SyncOptions::default());
        assert_eq!(second.file_count(), 1);
        assert_eq!(fs::read_to_string(&copy).unwrap(), "version2");
        assert_eq!(fs::metadata(&copy).unwrap().permissions().mode() & 0o777, 0o444);

        let third = run_once(&fixture, SyncOptions::default());
        assert_eq!(third.file_count(), 0);
    }

    #[test]
    fn test_cancelled_folder_is_left_unmarked() {
        let fixture = fixture();
        fs::write(fixture.source.join("a.txt"), "a").unwrap();
        fs::write(fixture.source.join("b.txt"), "b").unwrap();
        let run_id = RunId::new_v4();
        let token = CancellationToken::new();
        let worker = TransferWorker::new(
            &fixture.source,
            &fixture.destination,
            SyncOptions::default(),
            ScanProgress::new(run_id, FingerprintQueue::new()),
            TransferProgress::new(run_id),
            token.clone(),
        );

        token.cancel();
        worker
            .process(&FolderFingerprint::new(&fixture.source, 9))
            .unwrap();

        let mirrored = fixture.destination.join("src");
        assert!(mirrored.is_dir());
        assert!(read_marker(&mirrored).is_none());
        assert!(!mirrored.join("a.txt").exists());
    }

    #[test]
    fn test_cancel_between_files_leaves_no_marker() {
        const FILES: usize = 2000;
        let fixture = fixture();
        for index in 0..FILES {
            fs::write(fixture.source.join(format!("f{index:05}")), "x").unwrap();
        }
        let (worker, scan) = worker(&fixture, SyncOptions::default());
        FolderScanner::new(scan, CancellationToken::new()).scan(&fixture.source);

        let progress = worker.progress.clone();
        let token = worker.cancel.clone();
        let watcher = std::thread::spawn(move || {
            while progress.file_count() == 0 && !progress.is_done() {
                std::thread::yield_now();
            }
            token.cancel();
        });
        worker.run();
        watcher.join().unwrap();

        let copied = worker.progress.file_count();
        assert!(copied >= 1);
        assert!(copied < FILES as u64);
        assert!(worker.progress.is_done());
        assert!(worker.progress.was_interrupted());
        assert!(read_marker(&fixture.destination.join("src")).is_none());
    }

    #[test]
    fn test_files_identical() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        let c = temp.path().join("c");
        let big = vec![7u8; COMPARE_BUFFER_SIZE * 2 + 3];
        fs::write(&a, &big).unwrap();
        fs::write(&b, &big).unwrap();
        let mut changed = big.clone();
        changed[COMPARE_BUFFER_SIZE + 1] = 8;
        fs::write(&c, &changed).unwrap();

        assert!(files_identical(&a, &b).unwrap());
        assert!(!files_identical(&a, &c).unwrap());
        fs::write(&c, "short").unwrap();
        assert!(!files_identical(&a, &c).unwrap());
    }
}
