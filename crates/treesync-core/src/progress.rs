//! Progress tracking for scan and transfer walkers
//!
//! Both progress objects are cheap-to-clone handles onto shared counters. Readers
//! can poll them from any thread; only the owning walker mutates them.

use crate::queue::FingerprintQueue;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};
use treesync_types::{FolderHash, ProgressSnapshot, RunId};

#[derive(Debug, Default)]
struct Counters {
    folder_count: AtomicU64,
    file_count: AtomicU64,
    interrupted: AtomicBool,
    done: Mutex<bool>,
    done_changed: Condvar,
}

impl Counters {
    fn folder_count(&self) -> u64 {
        self.folder_count.load(Ordering::SeqCst)
    }

    fn file_count(&self) -> u64 {
        self.file_count.load(Ordering::SeqCst)
    }

    fn is_done(&self) -> bool {
        *self.done.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn was_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    fn mark_interrupted(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    fn add_folder(&self) {
        self.folder_count.fetch_add(1, Ordering::SeqCst);
    }

    fn add_file(&self) {
        self.file_count.fetch_add(1, Ordering::SeqCst);
    }

    /// Returns `false` if the flag was already set
    fn mark_done(&self) -> bool {
        let mut done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        if *done {
            return false;
        }
        *done = true;
        drop(done);
        self.done_changed.notify_all();
        true
    }

    fn wait_done(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        while !*done {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            done = self
                .done_changed
                .wait_timeout(done, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    fn snapshot(&self) -> ProgressSnapshot {
        // Read done first so a `done` snapshot carries final counts
        let done = self.is_done();
        ProgressSnapshot {
            folder_count: self.folder_count(),
            file_count: self.file_count(),
            done,
        }
    }
}

/// Progress of one scan: folders and files discovered, plus the fingerprint queue
#[derive(Debug, Clone)]
pub struct ScanProgress {
    run_id: RunId,
    counters: Arc<Counters>,
    queue: FingerprintQueue,
    root_hash: Arc<OnceLock<FolderHash>>,
}

impl ScanProgress {
    /// Create progress for a new scan feeding `queue`
    pub fn new(run_id: RunId, queue: FingerprintQueue) -> Self {
        Self {
            run_id,
            counters: Arc::default(),
            queue,
            root_hash: Arc::default(),
        }
    }

    /// Run this scan belongs to
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Folders discovered so far (the root itself is not counted)
    pub fn folder_count(&self) -> u64 {
        self.counters.folder_count()
    }

    /// Files discovered so far
    pub fn file_count(&self) -> u64 {
        self.counters.file_count()
    }

    /// Whether the scan has finished
    pub fn is_done(&self) -> bool {
        self.counters.is_done()
    }

    /// Whether the scan stopped on cancellation before covering the whole tree
    pub fn was_interrupted(&self) -> bool {
        self.counters.was_interrupted()
    }

    /// Block until the scan finishes or `timeout` elapses; returns whether it finished
    pub fn wait_done(&self, timeout: Duration) -> bool {
        self.counters.wait_done(timeout)
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.counters.snapshot()
    }

    /// Queue of completed folder fingerprints
    pub fn queue(&self) -> &FingerprintQueue {
        &self.queue
    }

    /// Fingerprint of the scanned root, once the scan has completed uncancelled
    pub fn root_hash(&self) -> Option<FolderHash> {
        self.root_hash.get().copied()
    }

    pub(crate) fn set_root_hash(&self, hash: FolderHash) {
        let _ = self.root_hash.set(hash);
    }

    pub(crate) fn add_folder(&self) {
        self.counters.add_folder();
    }

    pub(crate) fn add_file(&self) {
        self.counters.add_file();
    }

    pub(crate) fn mark_interrupted(&self) {
        self.counters.mark_interrupted();
    }

    pub(crate) fn mark_done(&self) -> bool {
        self.counters.mark_done()
    }
}

/// Progress of one transfer: destination folders created and files copied
#[derive(Debug, Clone)]
pub struct TransferProgress {
    run_id: RunId,
    counters: Arc<Counters>,
}

impl TransferProgress {
    /// Create progress for a new transfer
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            counters: Arc::default(),
        }
    }

    /// Run this transfer belongs to
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Destination folders newly created so far
    pub fn folder_count(&self) -> u64 {
        self.counters.folder_count()
    }

    /// Files actually copied so far
    pub fn file_count(&self) -> u64 {
        self.counters.file_count()
    }

    /// Whether the transfer has finished
    pub fn is_done(&self) -> bool {
        self.counters.is_done()
    }

    /// Whether the transfer stopped on cancellation before draining the queue
    pub fn was_interrupted(&self) -> bool {
        self.counters.was_interrupted()
    }

    /// Block until the transfer finishes or `timeout` elapses; returns whether it finished
    pub fn wait_done(&self, timeout: Duration) -> bool {
        self.counters.wait_done(timeout)
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.counters.snapshot()
    }

    pub(crate) fn add_folder(&self) {
        self.counters.add_folder();
    }

    pub(crate) fn add_file(&self) {
        self.counters.add_file();
    }

    pub(crate) fn mark_interrupted(&self) {
        self.counters.mark_interrupted();
    }

    pub(crate) fn mark_done(&self) -> bool {
        self.counters.mark_done()
    }
}

/// Sets the done flag when dropped, including during panic unwinding
pub(crate) struct DoneGuard<F: Fn() -> bool> {
    mark_done: F,
}

impl<F: Fn() -> bool> DoneGuard<F> {
    pub(crate) fn new(mark_done: F) -> Self {
        Self { mark_done }
    }
}

impl<F: Fn() -> bool> Drop for DoneGuard<F> {
    fn drop(&mut self) {
        (self.mark_done)();
    }
}
