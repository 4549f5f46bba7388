//! Sync service: owns a run's cancellation token and worker threads

use crate::cancel::CancellationToken;
use crate::progress::{ScanProgress, TransferProgress};
use crate::queue::FingerprintQueue;
use crate::scanner::FolderScanner;
use crate::transfer::TransferWorker;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{error, info, info_span};
use treesync_config::SyncConfig;
use treesync_types::{Error, Result, RunId, RunReport};

/// Tunables for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// How long the transfer worker blocks on an empty queue per poll
    pub idle_wait: Duration,
    /// Bound on queued fingerprints; unbounded when `None`
    pub queue_capacity: Option<usize>,
    /// Copy access and modification times onto copied files
    pub preserve_timestamps: bool,
    /// Copy permission bits onto copied files
    pub preserve_permissions: bool,
    /// Write markers into destination folders that hold no files
    pub write_empty_markers: bool,
    /// Cancel the run automatically after this long
    pub run_timeout: Option<Duration>,
}

impl SyncOptions {
    /// Set the run timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            idle_wait: config.idle_wait(),
            queue_capacity: config.queue_capacity,
            preserve_timestamps: config.preserve_timestamps,
            preserve_permissions: config.preserve_permissions,
            write_empty_markers: config.write_empty_markers,
            run_timeout: config.run_timeout(),
        }
    }
}

#[derive(Debug, Default)]
struct RunState {
    cancel: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

/// Starts scans and transfers on named worker threads and controls their lifetime.
///
/// Each [`start_scan`](Self::start_scan) begins a new run with a fresh
/// cancellation token; [`start_transfer`](Self::start_transfer) attaches a
/// transfer worker to that run.
#[derive(Debug)]
pub struct SyncService {
    options: SyncOptions,
    state: Mutex<RunState>,
}

impl SyncService {
    /// Create a service with the given options
    pub fn new(options: SyncOptions) -> Self {
        Self {
            options,
            state: Mutex::default(),
        }
    }

    /// Options applied to every run
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Start scanning `source` on the `scan-thread` worker and return its progress
    pub fn start_scan<P: AsRef<Path>>(&self, source: P) -> Result<ScanProgress> {
        let root = source.as_ref().to_path_buf();
        let run_id = RunId::new_v4();
        let cancel = match self.options.run_timeout {
            Some(timeout) => CancellationToken::new().with_timeout(timeout),
            None => CancellationToken::new(),
        };

        let progress = ScanProgress::new(
            run_id,
            FingerprintQueue::with_capacity(self.options.queue_capacity),
        );
        let scanner = FolderScanner::new(progress.clone(), cancel.clone());
        let span = info_span!("scan", run_id = %run_id, root = %root.display());

        let spawned = thread::Builder::new()
            .name("scan-thread".to_string())
            .spawn(move || {
                let _entered = span.enter();
                scanner.scan(&root);
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                progress.mark_done();
                return Err(Error::sync(format!("Failed to start scan thread: {}", e)));
            }
        };

        let mut state = self.lock();
        state.cancel = cancel;
        state.workers.push(handle);
        info!(%run_id, "Run started");
        Ok(progress)
    }

    /// Start the `transfer-thread` worker consuming `scan`'s queue.
    ///
    /// Fails with [`Error::Cancelled`] if the current run was already stopped.
    pub fn start_transfer<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source: P,
        destination: Q,
        scan: &ScanProgress,
    ) -> Result<TransferProgress> {
        let mut state = self.lock();
        if state.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let run_id = scan.run_id();
        let progress = TransferProgress::new(run_id);
        let source: PathBuf = source.as_ref().to_path_buf();
        let destination: PathBuf = destination.as_ref().to_path_buf();
        let span = info_span!(
            "transfer",
            run_id = %run_id,
            root = %source.display(),
            destination = %destination.display()
        );
        let worker = TransferWorker::new(
            source,
            destination,
            self.options.clone(),
            scan.clone(),
            progress.clone(),
            state.cancel.clone(),
        );

        let spawned = thread::Builder::new()
            .name("transfer-thread".to_string())
            .spawn(move || {
                let _entered = span.enter();
                worker.run();
            });

        match spawned {
            Ok(handle) => {
                state.workers.push(handle);
                Ok(progress)
            }
            Err(e) => {
                progress.mark_done();
                Err(Error::sync(format!("Failed to start transfer thread: {}", e)))
            }
        }
    }

    /// Request cancellation of the current run
    pub fn stop(&self) {
        self.lock().cancel.cancel();
        info!("Stop requested");
    }

    /// Whether the current run has been stopped or has timed out
    pub fn is_cancelled(&self) -> bool {
        self.lock().cancel.is_cancelled()
    }

    /// Wait for every started worker thread to exit
    pub fn join(&self) -> Result<()> {
        let workers = std::mem::take(&mut self.lock().workers);
        let mut result = Ok(());
        for worker in workers {
            let name = worker.thread().name().unwrap_or("worker").to_string();
            if worker.join().is_err() {
                error!("Worker thread {} panicked", name);
                result = Err(Error::sync(format!("Worker thread {} panicked", name)));
            }
        }
        result
    }

    /// Run a complete sync of `source` into `destination` and wait for it to finish
    pub fn sync<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source: P,
        destination: Q,
    ) -> Result<RunReport> {
        let started = Instant::now();
        let scan = self.start_scan(&source)?;
        let transfer = match self.start_transfer(&source, &destination, &scan) {
            Ok(transfer) => transfer,
            Err(e) => {
                let _ = self.join();
                return Err(e);
            }
        };
        self.join()?;

        Ok(self.report(
            source.as_ref(),
            destination.as_ref(),
            &scan,
            &transfer,
            started.elapsed(),
        ))
    }

    /// Summarise a run from its progress handles
    pub fn report(
        &self,
        source: &Path,
        destination: &Path,
        scan: &ScanProgress,
        transfer: &TransferProgress,
        duration: Duration,
    ) -> RunReport {
        RunReport {
            run_id: scan.run_id(),
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            scan: scan.snapshot(),
            transfer: transfer.snapshot(),
            cancelled: scan.was_interrupted() || transfer.was_interrupted(),
            duration,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SyncService {
    fn default() -> Self {
        Self::new(SyncOptions::default())
    }
}
