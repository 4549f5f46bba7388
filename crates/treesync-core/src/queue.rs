//! FIFO handoff of completed fingerprints from the scanner to the transfer worker

use crate::cancel::CancellationToken;
use crate::fingerprint::FolderFingerprint;
use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError};
use std::time::Duration;

/// How often a producer blocked on a full queue re-checks cancellation
const BACKPRESSURE_POLL: Duration = Duration::from_millis(10);

/// Thread-safe fingerprint queue, unbounded unless a capacity is given.
///
/// The queue owns both channel ends, so it never disconnects while shared.
#[derive(Debug, Clone)]
pub struct FingerprintQueue {
    tx: Sender<FolderFingerprint>,
    rx: Receiver<FolderFingerprint>,
    capacity: Option<usize>,
}

impl FingerprintQueue {
    /// Create an unbounded queue
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            tx,
            rx,
            capacity: None,
        }
    }

    /// Create a queue holding at most `capacity` fingerprints (at least one)
    pub fn bounded(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        Self {
            tx,
            rx,
            capacity: Some(capacity),
        }
    }

    /// Create a queue from an optional capacity
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        capacity.map_or_else(Self::new, Self::bounded)
    }

    /// Configured capacity, `None` when unbounded
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Append a fingerprint.
    ///
    /// On a bounded queue this blocks while the queue is full, and gives up
    /// (returning `false`) once `cancel` is observed.
    pub fn push(&self, fingerprint: FolderFingerprint, cancel: &CancellationToken) -> bool {
        let mut pending = match self.tx.try_send(fingerprint) {
            Ok(()) => return true,
            Err(TrySendError::Full(returned)) => returned,
            Err(TrySendError::Disconnected(_)) => return false,
        };
        loop {
            if cancel.is_cancelled() {
                return false;
            }
            match self.tx.send_timeout(pending, BACKPRESSURE_POLL) {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(returned)) => pending = returned,
                Err(SendTimeoutError::Disconnected(_)) => return false,
            }
        }
    }

    /// Remove the oldest fingerprint without blocking
    pub fn try_pop(&self) -> Option<FolderFingerprint> {
        self.rx.try_recv().ok()
    }

    /// Remove the oldest fingerprint, waiting up to `timeout` for one to arrive
    pub fn pop_timeout(&self, timeout: Duration) -> Option<FolderFingerprint> {
        match self.rx.recv_timeout(timeout) {
            Ok(fingerprint) => Some(fingerprint),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Number of queued fingerprints
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether the queue is currently empty
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for FingerprintQueue {
    fn default() -> Self {
        Self::new()
    }
}
