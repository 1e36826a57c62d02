//! Receive queue
//!
//! Bytes delivered by the data-ready path are appended here and taken out in
//! one piece by [`ReceiveQueue::drain`]. Appends and drains are serialized by
//! a single lock, so a drain observes either none or all of a burst.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::config::QueueBound;

/// FIFO of received payload bytes shared between the notification context
/// and the foreground
#[derive(Debug, Default)]
pub struct ReceiveQueue {
    bytes: Mutex<VecDeque<u8>>,
    bound: QueueBound,
    dropped: AtomicUsize,
}

impl ReceiveQueue {
    pub fn new(bound: QueueBound) -> Self {
        Self {
            bytes: Mutex::new(VecDeque::new()),
            bound,
            dropped: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<u8>> {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn bound(&self) -> QueueBound {
        self.bound
    }

    /// Appends `payload` in order and returns how many bytes were accepted.
    ///
    /// With a bounded queue the bytes that do not fit are discarded and
    /// counted in [`dropped`](ReceiveQueue::dropped).
    pub fn push(&self, payload: &[u8]) -> usize {
        let mut bytes = self.lock();
        let accepted = match self.bound {
            QueueBound::Unbounded => payload.len(),
            QueueBound::Bounded(limit) => limit.saturating_sub(bytes.len()).min(payload.len()),
        };
        bytes.extend(&payload[..accepted]);
        drop(bytes);

        let rejected = payload.len() - accepted;
        if rejected > 0 {
            self.dropped.fetch_add(rejected, Ordering::Relaxed);
            warn!(rejected, "receive queue full, bytes dropped");
        }
        accepted
    }

    /// Removes and returns everything queued, oldest byte first.
    pub fn drain(&self) -> Vec<u8> {
        self.lock().drain(..).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Bytes discarded because the queue was full
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}
