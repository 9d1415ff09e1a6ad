//! Capacity-1 channels coordinating workers, frame servers and the live review feed.
//!
//! Every channel holds at most one pending message. Producers never block: `offer`
//! reports whether the message was delivered or dropped because the slot was full
//! (or the consumer is gone). A slow consumer therefore never stalls a detector.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::time::Duration;

use crate::frame::Frame;
use crate::messages::{CancelNotice, FetchRequest, LiveReviewMetadata};

/// Outcome of a non-blocking publish.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Dropped,
}

impl Delivery {
    pub fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered)
    }
}

pub struct SlotSender<T> {
    inner: Sender<T>,
}

// Manual impl: derive would require `T: Clone`.
impl<T> Clone for SlotSender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> SlotSender<T> {
    pub fn offer(&self, msg: T) -> Delivery {
        match self.inner.try_send(msg) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => Delivery::Dropped,
        }
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }
}

pub struct SlotReceiver<T> {
    inner: Receiver<T>,
}

impl<T> Clone for SlotReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> SlotReceiver<T> {
    /// Waits up to `timeout`. `None` on timeout or when every sender is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        match self.inner.recv_timeout(timeout) {
            Ok(msg) => Some(msg),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_recv(&self) -> Option<T> {
        self.inner.try_recv().ok()
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Underlying receiver, for use with `crossbeam_channel::Select`.
    pub(crate) fn raw(&self) -> &Receiver<T> {
        &self.inner
    }
}

/// Creates a capacity-1 channel.
pub fn slot<T>() -> (SlotSender<T>, SlotReceiver<T>) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    (SlotSender { inner: tx }, SlotReceiver { inner: rx })
}

/// The queue ends a detector worker owns.
pub struct WorkerQueues {
    pub fetch: SlotSender<FetchRequest>,
    pub frames: SlotReceiver<Option<Frame>>,
    pub metadata: SlotSender<LiveReviewMetadata>,
    pub cancel: SlotSender<CancelNotice>,
}

/// The grabber-side ends of one detector's private queue pair.
pub struct FrameRequests {
    pub detector_index: usize,
    pub image_source_index: Option<usize>,
    pub fetch: SlotReceiver<FetchRequest>,
    pub frames: SlotSender<Option<Frame>>,
}

/// Consumer ends of the two shared broadcast queues.
#[derive(Clone)]
pub struct LiveReviewFeed {
    pub metadata: SlotReceiver<LiveReviewMetadata>,
    pub cancel: SlotReceiver<CancelNotice>,
}

/// Allocates the shared broadcast queues once and a private pair per detector.
pub struct QueueFabric {
    metadata_tx: SlotSender<LiveReviewMetadata>,
    cancel_tx: SlotSender<CancelNotice>,
    feed: LiveReviewFeed,
}

impl QueueFabric {
    pub fn new() -> Self {
        let (metadata_tx, metadata_rx) = slot();
        let (cancel_tx, cancel_rx) = slot();
        Self {
            metadata_tx,
            cancel_tx,
            feed: LiveReviewFeed {
                metadata: metadata_rx,
                cancel: cancel_rx,
            },
        }
    }

    /// Allocates the private fetch/frame pair for one detector. The shared queue
    /// senders are cloned into the worker half.
    pub fn detector_pair(
        &self,
        detector_index: usize,
        image_source_index: Option<usize>,
    ) -> (WorkerQueues, FrameRequests) {
        let (fetch_tx, fetch_rx) = slot();
        let (frame_tx, frame_rx) = slot();
        let worker = WorkerQueues {
            fetch: fetch_tx,
            frames: frame_rx,
            metadata: self.metadata_tx.clone(),
            cancel: self.cancel_tx.clone(),
        };
        let requests = FrameRequests {
            detector_index,
            image_source_index,
            fetch: fetch_rx,
            frames: frame_tx,
        };
        (worker, requests)
    }

    pub fn live_review(&self) -> LiveReviewFeed {
        self.feed.clone()
    }
}

impl Default for QueueFabric {
    fn default() -> Self {
        Self::new()
    }
}
