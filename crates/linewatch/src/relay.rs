//! Single-slot frame hand-off between the acquisition loop and the
//! detection worker.
//!
//! The slot holds at most one pending frame: `offer` drops the new frame
//! while the previous one has not been taken yet, so the detection worker
//! never builds a backlog and always works on the most recent frame it had
//! a chance to pick up. Built on a bounded channel so the worker blocks
//! instead of spinning while the slot is empty.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use frame_source::Frame;

pub struct FrameRelay {
    tx: Sender<Frame>,
}

pub struct FrameOutlet {
    rx: Receiver<Frame>,
}

/// Outcome of a [`FrameOutlet::take`] poll.
pub enum Take {
    Frame(Frame),
    /// Nothing arrived within the timeout.
    Empty,
    /// The acquisition side is gone; no more frames will ever arrive.
    Closed,
}

/// Create a connected relay/outlet pair.
pub fn frame_relay() -> (FrameRelay, FrameOutlet) {
    let (tx, rx) = bounded(1);
    (FrameRelay { tx }, FrameOutlet { rx })
}

impl FrameRelay {
    /// Hand a frame to the detection worker. Returns false when the slot
    /// was still occupied and the frame was dropped.
    pub fn offer(&self, frame: Frame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

impl FrameOutlet {
    /// Wait up to `timeout` for the next frame. The timeout keeps the
    /// detection worker responsive to the stop flag.
    pub fn take(&self, timeout: Duration) -> Take {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Take::Frame(frame),
            Err(RecvTimeoutError::Timeout) => Take::Empty,
            Err(RecvTimeoutError::Disconnected) => Take::Closed,
        }
    }
}
