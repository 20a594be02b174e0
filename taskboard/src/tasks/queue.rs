//! Holds push events that arrive before the first snapshot is loaded.
//!
//! The queue starts out buffering. [`EventQueue::drain_into`] replays the
//! buffer in arrival order exactly once and switches the queue to live mode,
//! after which [`EventQueue::dispatch`] applies events immediately.

use std::collections::VecDeque;

use taskboard_proto::event::PushEvent;
use tracing::{debug, warn};

use super::ReconcileError;
use super::reconcile::{Outcome, Reconciler};

/// Result of handing an event to [`EventQueue::dispatch`].
#[derive(Debug)]
pub enum Dispatch {
    /// Buffered until the snapshot loads; `depth` is the new queue length.
    Queued {
        /// Number of buffered events including this one.
        depth: usize,
    },
    /// Applied to the reconciler.
    Applied(Result<Outcome, ReconcileError>),
}

/// FIFO buffer for pre-initialization events.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<PushEvent>,
    live: bool,
}

impl EventQueue {
    /// Creates an empty, buffering queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers an event.
    ///
    /// Once the queue is live it no longer buffers: the event is handed back
    /// so the caller can apply it directly.
    #[must_use]
    pub fn enqueue(&mut self, event: PushEvent) -> Option<PushEvent> {
        if self.live {
            return Some(event);
        }
        debug!(kind = event.kind(), depth = self.pending.len() + 1, "event queued");
        self.pending.push_back(event);
        None
    }

    /// Queues the event before initialization, applies it afterwards.
    pub fn dispatch(&mut self, event: PushEvent, reconciler: &mut Reconciler) -> Dispatch {
        match self.enqueue(event) {
            None => Dispatch::Queued {
                depth: self.pending.len(),
            },
            Some(event) => Dispatch::Applied(reconciler.apply(&event)),
        }
    }

    /// Applies every buffered event in arrival order and goes live.
    ///
    /// Runs at most once; later calls return immediately. An event that fails
    /// to apply is reported and skipped without stopping the drain.
    pub fn drain_into(&mut self, reconciler: &mut Reconciler) -> Vec<ReconcileError> {
        if self.live {
            return Vec::new();
        }
        self.live = true;
        let mut errors = Vec::new();
        let drained = self.pending.len();
        while let Some(event) = self.pending.pop_front() {
            if let Err(e) = reconciler.apply(&event) {
                warn!(kind = event.kind(), error = %e, "queued event rejected");
                errors.push(e);
            }
        }
        debug!(drained, rejected = errors.len(), "event queue drained");
        errors
    }

    /// Number of buffered events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Whether the queue has been drained and now passes events through.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.live
    }
}
