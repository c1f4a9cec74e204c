//! Supersede tracking for uploads.
//!
//! Every new upload takes a ticket. Only the newest ticket's result is
//! accepted; a run that finishes after a newer upload started is discarded.
//! Nothing is interrupted, the stale run simply loses.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTicket {
    generation: u64,
}

impl RunTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadSession {
    latest: Arc<AtomicU64>,
}

impl UploadSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new run, superseding any run still in flight.
    pub fn begin(&self) -> RunTicket {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(generation, "upload run started");
        RunTicket { generation }
    }

    pub fn is_current(&self, ticket: RunTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.generation
    }

    /// Hands back `result` only if `ticket` is still the newest run.
    pub fn accept<T>(&self, ticket: RunTicket, result: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(result)
        } else {
            tracing::info!(
                generation = ticket.generation,
                "discarding result of superseded upload"
            );
            None
        }
    }
}
