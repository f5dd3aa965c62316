//! Latest-wins guard for overlapping listing requests.
//!
//! A client that re-queries on every filter change can have several
//! requests in flight. Each one takes a ticket before it starts; only the
//! response holding the most recently issued ticket may be applied, so a
//! slow older response can never overwrite newer state.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
pub struct ListingSequencer {
    issued: AtomicU64,
}

impl ListingSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> Ticket {
        Ticket(self.issued.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.issued.load(Ordering::Acquire) == ticket.0
    }

    /// Hands the response back only if no newer request has started.
    pub fn accept<T>(&self, ticket: Ticket, response: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(response)
        } else {
            debug!(ticket = ticket.0, "discarding stale listing response");
            None
        }
    }
}
