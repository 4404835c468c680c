//! Core projection trait and position tracking.

use async_trait::async_trait;
use event_store::EventEnvelope;

use crate::Result;

/// How far into the global event log a projection has read.
///
/// Positions count events, not sequence numbers: a projection at position `n`
/// has handled the first `n` events of the commit order, and resumes with
/// [`event_store::EventStore::stream_events_from`]`(n)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProjectionPosition {
    pub events_processed: u64,
}

impl ProjectionPosition {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn advance(&self) -> Self {
        Self {
            events_processed: self.events_processed + 1,
        }
    }

    /// True if the event at 1-based `index` in the log has not been handled yet.
    pub fn has_not_seen(&self, index: u64) -> bool {
        self.events_processed < index
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "position({})", self.events_processed)
    }
}

/// Turns stored events into a query-side read model.
///
/// Every event of the log is handed to every projection in order; a
/// projection must advance its position even for events it ignores.
#[async_trait]
pub trait Projection: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &EventEnvelope) -> Result<()>;

    async fn position(&self) -> ProjectionPosition;

    /// Clears the read model and rewinds to position zero.
    async fn reset(&self) -> Result<()>;
}
