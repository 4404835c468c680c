//! Projection processor for feeding events to projections.

use event_store::EventStore;
use futures_util::StreamExt;
use tokio::sync::Mutex;

use crate::Result;
use crate::projection::Projection;

/// Processes events from an event store and delivers them to projections.
///
/// The processor supports:
/// - Catch-up: reads the log past the slowest projection's position
/// - Rebuild: resets all projections and replays from scratch
///
/// Catch-up runs are serialised, so concurrent readers never hand the same
/// event to a projection twice.
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    projections: Vec<Box<dyn Projection>>,
    catch_up: Mutex<()>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
            catch_up: Mutex::new(()),
        }
    }

    /// Registers a projection with this processor.
    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Delivers to each projection the events past its current position.
    ///
    /// Only the tail of the log after the slowest projection is read, so a
    /// catch-up with nothing new costs one empty query.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<()> {
        let _guard = self.catch_up.lock().await;
        self.catch_up_locked().await
    }

    async fn catch_up_locked(&self) -> Result<()> {
        let mut from: Option<u64> = None;
        for projection in &self.projections {
            let processed = projection.position().await.events_processed;
            from = Some(from.map_or(processed, |f| f.min(processed)));
        }
        let Some(from) = from else {
            return Ok(());
        };

        let mut stream = self.store.stream_events_from(from).await?;
        let mut event_index = from;
        let mut applied: u64 = 0;

        while let Some(result) = stream.next().await {
            let event = result?;
            event_index += 1;

            for projection in &self.projections {
                if projection.position().await.has_not_seen(event_index) {
                    projection.handle(&event).await?;
                    applied += 1;
                    metrics::counter!("projections_events_processed").increment(1);
                }
            }
        }

        if applied > 0 {
            tracing::debug!(from, to = event_index, applied, "catch-up complete");
        }

        Ok(())
    }

    /// Resets all projections and replays all events from the store.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<()> {
        let _guard = self.catch_up.lock().await;
        for projection in &self.projections {
            projection.reset().await?;
        }
        self.catch_up_locked().await
    }
}
