//! Command handling infrastructure.

use std::collections::HashMap;
use std::marker::PhantomData;

use common::AggregateId;
use event_store::{AppendOptions, EventEnvelope, EventStore, EventStoreError, Version};
use serde::{Serialize, de::DeserializeOwned};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Metadata attached to every envelope produced by one command.
pub type EventMetadata = HashMap<String, serde_json::Value>;

/// How many times a command is evaluated when its append loses a version race.
const MAX_COMMAND_ATTEMPTS: usize = 2;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<A::Event>,

    /// The new version of the aggregate after the command.
    pub new_version: Version,
}

/// Trait for commands that target a single aggregate.
pub trait Command: Send + Sync {
    type Aggregate: Aggregate;

    fn aggregate_id(&self) -> AggregateId;
}

/// Loads aggregates, runs command functions against them and persists the
/// resulting events with optimistic concurrency.
///
/// When the append fails because another writer advanced the stream first,
/// the aggregate is reloaded and the command evaluated once more against the
/// fresh state, so business rules always see the latest status.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
    A::Event: DeserializeOwned + Serialize,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads an aggregate from the event store.
    ///
    /// If the aggregate doesn't exist, returns a default instance. A stream
    /// written by another aggregate type is treated the same way, so an id
    /// of the wrong kind reads as not found.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        let events = self.store.get_events_for_aggregate(aggregate_id).await?;

        let mut aggregate = A::default();
        if events
            .first()
            .is_some_and(|e| e.aggregate_type != A::aggregate_type())
        {
            tracing::debug!(
                %aggregate_id,
                expected = A::aggregate_type(),
                "stream belongs to another aggregate type"
            );
            return Ok(aggregate);
        }

        for envelope in events {
            let event: A::Event = serde_json::from_value(envelope.payload)?;
            aggregate.apply(event);
            aggregate.set_version(envelope.version);
        }

        Ok(aggregate)
    }

    /// Loads an aggregate, returning None if it has no events.
    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(aggregate_id).await?;
        Ok(aggregate.id().is_some().then_some(aggregate))
    }

    /// Executes a command and persists the resulting events.
    pub async fn execute<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        self.execute_with_metadata(aggregate_id, EventMetadata::new(), command_fn)
            .await
    }

    /// Executes a command, stamping `metadata` on every persisted envelope.
    pub async fn execute_with_metadata<F>(
        &self,
        aggregate_id: AggregateId,
        metadata: EventMetadata,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut attempt = 1;
        loop {
            match self.try_execute(aggregate_id, &metadata, &command_fn).await {
                Err(DomainError::EventStore(EventStoreError::ConcurrencyConflict {
                    expected,
                    actual,
                    ..
                })) if attempt < MAX_COMMAND_ATTEMPTS => {
                    tracing::warn!(
                        %aggregate_id,
                        aggregate_type = A::aggregate_type(),
                        %expected,
                        %actual,
                        "version conflict, re-evaluating command"
                    );
                    metrics::counter!("command_conflict_retries_total").increment(1);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_execute<F>(
        &self,
        aggregate_id: AggregateId,
        metadata: &EventMetadata,
        command_fn: &F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut aggregate = self.load(aggregate_id).await?;
        let current_version = aggregate.version();

        let events = command_fn(&aggregate)?;

        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events: vec![],
                new_version: current_version,
            });
        }

        let envelopes = self.build_envelopes(aggregate_id, current_version, &events, metadata)?;

        let options = if current_version == Version::initial() {
            AppendOptions::expect_new()
        } else {
            AppendOptions::expect_version(current_version)
        };

        let new_version = self.store.append(envelopes, options).await?;

        for event in &events {
            aggregate.apply(event.clone());
        }
        aggregate.set_version(new_version);

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }

    fn build_envelopes(
        &self,
        aggregate_id: AggregateId,
        current_version: Version,
        events: &[A::Event],
        metadata: &EventMetadata,
    ) -> Result<Vec<EventEnvelope>, DomainError> {
        let mut envelopes = Vec::with_capacity(events.len());
        let mut version = current_version;

        for event in events {
            version = version.next();
            let envelope = EventEnvelope::builder()
                .aggregate_id(aggregate_id)
                .aggregate_type(A::aggregate_type())
                .event_type(event.event_type())
                .version(version)
                .payload(event)?
                .metadata_map(metadata.clone())
                .build()?;
            envelopes.push(envelope);
        }

        Ok(envelopes)
    }
}
