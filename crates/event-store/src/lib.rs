//! Append-only event store.
//!
//! Every write in the order service is an event appended to a per-aggregate
//! stream with optimistic version checks. Two backends are provided:
//! [`InMemoryEventStore`] for tests and local runs, and
//! [`PostgresEventStore`] for durable deployments.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use store::{AppendOptions, EventStore, EventStoreExt, EventStream};
