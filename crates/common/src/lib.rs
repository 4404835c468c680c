//! Shared types used across the marketplace order crates.

mod types;

pub use types::AggregateId;
