//! Strata Core: types and traits for the strata event store
//!
//! This crate defines the core abstractions for an append-only,
//! per-stream event store with an in-process projection engine:
//! - Streams: named, ordered, append-only sequences of immutable events
//! - Metadata matcher: conjunctive predicate tree for filtered reads
//! - Event store trait: create/append/load/delete with strict versioning
//! - Read model trait: staged-write projection target
//!
//! Key guarantees:
//! - Per-stream versions are gapless and strictly increasing from 1
//! - Appends are atomic from the caller's view (all-or-nothing batches)
//! - Loads are snapshots: no live mutation visibility
//! - Deterministic replay: any projection can be rebuilt from events

pub mod config;
pub mod error;
pub mod metadata;
pub mod observe;
pub mod traits;
pub mod types;

pub use config::{ProjectionConfig, ReadModelProjectionConfig};
pub use error::{Result, StrataError};
pub use metadata::{FieldType, MetadataMatcher, Operator};
pub use traits::{EventIter, EventStore, ReadModel};
pub use types::{ProjectionStatus, RecordedEvent, Stream, StreamName};
