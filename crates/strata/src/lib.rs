//! Strata: an append-only event store with an in-process projection
//! engine.
//!
//! Strata provides:
//! - **Event store**: named streams of immutable, strictly versioned
//!   events with metadata-filtered forward/reverse reads
//! - **Metadata matcher**: conjunctive constraint lists over event
//!   metadata and message properties
//! - **Projections**: resumable folds over streams into accumulated
//!   state, a read model, or both, with per-stream cursors
//! - **Projection manager**: registry with out-of-band stop, reset and
//!   delete
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use strata::prelude::*;
//! use serde_json::json;
//!
//! # fn main() -> Result<()> {
//! let store = Arc::new(InMemoryEventStore::new());
//!
//! // Append events
//! let stream = Stream::new(StreamName::new("user-1")?)
//!     .with_events(vec![RecordedEvent::new("UserCreated", json!({"name": "sasa"}))]);
//! store.create(stream)?;
//!
//! // Fold them into state
//! let manager = InMemoryProjectionManager::new(Arc::clone(&store));
//! let mut projection = manager
//!     .create_projection("users", ProjectionConfig::default())?
//!     .init(Box::new(|| json!({"count": 0})))?
//!     .from_category("user")?
//!     .when_any(Box::new(|state, _event, _ctx| {
//!         let count = state["count"].as_u64().unwrap_or(0);
//!         Ok(Some(json!({"count": count + 1})))
//!     }))?;
//! projection.run(false)?;
//!
//! assert_eq!(projection.state()["count"], 1);
//! # Ok(())
//! # }
//! ```

pub mod prelude;

// Re-export core types
pub use strata_core::{
    config::{ProjectionConfig, ReadModelProjectionConfig},
    error::{Result, StrataError},
    metadata::{FieldType, MetadataMatcher, Operator},
    traits::{EventIter, EventStore, ReadModel},
    types::{ProjectionStatus, RecordedEvent, Stream, StreamName},
};

// Re-export implementations
pub use strata_memory::InMemoryEventStore;
pub use strata_projector::{
    InMemoryProjectionManager, InMemoryReadModel, InitCallback, ProjectionCommand,
    ProjectionHandle, ProjectionHandler, Projector, ProjectorContext, Query, QueryContext,
    QueryHandler, ReadModelContext, ReadModelHandler, ReadModelProjector, RollingCache,
};
