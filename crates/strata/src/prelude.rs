//! Strata Prelude
//!
//! Import this to get all commonly used types and traits:
//!
//! ```
//! use strata::prelude::*;
//! ```

// Core types
pub use crate::{
    ProjectionStatus, RecordedEvent, Result, StrataError, Stream, StreamName,
};

// Configs
pub use crate::{ProjectionConfig, ReadModelProjectionConfig};

// Traits
pub use crate::{EventStore, ReadModel};

// Metadata matching
pub use crate::{FieldType, MetadataMatcher, Operator};

// Implementations
pub use crate::{
    InMemoryEventStore, InMemoryProjectionManager, InMemoryReadModel, Projector, Query,
    ReadModelProjector,
};

// Handler plumbing
pub use crate::{
    ProjectionHandler, ProjectorContext, QueryContext, QueryHandler, ReadModelContext,
    ReadModelHandler,
};

// Re-export common external deps
pub use serde::{Deserialize, Serialize};
