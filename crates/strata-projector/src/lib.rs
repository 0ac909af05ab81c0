//! Projection and query runners.
//!
//! A projection incrementally folds one or more streams into
//! accumulated state, tracking a per-stream cursor so interrupted runs
//! resume where they left off. Three variants share the same loop:
//! - [`Projector`]: named, registered, may emit/link events back into
//!   the store
//! - [`ReadModelProjector`]: additionally flushes staged writes to a
//!   [`ReadModel`](strata_core::ReadModel) in persist blocks
//! - [`Query`]: one-shot, unregistered fold with no side channel
//!
//! The [`InMemoryProjectionManager`] registers named projections and
//! posts stop/reset/delete commands that a runner observes at the
//! start of its next tick.

mod cache;
mod context;
mod handle;
mod manager;
mod projector;
mod query;
mod read_model;
mod read_model_projector;
mod source;

pub use cache::RollingCache;
pub use context::{ProjectorContext, QueryContext, ReadModelContext};
pub use handle::{ProjectionCommand, ProjectionHandle};
pub use manager::InMemoryProjectionManager;
pub use projector::{InitCallback, ProjectionHandler, Projector};
pub use query::{Query, QueryHandler};
pub use read_model::InMemoryReadModel;
pub use read_model_projector::{ReadModelHandler, ReadModelProjector};
