use crate::handle::{ProjectionCommand, ProjectionHandle};
use crate::{Projector, Query, ReadModelProjector};
use parking_lot::Mutex;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use strata_core::types::{ProjectionStatus, StreamName};
use strata_core::{
    EventStore, ProjectionConfig, ReadModel, ReadModelProjectionConfig, Result, StrataError,
};

/// Registry of named projections over one shared event store.
///
/// `create_projection` is idempotent by name: recreating a name binds
/// the new runner to the existing shared handle, so status, cursors
/// and state survive. Control requests (stop/reset/delete) are posted
/// onto the handle and observed by the runner at the start of its next
/// tick. A deleted name behaves as unknown until recreated, at which
/// point it gets a fresh handle.
pub struct InMemoryProjectionManager<S: EventStore> {
    store: Arc<S>,
    projections: Mutex<BTreeMap<String, Arc<ProjectionHandle>>>,
}

impl<S: EventStore> InMemoryProjectionManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            projections: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn create_query(&self) -> Query<S> {
        Query::new(Arc::clone(&self.store))
    }

    pub fn create_projection(
        &self,
        name: impl Into<String>,
        config: ProjectionConfig,
    ) -> Result<Projector<S>> {
        config.validate()?;
        let name = name.into();
        let handle = self.handle_for(&name);
        Ok(Projector::new(
            Arc::clone(&self.store),
            name,
            config,
            handle,
        ))
    }

    pub fn create_read_model_projection<R: ReadModel>(
        &self,
        name: impl Into<String>,
        read_model: R,
        config: ReadModelProjectionConfig,
    ) -> Result<ReadModelProjector<S, R>> {
        config.validate()?;
        let name = name.into();
        let handle = self.handle_for(&name);
        Ok(ReadModelProjector::new(
            Arc::clone(&self.store),
            name,
            read_model,
            config,
            handle,
        ))
    }

    /// Request a running projection to stop at its next tick.
    pub fn stop_projection(&self, name: &str) -> Result<()> {
        self.fetch_handle(name)?.post_command(ProjectionCommand::Stop);
        Ok(())
    }

    /// Request a projection to clear cursors and restore init state at
    /// its next tick.
    pub fn reset_projection(&self, name: &str) -> Result<()> {
        self.fetch_handle(name)?
            .post_command(ProjectionCommand::Reset);
        Ok(())
    }

    /// Request a projection to delete itself at its next tick,
    /// optionally removing its emitted stream (or read model).
    pub fn delete_projection(&self, name: &str, delete_emitted_events: bool) -> Result<()> {
        self.fetch_handle(name)?
            .post_command(ProjectionCommand::Delete {
                delete_emitted_events,
            });
        Ok(())
    }

    /// Exact-name filter (`Some`) or sorted paginated listing (`None`).
    pub fn fetch_projection_names(
        &self,
        filter: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>> {
        validate_pagination(limit)?;
        let projections = self.projections.lock();

        // Pagination applies to the filtered result either way
        match filter {
            Some(name) => Ok(projections
                .get(name)
                .filter(|handle| !handle.is_deleted())
                .map(|_| name.to_string())
                .into_iter()
                .skip(offset)
                .take(limit)
                .collect()),
            None => Ok(projections
                .iter()
                .filter(|(_, handle)| !handle.is_deleted())
                .map(|(name, _)| name.clone())
                .skip(offset)
                .take(limit)
                .collect()),
        }
    }

    /// Regex-filtered sorted paginated listing. An invalid pattern
    /// fails with `InvalidRegex`.
    pub fn fetch_projection_names_regex(
        &self,
        pattern: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>> {
        validate_pagination(limit)?;
        let regex = Regex::new(pattern)?;
        let projections = self.projections.lock();

        Ok(projections
            .iter()
            .filter(|(name, handle)| !handle.is_deleted() && regex.is_match(name))
            .map(|(name, _)| name.clone())
            .skip(offset)
            .take(limit)
            .collect())
    }

    pub fn fetch_projection_status(&self, name: &str) -> Result<ProjectionStatus> {
        Ok(self.fetch_handle(name)?.status())
    }

    pub fn fetch_projection_stream_positions(
        &self,
        name: &str,
    ) -> Result<BTreeMap<StreamName, u64>> {
        Ok(self.fetch_handle(name)?.stream_positions())
    }

    pub fn fetch_projection_state(&self, name: &str) -> Result<Value> {
        Ok(self.fetch_handle(name)?.state())
    }

    /// Reuse the live handle for `name`, or register a fresh one if
    /// the name is unknown or was deleted.
    fn handle_for(&self, name: &str) -> Arc<ProjectionHandle> {
        let mut projections = self.projections.lock();
        match projections.get(name) {
            Some(handle) if !handle.is_deleted() => Arc::clone(handle),
            _ => {
                let handle = Arc::new(ProjectionHandle::new());
                projections.insert(name.to_string(), Arc::clone(&handle));
                handle
            }
        }
    }

    fn fetch_handle(&self, name: &str) -> Result<Arc<ProjectionHandle>> {
        let projections = self.projections.lock();
        match projections.get(name) {
            Some(handle) if !handle.is_deleted() => Ok(Arc::clone(handle)),
            _ => Err(StrataError::ProjectionNotFound(name.to_string())),
        }
    }
}

fn validate_pagination(limit: usize) -> Result<()> {
    if limit < 1 {
        return Err(StrataError::OutOfRange(format!(
            "invalid limit {limit} given, must be greater than 0"
        )));
    }
    Ok(())
}
