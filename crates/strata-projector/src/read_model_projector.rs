use crate::context::ReadModelContext;
use crate::handle::{ProjectionCommand, ProjectionHandle, RunGuard};
use crate::source::{prepare_positions, SourceQuery};
use crate::InitCallback;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use strata_core::observe;
use strata_core::types::{ProjectionStatus, RecordedEvent, StreamName};
use strata_core::{
    EventIter, EventStore, ReadModel, ReadModelProjectionConfig, Result, StrataError,
};

/// Event handler for read-model projections. Stages writes through
/// the context's read model; `Ok(Some(object))` replaces the state.
pub type ReadModelHandler = Box<
    dyn FnMut(&Value, &RecordedEvent, &mut ReadModelContext<'_>) -> Result<Option<Value>> + Send,
>;

/// Projection that materializes into an external [`ReadModel`].
///
/// Same loop and configuration discipline as
/// [`Projector`](crate::Projector), with two differences: the read
/// model is initialized on the first run if needed, and staged writes
/// are flushed every `persist_block_size` consumed events plus once at
/// the end of every tick. There is no emit/link_to channel; the read
/// model is the only output.
pub struct ReadModelProjector<S: EventStore, R: ReadModel> {
    store: Arc<S>,
    name: String,
    config: ReadModelProjectionConfig,
    handle: Arc<ProjectionHandle>,
    read_model: R,
    source: Option<SourceQuery>,
    init_callback: Option<InitCallback>,
    handler: Option<ReadModelHandler>,
    handlers: HashMap<String, ReadModelHandler>,
    event_counter: usize,
    is_stopped: bool,
}

impl<S: EventStore, R: ReadModel> ReadModelProjector<S, R> {
    pub(crate) fn new(
        store: Arc<S>,
        name: String,
        read_model: R,
        config: ReadModelProjectionConfig,
        handle: Arc<ProjectionHandle>,
    ) -> Self {
        Self {
            store,
            name,
            config,
            handle,
            read_model,
            source: None,
            init_callback: None,
            handler: None,
            handlers: HashMap::new(),
            event_counter: 0,
            is_stopped: false,
        }
    }

    /// Set the initial-state callback. Callable exactly once.
    pub fn init(mut self, callback: InitCallback) -> Result<Self> {
        if self.init_callback.is_some() {
            return Err(StrataError::RuntimeMisuse(
                "Projection already initialized".into(),
            ));
        }
        let initial = callback();
        if initial.is_object() {
            *self.handle.state.lock() = initial;
        }
        self.init_callback = Some(callback);
        Ok(self)
    }

    pub fn from_stream(self, stream_name: StreamName) -> Result<Self> {
        self.set_source(SourceQuery::Streams(vec![stream_name]))
    }

    pub fn from_streams(self, stream_names: Vec<StreamName>) -> Result<Self> {
        self.set_source(SourceQuery::Streams(stream_names))
    }

    pub fn from_category(self, name: impl Into<String>) -> Result<Self> {
        self.set_source(SourceQuery::Categories(vec![name.into()]))
    }

    pub fn from_categories(self, names: Vec<String>) -> Result<Self> {
        self.set_source(SourceQuery::Categories(names))
    }

    pub fn from_all(self) -> Result<Self> {
        self.set_source(SourceQuery::All)
    }

    fn set_source(mut self, source: SourceQuery) -> Result<Self> {
        if self.source.is_some() {
            return Err(StrataError::RuntimeMisuse("From was already called".into()));
        }
        self.source = Some(source);
        Ok(self)
    }

    pub fn when(mut self, handlers: HashMap<String, ReadModelHandler>) -> Result<Self> {
        if self.handler.is_some() || !self.handlers.is_empty() {
            return Err(StrataError::RuntimeMisuse("When was already called".into()));
        }
        self.handlers = handlers;
        Ok(self)
    }

    pub fn when_any(mut self, handler: ReadModelHandler) -> Result<Self> {
        if self.handler.is_some() || !self.handlers.is_empty() {
            return Err(StrataError::RuntimeMisuse("When was already called".into()));
        }
        self.handler = Some(handler);
        Ok(self)
    }

    pub fn stop(&mut self) {
        self.is_stopped = true;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> ProjectionStatus {
        self.handle.status()
    }

    pub fn state(&self) -> Value {
        self.handle.state()
    }

    pub fn stream_positions(&self) -> std::collections::BTreeMap<StreamName, u64> {
        self.handle.stream_positions()
    }

    pub fn read_model(&self) -> &R {
        &self.read_model
    }

    pub fn read_model_mut(&mut self) -> &mut R {
        &mut self.read_model
    }

    /// Clear all cursors, reset the read model and restore the
    /// init-callback state.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_configured()?;
        self.do_reset()
    }

    /// Clear all cursors, optionally delete the read model, and mark
    /// the projection unrunnable until recreated.
    pub fn delete(&mut self, delete_read_model: bool) -> Result<()> {
        self.do_delete(delete_read_model)
    }

    pub fn run(&mut self, keep_running: bool) -> Result<()> {
        self.ensure_configured()?;
        if self.handle.is_deleted() {
            return Err(StrataError::RuntimeMisuse(format!(
                "projection '{}' was deleted",
                self.name
            )));
        }

        let _guard = RunGuard::acquire(&self.handle)?;
        self.is_stopped = false;

        if !self.read_model.is_initialized() {
            self.read_model.init()?;
        }

        loop {
            match self.handle.take_command() {
                Some(ProjectionCommand::Stop) => break,
                Some(ProjectionCommand::Reset) => {
                    self.do_reset()?;
                    self.handle.set_status(ProjectionStatus::Running);
                }
                Some(ProjectionCommand::Delete {
                    delete_emitted_events,
                }) => {
                    self.do_delete(delete_emitted_events)?;
                    break;
                }
                None => {}
            }

            let tick_start = Instant::now();
            let tick_events = self.tick()?;
            self.read_model.persist()?;
            self.event_counter = 0;

            observe::record_tick(tick_events, tick_start.elapsed());
            if tick_events > 0 {
                tracing::debug!(
                    projection = %self.name,
                    events = tick_events,
                    elapsed = ?tick_start.elapsed(),
                    "tick complete"
                );
            }

            if !keep_running || self.is_stopped {
                break;
            }
            if tick_events == 0 {
                thread::sleep(Duration::from_millis(self.config.sleep_ms));
            }
        }

        Ok(())
    }

    fn tick(&mut self) -> Result<usize> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| StrataError::RuntimeMisuse("No handlers configured".into()))?;
        {
            let mut positions = self.handle.positions.lock();
            prepare_positions(source, self.store.as_ref(), &mut positions)?;
        }

        let stream_names: Vec<StreamName> = self.handle.positions.lock().keys().cloned().collect();
        let mut tick_events = 0;

        for stream_name in stream_names {
            let position = self
                .handle
                .positions
                .lock()
                .get(&stream_name)
                .copied()
                .unwrap_or(0);

            let events = match self.store.load(&stream_name, position + 1, None, None) {
                Ok(events) => events,
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err),
            };

            tick_events += self.handle_stream(&stream_name, events)?;

            if self.is_stopped {
                break;
            }
        }

        Ok(tick_events)
    }

    fn handle_stream(&mut self, stream_name: &StreamName, events: EventIter) -> Result<usize> {
        let single_handler = self.handler.is_some();
        let mut consumed = 0;

        for event in events {
            {
                let mut positions = self.handle.positions.lock();
                *positions.entry(stream_name.clone()).or_insert(0) += 1;
            }
            consumed += 1;
            self.event_counter += 1;

            let handler = if single_handler {
                self.handler.as_mut()
            } else {
                self.handlers.get_mut(&event.event_type)
            };

            if let Some(handler) = handler {
                let current = self.handle.state.lock().clone();
                let mut context = ReadModelContext {
                    stream_name,
                    stopped: &mut self.is_stopped,
                    read_model: &mut self.read_model,
                };

                if let Some(new_state) = handler(&current, &event, &mut context)? {
                    if new_state.is_object() {
                        *self.handle.state.lock() = new_state;
                    }
                }
            }

            if self.event_counter == self.config.persist_block_size {
                self.read_model.persist()?;
                self.event_counter = 0;
            }

            if self.is_stopped {
                break;
            }
        }

        Ok(consumed)
    }

    fn do_reset(&mut self) -> Result<()> {
        self.handle.positions.lock().clear();
        self.read_model.reset()?;
        *self.handle.state.lock() = self.initial_state();
        tracing::debug!(projection = %self.name, "projection reset");
        Ok(())
    }

    fn do_delete(&mut self, delete_read_model: bool) -> Result<()> {
        self.handle.positions.lock().clear();
        if delete_read_model {
            self.read_model.delete()?;
        }
        self.handle.mark_deleted();
        tracing::debug!(projection = %self.name, "projection deleted");
        Ok(())
    }

    fn initial_state(&self) -> Value {
        match &self.init_callback {
            Some(callback) => {
                let initial = callback();
                if initial.is_object() {
                    initial
                } else {
                    Value::Null
                }
            }
            None => Value::Null,
        }
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.source.is_none() || (self.handler.is_none() && self.handlers.is_empty()) {
            return Err(StrataError::RuntimeMisuse("No handlers configured".into()));
        }
        Ok(())
    }
}
