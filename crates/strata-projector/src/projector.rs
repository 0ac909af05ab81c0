use crate::cache::RollingCache;
use crate::context::{EmitSink, ProjectorContext};
use crate::handle::{ProjectionCommand, ProjectionHandle, RunGuard};
use crate::source::{prepare_positions, SourceQuery};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use strata_core::observe;
use strata_core::types::{ProjectionStatus, RecordedEvent, Stream, StreamName};
use strata_core::{EventIter, EventStore, ProjectionConfig, Result, StrataError};

/// Produces the initial accumulated state. A returned JSON object
/// becomes the state; anything else leaves it at `Null`.
pub type InitCallback = Box<dyn Fn() -> Value + Send>;

/// Event handler: receives the current state, the event and a context
/// with stop/emit/link_to callbacks. Returning `Ok(Some(object))`
/// replaces the state; any other return leaves it unchanged.
pub type ProjectionHandler = Box<
    dyn FnMut(&Value, &RecordedEvent, &mut ProjectorContext<'_>) -> Result<Option<Value>> + Send,
>;

/// Named, resumable projection over one or more streams.
///
/// Configuration is settable exactly once each: `init`, one of the
/// `from_*` selections, and `when` XOR `when_any`. A second call fails
/// with `RuntimeMisuse`, as does `run` without a selection or
/// handlers.
///
/// The run loop processes one tick per pass: resolve target streams,
/// load each from its cursor, advance the cursor by exactly 1 per
/// consumed event (before invoking the handler, so a failure never
/// re-delivers the same event), and fold handler results into state.
/// With `keep_running`, empty ticks sleep `sleep_ms` before polling
/// again; manager commands (stop/reset/delete) are observed at the
/// start of every tick.
pub struct Projector<S: EventStore> {
    store: Arc<S>,
    name: String,
    config: ProjectionConfig,
    handle: Arc<ProjectionHandle>,
    source: Option<SourceQuery>,
    init_callback: Option<InitCallback>,
    handler: Option<ProjectionHandler>,
    handlers: HashMap<String, ProjectionHandler>,
    stream_cache: RollingCache,
    stream_created: bool,
    is_stopped: bool,
}

impl<S: EventStore> std::fmt::Debug for Projector<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Projector")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<S: EventStore> Projector<S> {
    pub(crate) fn new(
        store: Arc<S>,
        name: String,
        config: ProjectionConfig,
        handle: Arc<ProjectionHandle>,
    ) -> Self {
        let stream_cache = RollingCache::new(config.cache_size);
        Self {
            store,
            name,
            config,
            handle,
            source: None,
            init_callback: None,
            handler: None,
            handlers: HashMap::new(),
            stream_cache,
            stream_created: false,
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

    /// Register per-event-type handlers. Mutually exclusive with
    /// [`when_any`](Self::when_any); callable exactly once.
    pub fn when(mut self, handlers: HashMap<String, ProjectionHandler>) -> Result<Self> {
        if self.handler.is_some() || !self.handlers.is_empty() {
            return Err(StrataError::RuntimeMisuse("When was already called".into()));
        }
        self.handlers = handlers;
        Ok(self)
    }

    /// Register a single handler invoked for every event type.
    pub fn when_any(mut self, handler: ProjectionHandler) -> Result<Self> {
        if self.handler.is_some() || !self.handlers.is_empty() {
            return Err(StrataError::RuntimeMisuse("When was already called".into()));
        }
        self.handler = Some(handler);
        Ok(self)
    }

    /// Halt the run loop after the current event.
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

    /// Clear all cursors, delete the projection's emitted stream and
    /// restore the init-callback state.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_configured()?;
        self.do_reset()
    }

    /// Clear all cursors, optionally delete the emitted stream, and
    /// mark the projection unrunnable until recreated.
    pub fn delete(&mut self, delete_emitted_events: bool) -> Result<()> {
        self.do_delete(delete_emitted_events)
    }

    /// Run the projection. With `keep_running` the loop ticks until
    /// stopped, sleeping between empty ticks; otherwise exactly one
    /// tick executes.
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
            let event_counter = self.tick()?;
            observe::record_tick(event_counter, tick_start.elapsed());
            if event_counter > 0 {
                tracing::debug!(
                    projection = %self.name,
                    events = event_counter,
                    elapsed = ?tick_start.elapsed(),
                    "tick complete"
                );
            }

            if !keep_running || self.is_stopped {
                break;
            }
            if event_counter == 0 {
                thread::sleep(Duration::from_millis(self.config.sleep_ms));
            }
        }

        Ok(())
    }

    /// One pass over all target streams. Returns consumed event count.
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
        let mut event_counter = 0;

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
                // Vanished mid-tick: no events this tick, not an error
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err),
            };

            event_counter += self.handle_stream(&stream_name, events)?;

            if self.is_stopped {
                break;
            }
        }

        Ok(event_counter)
    }

    fn handle_stream(&mut self, stream_name: &StreamName, events: EventIter) -> Result<usize> {
        let single_handler = self.handler.is_some();
        let mut consumed = 0;

        for event in events {
            // Cursor advances before the handler runs: a failure or
            // stop never re-delivers the same event.
            {
                let mut positions = self.handle.positions.lock();
                *positions.entry(stream_name.clone()).or_insert(0) += 1;
            }
            consumed += 1;

            let handler = if single_handler {
                self.handler.as_mut()
            } else {
                self.handlers.get_mut(&event.event_type)
            };
            let Some(handler) = handler else {
                continue;
            };

            let current = self.handle.state.lock().clone();
            let mut sink = StoreSink {
                store: self.store.as_ref(),
                projection_name: &self.name,
                cache: &mut self.stream_cache,
                stream_created: &mut self.stream_created,
            };
            let mut context = ProjectorContext {
                stream_name,
                stopped: &mut self.is_stopped,
                sink: &mut sink,
            };

            if let Some(new_state) = handler(&current, &event, &mut context)? {
                if new_state.is_object() {
                    *self.handle.state.lock() = new_state;
                }
            }

            if self.is_stopped {
                break;
            }
        }

        Ok(consumed)
    }

    fn do_reset(&mut self) -> Result<()> {
        self.handle.positions.lock().clear();

        let own_stream = StreamName::from(self.name.as_str());
        match self.store.delete(&own_stream) {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }

        *self.handle.state.lock() = self.initial_state();
        tracing::debug!(projection = %self.name, "projection reset");
        Ok(())
    }

    fn do_delete(&mut self, delete_emitted_events: bool) -> Result<()> {
        self.handle.positions.lock().clear();

        if delete_emitted_events {
            let own_stream = StreamName::from(self.name.as_str());
            match self.store.delete(&own_stream) {
                Ok(()) => {}
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }
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

/// Emit/link sink writing through the store, with a rolling cache to
/// avoid repeated existence checks for hot streams.
struct StoreSink<'a, S: EventStore> {
    store: &'a S,
    projection_name: &'a str,
    cache: &'a mut RollingCache,
    stream_created: &'a mut bool,
}

impl<S: EventStore> EmitSink for StoreSink<'_, S> {
    fn emit(&mut self, event: RecordedEvent) -> Result<()> {
        let own_stream = StreamName::from(self.projection_name);
        if !*self.stream_created && !self.store.has_stream(&own_stream) {
            self.store.create(Stream::new(own_stream.clone()))?;
        }
        *self.stream_created = true;
        self.link_to(&own_stream, event)
    }

    fn link_to(&mut self, stream_name: &StreamName, event: RecordedEvent) -> Result<()> {
        let append = if self.cache.has(stream_name.as_str()) {
            true
        } else {
            self.cache.rolling_append(stream_name.as_str());
            self.store.has_stream(stream_name)
        };

        if append {
            self.store.append_to(stream_name, vec![event])
        } else {
            self.store
                .create(Stream::new(stream_name.clone()).with_events(vec![event]))
        }
    }
}
