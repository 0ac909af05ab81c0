use crate::context::QueryContext;
use crate::source::{prepare_positions, SourceQuery};
use crate::InitCallback;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use strata_core::types::{RecordedEvent, StreamName};
use strata_core::{EventStore, Result, StrataError};

/// Event handler for queries. `Ok(Some(object))` replaces the state.
pub type QueryHandler =
    Box<dyn FnMut(&Value, &RecordedEvent, &mut QueryContext<'_>) -> Result<Option<Value>> + Send>;

/// One-shot, non-persistent projection variant.
///
/// Same configuration discipline as a projection (`init` once, one
/// `from_*` selection, `when` XOR `when_any`), but `run()` executes a
/// single pass over all target streams and returns; there is no name,
/// no registry entry, no idle sleep and no emit channel. Cursors are
/// kept in memory, so calling `run()` again continues where the
/// previous pass ended.
pub struct Query<S: EventStore> {
    store: Arc<S>,
    source: Option<SourceQuery>,
    init_callback: Option<InitCallback>,
    handler: Option<QueryHandler>,
    handlers: HashMap<String, QueryHandler>,
    positions: BTreeMap<StreamName, u64>,
    state: Value,
    is_stopped: bool,
}

impl<S: EventStore> std::fmt::Debug for Query<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query").finish_non_exhaustive()
    }
}

impl<S: EventStore> Query<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            source: None,
            init_callback: None,
            handler: None,
            handlers: HashMap::new(),
            positions: BTreeMap::new(),
            state: Value::Null,
            is_stopped: false,
        }
    }

    /// Set the initial-state callback. Callable exactly once.
    pub fn init(mut self, callback: InitCallback) -> Result<Self> {
        if self.init_callback.is_some() {
            return Err(StrataError::RuntimeMisuse(
                "Query already initialized".into(),
            ));
        }
        let initial = callback();
        if initial.is_object() {
            self.state = initial;
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

    pub fn when(mut self, handlers: HashMap<String, QueryHandler>) -> Result<Self> {
        if self.handler.is_some() || !self.handlers.is_empty() {
            return Err(StrataError::RuntimeMisuse("When was already called".into()));
        }
        self.handlers = handlers;
        Ok(self)
    }

    pub fn when_any(mut self, handler: QueryHandler) -> Result<Self> {
        if self.handler.is_some() || !self.handlers.is_empty() {
            return Err(StrataError::RuntimeMisuse("When was already called".into()));
        }
        self.handler = Some(handler);
        Ok(self)
    }

    pub fn stop(&mut self) {
        self.is_stopped = true;
    }

    pub fn state(&self) -> &Value {
        &self.state
    }

    pub fn stream_positions(&self) -> &BTreeMap<StreamName, u64> {
        &self.positions
    }

    /// Clear cursors and restore the init-callback state.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_configured()?;
        self.positions.clear();
        self.state = match &self.init_callback {
            Some(callback) => {
                let initial = callback();
                if initial.is_object() {
                    initial
                } else {
                    Value::Null
                }
            }
            None => Value::Null,
        };
        Ok(())
    }

    /// Execute one pass over all target streams.
    pub fn run(&mut self) -> Result<()> {
        self.ensure_configured()?;
        self.is_stopped = false;

        let source = self
            .source
            .as_ref()
            .ok_or_else(|| StrataError::RuntimeMisuse("No handlers configured".into()))?;
        prepare_positions(source, self.store.as_ref(), &mut self.positions)?;

        let stream_names: Vec<StreamName> = self.positions.keys().cloned().collect();

        for stream_name in stream_names {
            let position = self.positions.get(&stream_name).copied().unwrap_or(0);

            let events = match self.store.load(&stream_name, position + 1, None, None) {
                Ok(events) => events,
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err),
            };

            self.handle_stream(&stream_name, events)?;

            if self.is_stopped {
                break;
            }
        }

        Ok(())
    }

    fn handle_stream(
        &mut self,
        stream_name: &StreamName,
        events: strata_core::EventIter,
    ) -> Result<()> {
        let single_handler = self.handler.is_some();

        for event in events {
            *self.positions.entry(stream_name.clone()).or_insert(0) += 1;

            let handler = if single_handler {
                self.handler.as_mut()
            } else {
                self.handlers.get_mut(&event.event_type)
            };
            let Some(handler) = handler else {
                continue;
            };

            let mut context = QueryContext {
                stream_name,
                stopped: &mut self.is_stopped,
            };

            if let Some(new_state) = handler(&self.state, &event, &mut context)? {
                if new_state.is_object() {
                    self.state = new_state;
                }
            }

            if self.is_stopped {
                break;
            }
        }

        Ok(())
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.source.is_none() || (self.handler.is_none() && self.handlers.is_empty()) {
            return Err(StrataError::RuntimeMisuse("No handlers configured".into()));
        }
        Ok(())
    }
}
