//! Handler context objects.
//!
//! Handlers receive an explicit context argument carrying the current
//! stream name plus the callbacks they may use (stop, emit, link_to,
//! read-model access depending on the runner variant). No state is
//! shared with the runner through captured variables.

use strata_core::types::{RecordedEvent, StreamName};
use strata_core::{ReadModel, Result};

/// Sink for events a projection handler emits back into the store.
pub(crate) trait EmitSink {
    fn emit(&mut self, event: RecordedEvent) -> Result<()>;
    fn link_to(&mut self, stream_name: &StreamName, event: RecordedEvent) -> Result<()>;
}

/// Context passed to [`Projector`](crate::Projector) handlers.
pub struct ProjectorContext<'a> {
    pub(crate) stream_name: &'a StreamName,
    pub(crate) stopped: &'a mut bool,
    pub(crate) sink: &'a mut dyn EmitSink,
}

impl ProjectorContext<'_> {
    /// Name of the stream the current event came from.
    pub fn stream_name(&self) -> &StreamName {
        self.stream_name
    }

    /// Halt the run after the current event.
    pub fn stop(&mut self) {
        *self.stopped = true;
    }

    /// Append an event to the projection's own stream (created on
    /// first use).
    pub fn emit(&mut self, event: RecordedEvent) -> Result<()> {
        self.sink.emit(event)
    }

    /// Append an event to an arbitrary stream, creating it if needed.
    pub fn link_to(&mut self, stream_name: &StreamName, event: RecordedEvent) -> Result<()> {
        self.sink.link_to(stream_name, event)
    }
}

/// Context passed to [`Query`](crate::Query) handlers: queries fold
/// state only, so there is no emit channel.
pub struct QueryContext<'a> {
    pub(crate) stream_name: &'a StreamName,
    pub(crate) stopped: &'a mut bool,
}

impl QueryContext<'_> {
    pub fn stream_name(&self) -> &StreamName {
        self.stream_name
    }

    pub fn stop(&mut self) {
        *self.stopped = true;
    }
}

/// Context passed to [`ReadModelProjector`](crate::ReadModelProjector)
/// handlers, exposing the read model for staging writes.
pub struct ReadModelContext<'a> {
    pub(crate) stream_name: &'a StreamName,
    pub(crate) stopped: &'a mut bool,
    pub(crate) read_model: &'a mut dyn ReadModel,
}

impl ReadModelContext<'_> {
    pub fn stream_name(&self) -> &StreamName {
        self.stream_name
    }

    pub fn stop(&mut self) {
        *self.stopped = true;
    }

    pub fn read_model(&mut self) -> &mut dyn ReadModel {
        self.read_model
    }
}
