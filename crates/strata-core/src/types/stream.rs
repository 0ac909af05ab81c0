use crate::error::{Result, StrataError};
use crate::types::RecordedEvent;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Name of a stream. Non-empty, value-equal, usable as a map key.
///
/// A name's *category* is the part before its first `-` separator
/// (`user-123` belongs to category `user`). Names starting with `$`
/// are reserved for internal streams and excluded from "all streams"
/// projection queries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamName(String);

impl StreamName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(StrataError::InvalidArgument(
                "stream name must not be empty".into(),
            ));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Category prefix, if the name contains a `-` separator.
    pub fn category(&self) -> Option<&str> {
        self.0.split_once('-').map(|(category, _)| category)
    }

    /// Whether this stream is reserved for internal use.
    pub fn is_internal(&self) -> bool {
        self.0.starts_with('$')
    }
}

impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unchecked conversion for names known to be non-empty (literals,
/// category-derived names). Untrusted input goes through
/// [`StreamName::new`], which rejects the empty string.
impl From<&str> for StreamName {
    fn from(name: &str) -> Self {
        debug_assert!(!name.is_empty(), "stream name must not be empty");
        Self(name.to_string())
    }
}

/// See [`From<&str>`](#impl-From<%26str>-for-StreamName): unchecked,
/// for names known to be non-empty.
impl From<String> for StreamName {
    fn from(name: String) -> Self {
        debug_assert!(!name.is_empty(), "stream name must not be empty");
        Self(name)
    }
}

/// A named, append-only sequence of events plus stream-level metadata.
///
/// The metadata map is independent of per-event metadata and mutable
/// only through [`EventStore::update_stream_metadata`].
///
/// [`EventStore::update_stream_metadata`]: crate::traits::EventStore::update_stream_metadata
#[derive(Debug, Clone)]
pub struct Stream {
    pub name: StreamName,
    pub events: Vec<RecordedEvent>,
    pub metadata: Map<String, Value>,
}

impl Stream {
    pub fn new(name: StreamName) -> Self {
        Self {
            name,
            events: Vec::new(),
            metadata: Map::new(),
        }
    }

    pub fn with_events(mut self, events: Vec<RecordedEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}
