use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// An immutable domain event.
///
/// Events are created unrecorded (`number == 0`) and receive their
/// version when the store accepts them: within one stream, versions are
/// strictly increasing by 1 starting at 1, with no gaps and no
/// duplicates. Events are never mutated after append; every transform
/// returns a copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Unique event identity.
    pub event_id: Uuid,

    /// Type name used for handler dispatch.
    pub event_type: String,

    /// Opaque structured payload.
    pub payload: Value,

    /// Scalar metadata attached to this event.
    pub metadata: Map<String, Value>,

    /// Creation timestamp (assigned at construction, not at append).
    pub created_at: DateTime<Utc>,

    /// Position within the origin stream. 0 means "not yet recorded";
    /// the store assigns 1-based versions at create/append time.
    pub number: u64,
}

impl RecordedEvent {
    /// Create a new unrecorded event with an empty metadata map.
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            payload,
            metadata: Map::new(),
            created_at: Utc::now(),
            number: 0,
        }
    }

    /// Replace the full metadata map.
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Return a copy of this event with one extra metadata entry.
    ///
    /// This is the transform used by read-time enrichment (upcasting
    /// and the like); the original event is untouched.
    pub fn with_added_metadata(&self, key: impl Into<String>, value: Value) -> Self {
        let mut copy = self.clone();
        copy.metadata.insert(key.into(), value);
        copy
    }

    /// Look up a metadata field.
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Expose a structural message property for matcher evaluation.
    ///
    /// Known properties: `event_id`, `event_type` (alias
    /// `message_name`), `created_at` (RFC 3339), `number`.
    pub fn property(&self, name: &str) -> Option<Value> {
        match name {
            "event_id" => Some(Value::String(self.event_id.to_string())),
            "event_type" | "message_name" => Some(Value::String(self.event_type.clone())),
            "created_at" => Some(Value::String(self.created_at.to_rfc3339())),
            "number" => Some(Value::from(self.number)),
            _ => None,
        }
    }
}
