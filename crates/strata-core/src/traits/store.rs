use crate::error::Result;
use crate::metadata::MetadataMatcher;
use crate::types::{RecordedEvent, Stream, StreamName};
use serde_json::{Map, Value};

/// Snapshot iterator over loaded events.
///
/// The sequence reflects stream state at call time; mutations made
/// after the load are not visible through it.
pub type EventIter = Box<dyn Iterator<Item = RecordedEvent> + Send>;

/// Storage engine owning all streams.
///
/// Implementations must serialize per-stream mutation while permitting
/// concurrent reads, and must keep the versioning invariant: within
/// one stream, event numbers are gapless and strictly increasing from
/// 1. Appends are atomic from the caller's view; a partially applied
/// batch is never observable.
pub trait EventStore: Send + Sync {
    /// Store a new stream with its full initial event sequence.
    ///
    /// Events are numbered 1..N in iteration order. Fails with
    /// `StreamExistsAlready` if the name is taken; the existing stream
    /// is left unmodified.
    fn create(&self, stream: Stream) -> Result<()>;

    /// Append events to an existing stream, numbering each one after
    /// the current highest version. Fails with `StreamNotFound`.
    fn append_to(&self, stream_name: &StreamName, events: Vec<RecordedEvent>) -> Result<()>;

    /// Load events with version >= `from_number` in ascending order,
    /// truncated to `count` if given and filtered by `matcher` if
    /// given. A `from_number` of 0 is treated as 1.
    fn load(
        &self,
        stream_name: &StreamName,
        from_number: u64,
        count: Option<usize>,
        matcher: Option<&MetadataMatcher>,
    ) -> Result<EventIter>;

    /// Load events with version <= `from_number` in descending order.
    /// `from_number: None` starts from the highest version present.
    fn load_reverse(
        &self,
        stream_name: &StreamName,
        from_number: Option<u64>,
        count: Option<usize>,
        matcher: Option<&MetadataMatcher>,
    ) -> Result<EventIter>;

    /// Remove a stream entirely. Destructive and non-recoverable.
    fn delete(&self, stream_name: &StreamName) -> Result<()>;

    fn has_stream(&self, stream_name: &StreamName) -> bool;

    fn fetch_stream_metadata(&self, stream_name: &StreamName) -> Result<Map<String, Value>>;

    fn update_stream_metadata(
        &self,
        stream_name: &StreamName,
        new_metadata: Map<String, Value>,
    ) -> Result<()>;

    /// Exact-name filter (`Some`) or full sorted listing (`None`),
    /// paginated. `limit` must be >= 1.
    fn fetch_stream_names(
        &self,
        filter: Option<&StreamName>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StreamName>>;

    /// Regex-filtered sorted listing, paginated. An invalid pattern
    /// fails with `InvalidRegex`.
    fn fetch_stream_names_regex(
        &self,
        pattern: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StreamName>>;

    /// Category names derived from stream names (the prefix before the
    /// first `-`), deduplicated, sorted and paginated.
    fn fetch_category_names(
        &self,
        filter: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>>;

    fn fetch_category_names_regex(
        &self,
        pattern: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>>;

    /// All stream names, sorted. Used by projection runners to resolve
    /// category/all source queries; internal `$` streams are included
    /// here and filtered by the runner.
    fn list_stream_names(&self) -> Result<Vec<StreamName>>;
}
