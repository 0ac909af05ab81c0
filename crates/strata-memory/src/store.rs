use parking_lot::RwLock;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use strata_core::metadata::MetadataMatcher;
use strata_core::observe;
use strata_core::traits::{EventIter, EventStore};
use strata_core::types::{RecordedEvent, Stream, StreamName};
use strata_core::{Result, StrataError};

struct StoredStream {
    metadata: Map<String, Value>,
    events: Vec<RecordedEvent>,
}

/// In-memory storage engine.
///
/// A `BTreeMap` keyed by stream name behind a `parking_lot::RwLock`:
/// one writer at a time, any number of concurrent readers. Sorted keys
/// make every listing deterministic.
#[derive(Default)]
pub struct InMemoryEventStore {
    streams: RwLock<BTreeMap<StreamName, StoredStream>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for InMemoryEventStore {
    fn create(&self, stream: Stream) -> Result<()> {
        let mut streams = self.streams.write();

        if streams.contains_key(&stream.name) {
            return Err(StrataError::StreamExistsAlready(stream.name));
        }

        let mut events = stream.events;
        for (index, event) in events.iter_mut().enumerate() {
            event.number = index as u64 + 1;
        }

        let count = events.len();
        tracing::debug!(stream = %stream.name, events = count, "stream created");
        observe::record_append(count);

        streams.insert(
            stream.name,
            StoredStream {
                metadata: stream.metadata,
                events,
            },
        );
        Ok(())
    }

    fn append_to(&self, stream_name: &StreamName, events: Vec<RecordedEvent>) -> Result<()> {
        let mut streams = self.streams.write();

        let stored = streams
            .get_mut(stream_name)
            .ok_or_else(|| StrataError::StreamNotFound(stream_name.clone()))?;

        // Numbers are gapless, so the current length is the highest
        // version. All events get their number before any is visible;
        // the write lock makes the batch all-or-nothing.
        let mut next = stored.events.len() as u64 + 1;
        let count = events.len();
        for mut event in events {
            event.number = next;
            next += 1;
            stored.events.push(event);
        }

        debug_assert!(stored
            .events
            .last()
            .is_none_or(|event| event.number == stored.events.len() as u64));

        tracing::debug!(stream = %stream_name, events = count, "events appended");
        observe::record_append(count);
        Ok(())
    }

    fn load(
        &self,
        stream_name: &StreamName,
        from_number: u64,
        count: Option<usize>,
        matcher: Option<&MetadataMatcher>,
    ) -> Result<EventIter> {
        let start = Instant::now();
        let from_number = from_number.max(1);
        let streams = self.streams.read();

        let stored = streams
            .get(stream_name)
            .ok_or_else(|| StrataError::StreamNotFound(stream_name.clone()))?;

        let selected: Vec<RecordedEvent> = stored
            .events
            .iter()
            .filter(|event| event.number >= from_number)
            .filter(|event| matcher.is_none_or(|m| m.matches(event)))
            .take(count.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        observe::record_load(start.elapsed());
        Ok(Box::new(selected.into_iter()))
    }

    fn load_reverse(
        &self,
        stream_name: &StreamName,
        from_number: Option<u64>,
        count: Option<usize>,
        matcher: Option<&MetadataMatcher>,
    ) -> Result<EventIter> {
        let start = Instant::now();
        let streams = self.streams.read();

        let stored = streams
            .get(stream_name)
            .ok_or_else(|| StrataError::StreamNotFound(stream_name.clone()))?;

        let from_number = from_number.unwrap_or(stored.events.len() as u64);

        let selected: Vec<RecordedEvent> = stored
            .events
            .iter()
            .rev()
            .filter(|event| event.number <= from_number)
            .filter(|event| matcher.is_none_or(|m| m.matches(event)))
            .take(count.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        observe::record_load(start.elapsed());
        Ok(Box::new(selected.into_iter()))
    }

    fn delete(&self, stream_name: &StreamName) -> Result<()> {
        let mut streams = self.streams.write();

        if streams.remove(stream_name).is_none() {
            return Err(StrataError::StreamNotFound(stream_name.clone()));
        }

        tracing::debug!(stream = %stream_name, "stream deleted");
        Ok(())
    }

    fn has_stream(&self, stream_name: &StreamName) -> bool {
        self.streams.read().contains_key(stream_name)
    }

    fn fetch_stream_metadata(&self, stream_name: &StreamName) -> Result<Map<String, Value>> {
        let streams = self.streams.read();
        streams
            .get(stream_name)
            .map(|stored| stored.metadata.clone())
            .ok_or_else(|| StrataError::StreamNotFound(stream_name.clone()))
    }

    fn update_stream_metadata(
        &self,
        stream_name: &StreamName,
        new_metadata: Map<String, Value>,
    ) -> Result<()> {
        let mut streams = self.streams.write();
        let stored = streams
            .get_mut(stream_name)
            .ok_or_else(|| StrataError::StreamNotFound(stream_name.clone()))?;
        stored.metadata = new_metadata;
        Ok(())
    }

    fn fetch_stream_names(
        &self,
        filter: Option<&StreamName>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StreamName>> {
        validate_pagination(limit)?;
        let streams = self.streams.read();

        // Pagination applies to the filtered result either way
        match filter {
            Some(name) => Ok(streams
                .get_key_value(name)
                .map(|(name, _)| name.clone())
                .into_iter()
                .skip(offset)
                .take(limit)
                .collect()),
            None => Ok(streams
                .keys()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect()),
        }
    }

    fn fetch_stream_names_regex(
        &self,
        pattern: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StreamName>> {
        validate_pagination(limit)?;
        let regex = Regex::new(pattern)?;
        let streams = self.streams.read();

        Ok(streams
            .keys()
            .filter(|name| regex.is_match(name.as_str()))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn fetch_category_names(
        &self,
        filter: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>> {
        validate_pagination(limit)?;
        let categories = self.categories();

        match filter {
            Some(name) => Ok(categories
                .contains(name)
                .then(|| name.to_string())
                .into_iter()
                .skip(offset)
                .take(limit)
                .collect()),
            None => Ok(categories.into_iter().skip(offset).take(limit).collect()),
        }
    }

    fn fetch_category_names_regex(
        &self,
        pattern: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>> {
        validate_pagination(limit)?;
        let regex = Regex::new(pattern)?;

        Ok(self
            .categories()
            .into_iter()
            .filter(|category| regex.is_match(category))
            .skip(offset)
            .take(limit)
            .collect())
    }

    fn list_stream_names(&self) -> Result<Vec<StreamName>> {
        Ok(self.streams.read().keys().cloned().collect())
    }
}

impl InMemoryEventStore {
    fn categories(&self) -> BTreeSet<String> {
        self.streams
            .read()
            .keys()
            .filter_map(|name| name.category().map(str::to_string))
            .collect()
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
