//! Tests for read-model projections

use serde_json::{json, Value};
use std::sync::Arc;
use strata::prelude::*;

fn events(count: usize) -> Vec<RecordedEvent> {
    (0..count)
        .map(|i| RecordedEvent::new("UserCreated", json!({ "n": i })))
        .collect()
}

fn seeded_manager(count: usize) -> InMemoryProjectionManager<InMemoryEventStore> {
    let store = Arc::new(InMemoryEventStore::new());
    store
        .create(Stream::new(StreamName::from("user-1")).with_events(events(count)))
        .unwrap();
    InMemoryProjectionManager::new(store)
}

/// Read model that records its lifecycle instead of storing data.
struct CountingReadModel {
    initialized: bool,
    persists: usize,
    resets: usize,
    deletes: usize,
}

impl CountingReadModel {
    fn new() -> Self {
        Self {
            initialized: false,
            persists: 0,
            resets: 0,
            deletes: 0,
        }
    }
}

impl ReadModel for CountingReadModel {
    fn init(&mut self) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn reset(&mut self) -> Result<()> {
        self.resets += 1;
        Ok(())
    }

    fn delete(&mut self) -> Result<()> {
        self.deletes += 1;
        self.initialized = false;
        Ok(())
    }

    fn stack(&mut self, _operation: &str, _args: Vec<Value>) {}

    fn persist(&mut self) -> Result<()> {
        self.persists += 1;
        Ok(())
    }
}

#[test]
fn staged_writes_reach_the_read_model_after_a_run() {
    let manager = seeded_manager(3);

    let mut projection = manager
        .create_read_model_projection(
            "users",
            InMemoryReadModel::new(),
            ReadModelProjectionConfig::default(),
        )
        .unwrap()
        .from_stream(StreamName::from("user-1"))
        .unwrap()
        .when_any(Box::new(
            |_state: &Value, event: &RecordedEvent, ctx: &mut ReadModelContext| {
                ctx.read_model().stack(
                    "insert",
                    vec![json!(format!("user-1:{}", event.number)), event.payload.clone()],
                );
                Ok(None)
            },
        ))
        .unwrap();

    projection.run(false).unwrap();

    let read_model = projection.read_model();
    assert!(read_model.is_initialized());
    assert_eq!(read_model.storage().len(), 3);
    assert_eq!(read_model.get("user-1:2"), Some(&json!({ "n": 1 })));
}

#[test]
fn pending_writes_flush_per_persist_block_and_at_tick_end() {
    let manager = seeded_manager(5);

    let mut projection = manager
        .create_read_model_projection(
            "counting",
            CountingReadModel::new(),
            ReadModelProjectionConfig::default().with_persist_block_size(2),
        )
        .unwrap()
        .from_stream(StreamName::from("user-1"))
        .unwrap()
        .when_any(Box::new(
            |_state: &Value, _event: &RecordedEvent, _ctx: &mut ReadModelContext| Ok(None),
        ))
        .unwrap();

    projection.run(false).unwrap();

    // Two block flushes mid-stream (after events 2 and 4) plus the
    // unconditional end-of-tick flush.
    assert_eq!(projection.read_model().persists, 3);
}

#[test]
fn read_model_is_initialized_lazily_on_first_run() {
    let manager = seeded_manager(1);

    let mut projection = manager
        .create_read_model_projection(
            "lazy_init",
            CountingReadModel::new(),
            ReadModelProjectionConfig::default(),
        )
        .unwrap()
        .from_stream(StreamName::from("user-1"))
        .unwrap()
        .when_any(Box::new(
            |_state: &Value, _event: &RecordedEvent, _ctx: &mut ReadModelContext| Ok(None),
        ))
        .unwrap();

    assert!(!projection.read_model().is_initialized());
    projection.run(false).unwrap();
    assert!(projection.read_model().is_initialized());
}

#[test]
fn state_fold_works_alongside_the_read_model() {
    let manager = seeded_manager(4);

    let mut projection = manager
        .create_read_model_projection(
            "folding",
            InMemoryReadModel::new(),
            ReadModelProjectionConfig::default(),
        )
        .unwrap()
        .init(Box::new(|| json!({ "count": 0 })))
        .unwrap()
        .from_stream(StreamName::from("user-1"))
        .unwrap()
        .when_any(Box::new(
            |state: &Value, _event: &RecordedEvent, _ctx: &mut ReadModelContext| {
                let count = state["count"].as_u64().unwrap_or(0);
                Ok(Some(json!({ "count": count + 1 })))
            },
        ))
        .unwrap();

    projection.run(false).unwrap();
    assert_eq!(projection.state()["count"], 4);
    assert_eq!(
        projection.stream_positions().get(&StreamName::from("user-1")),
        Some(&4)
    );
}

#[test]
fn reset_clears_read_model_cursors_and_state() {
    let manager = seeded_manager(3);

    let mut projection = manager
        .create_read_model_projection(
            "resettable",
            CountingReadModel::new(),
            ReadModelProjectionConfig::default(),
        )
        .unwrap()
        .init(Box::new(|| json!({ "count": 0 })))
        .unwrap()
        .from_stream(StreamName::from("user-1"))
        .unwrap()
        .when_any(Box::new(
            |state: &Value, _event: &RecordedEvent, _ctx: &mut ReadModelContext| {
                let count = state["count"].as_u64().unwrap_or(0);
                Ok(Some(json!({ "count": count + 1 })))
            },
        ))
        .unwrap();

    projection.run(false).unwrap();
    assert_eq!(projection.state()["count"], 3);

    projection.reset().unwrap();
    assert_eq!(projection.read_model().resets, 1);
    assert!(projection.stream_positions().is_empty());
    assert_eq!(projection.state(), json!({ "count": 0 }));

    projection.run(false).unwrap();
    assert_eq!(projection.state()["count"], 3);
}

#[test]
fn delete_tears_down_the_read_model_and_blocks_reruns() {
    let manager = seeded_manager(2);

    let mut projection = manager
        .create_read_model_projection(
            "deletable",
            CountingReadModel::new(),
            ReadModelProjectionConfig::default(),
        )
        .unwrap()
        .from_stream(StreamName::from("user-1"))
        .unwrap()
        .when_any(Box::new(
            |_state: &Value, _event: &RecordedEvent, _ctx: &mut ReadModelContext| Ok(None),
        ))
        .unwrap();

    projection.run(false).unwrap();
    projection.delete(true).unwrap();

    assert_eq!(projection.read_model().deletes, 1);
    assert!(projection.stream_positions().is_empty());

    let err = projection.run(false).unwrap_err();
    assert!(matches!(err, StrataError::RuntimeMisuse(_)));
}

#[test]
fn manager_posted_delete_is_observed_before_the_next_tick() {
    let manager = seeded_manager(2);

    let mut projection = manager
        .create_read_model_projection(
            "remote_delete",
            CountingReadModel::new(),
            ReadModelProjectionConfig::default(),
        )
        .unwrap()
        .from_stream(StreamName::from("user-1"))
        .unwrap()
        .when_any(Box::new(
            |_state: &Value, _event: &RecordedEvent, _ctx: &mut ReadModelContext| Ok(None),
        ))
        .unwrap();

    projection.run(false).unwrap();

    manager.delete_projection("remote_delete", true).unwrap();
    projection.run(false).unwrap();

    assert_eq!(projection.read_model().deletes, 1);
    assert!(matches!(
        manager.fetch_projection_status("remote_delete").unwrap_err(),
        StrataError::ProjectionNotFound(_)
    ));
}

#[test]
fn manager_posted_reset_reprocesses_from_scratch() {
    let manager = seeded_manager(3);

    let mut projection = manager
        .create_read_model_projection(
            "remote_reset",
            CountingReadModel::new(),
            ReadModelProjectionConfig::default(),
        )
        .unwrap()
        .init(Box::new(|| json!({ "count": 0 })))
        .unwrap()
        .from_stream(StreamName::from("user-1"))
        .unwrap()
        .when_any(Box::new(
            |state: &Value, _event: &RecordedEvent, _ctx: &mut ReadModelContext| {
                let count = state["count"].as_u64().unwrap_or(0);
                Ok(Some(json!({ "count": count + 1 })))
            },
        ))
        .unwrap();

    projection.run(false).unwrap();
    assert_eq!(projection.state()["count"], 3);

    manager.reset_projection("remote_reset").unwrap();
    projection.run(false).unwrap();

    assert_eq!(projection.read_model().resets, 1);
    // The same three events were replayed after the reset
    assert_eq!(projection.state()["count"], 3);
}
