//! Tests for the projection runner

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use strata::prelude::*;

fn events_of(event_type: &str, count: usize) -> Vec<RecordedEvent> {
    (0..count)
        .map(|i| RecordedEvent::new(event_type, json!({ "n": i })))
        .collect()
}

fn count_handler() -> ProjectionHandler {
    Box::new(
        |state: &Value, _event: &RecordedEvent, _ctx: &mut ProjectorContext| {
            let count = state["count"].as_u64().unwrap_or(0);
            Ok(Some(json!({ "count": count + 1 })))
        },
    )
}

fn counting_setup(store: &Arc<InMemoryEventStore>) -> InMemoryProjectionManager<InMemoryEventStore> {
    InMemoryProjectionManager::new(Arc::clone(store))
}

#[test]
fn resumes_from_cursor_and_dispatches_by_event_type() {
    let store = Arc::new(InMemoryEventStore::new());
    store
        .create(Stream::new(StreamName::from("user-1")).with_events(events_of("UsernameChanged", 50)))
        .unwrap();

    let manager = counting_setup(&store);
    let mut handlers: HashMap<String, ProjectionHandler> = HashMap::new();
    handlers.insert("UsernameChanged".into(), count_handler());

    let mut projection = manager
        .create_projection("username_count", ProjectionConfig::default())
        .unwrap()
        .init(Box::new(|| json!({ "count": 0 })))
        .unwrap()
        .from_stream(StreamName::from("user-1"))
        .unwrap()
        .when(handlers)
        .unwrap();

    projection.run(false).unwrap();
    assert_eq!(projection.state()["count"], 50);

    // 49 more of the handled type plus one the projection has no
    // handler for: the cursor still advances past it.
    let mut more = events_of("UsernameChanged", 49);
    more.push(RecordedEvent::new("UserDeleted", json!({})));
    store.append_to(&StreamName::from("user-1"), more).unwrap();

    projection.run(false).unwrap();
    assert_eq!(projection.state()["count"], 99);
    assert_eq!(
        projection.stream_positions().get(&StreamName::from("user-1")),
        Some(&100)
    );
}

#[test]
fn when_any_handles_every_event_type() {
    let store = Arc::new(InMemoryEventStore::new());
    let mut events = events_of("UserCreated", 2);
    events.extend(events_of("UserDeleted", 3));
    store
        .create(Stream::new(StreamName::from("user-1")).with_events(events))
        .unwrap();

    let manager = counting_setup(&store);
    let mut projection = manager
        .create_projection("all_types", ProjectionConfig::default())
        .unwrap()
        .init(Box::new(|| json!({ "count": 0 })))
        .unwrap()
        .from_stream(StreamName::from("user-1"))
        .unwrap()
        .when_any(count_handler())
        .unwrap();

    projection.run(false).unwrap();
    assert_eq!(projection.state()["count"], 5);
}

#[test]
fn stop_from_inside_a_handler_halts_after_the_current_event() {
    let store = Arc::new(InMemoryEventStore::new());
    store
        .create(Stream::new(StreamName::from("user-1")).with_events(events_of("UsernameChanged", 50)))
        .unwrap();

    let manager = counting_setup(&store);
    let mut projection = manager
        .create_projection("stops_at_ten", ProjectionConfig::default())
        .unwrap()
        .init(Box::new(|| json!({ "count": 0 })))
        .unwrap()
        .from_stream(StreamName::from("user-1"))
        .unwrap()
        .when_any(Box::new(
            |state: &Value, _event: &RecordedEvent, ctx: &mut ProjectorContext| {
                let count = state["count"].as_u64().unwrap_or(0) + 1;
                if count == 10 {
                    ctx.stop();
                }
                Ok(Some(json!({ "count": count })))
            },
        ))
        .unwrap();

    projection.run(true).unwrap();

    assert_eq!(projection.state()["count"], 10);
    assert_eq!(
        projection.stream_positions().get(&StreamName::from("user-1")),
        Some(&10)
    );
    assert_eq!(projection.status(), ProjectionStatus::Idle);
}

#[test]
fn from_all_excludes_internal_streams() {
    let store = Arc::new(InMemoryEventStore::new());
    store
        .create(Stream::new(StreamName::from("$internal-1")).with_events(events_of("Hidden", 5)))
        .unwrap();
    store
        .create(Stream::new(StreamName::from("user-1")).with_events(events_of("UserCreated", 3)))
        .unwrap();
    store
        .create(Stream::new(StreamName::from("admin-1")).with_events(events_of("AdminCreated", 2)))
        .unwrap();

    let manager = counting_setup(&store);
    let mut projection = manager
        .create_projection("everything", ProjectionConfig::default())
        .unwrap()
        .init(Box::new(|| json!({ "count": 0 })))
        .unwrap()
        .from_all()
        .unwrap()
        .when_any(count_handler())
        .unwrap();

    projection.run(false).unwrap();

    assert_eq!(projection.state()["count"], 5);
    let positions = projection.stream_positions();
    assert!(!positions.contains_key(&StreamName::from("$internal-1")));
    assert!(positions.contains_key(&StreamName::from("user-1")));
}

#[test]
fn from_category_matches_the_dash_separated_prefix_only() {
    let store = Arc::new(InMemoryEventStore::new());
    store
        .create(Stream::new(StreamName::from("user-1")).with_events(events_of("UserCreated", 2)))
        .unwrap();
    store
        .create(Stream::new(StreamName::from("user-2")).with_events(events_of("UserCreated", 3)))
        .unwrap();
    store
        .create(Stream::new(StreamName::from("user2-1")).with_events(events_of("UserCreated", 7)))
        .unwrap();
    store
        .create(Stream::new(StreamName::from("admin-1")).with_events(events_of("AdminCreated", 4)))
        .unwrap();

    let manager = counting_setup(&store);
    let mut projection = manager
        .create_projection("users_only", ProjectionConfig::default())
        .unwrap()
        .init(Box::new(|| json!({ "count": 0 })))
        .unwrap()
        .from_category("user")
        .unwrap()
        .when_any(count_handler())
        .unwrap();

    projection.run(false).unwrap();
    assert_eq!(projection.state()["count"], 5);
}

#[test]
fn category_selection_picks_up_streams_created_between_runs() {
    let store = Arc::new(InMemoryEventStore::new());
    store
        .create(Stream::new(StreamName::from("user-1")).with_events(events_of("UserCreated", 2)))
        .unwrap();

    let manager = counting_setup(&store);
    let mut projection = manager
        .create_projection("growing", ProjectionConfig::default())
        .unwrap()
        .init(Box::new(|| json!({ "count": 0 })))
        .unwrap()
        .from_category("user")
        .unwrap()
        .when_any(count_handler())
        .unwrap();

    projection.run(false).unwrap();
    assert_eq!(projection.state()["count"], 2);

    store
        .create(Stream::new(StreamName::from("user-2")).with_events(events_of("UserCreated", 3)))
        .unwrap();

    projection.run(false).unwrap();
    assert_eq!(projection.state()["count"], 5);
}

#[test]
fn emit_and_link_to_write_through_the_store() {
    let store = Arc::new(InMemoryEventStore::new());
    store
        .create(Stream::new(StreamName::from("user-1")).with_events(events_of("UserCreated", 2)))
        .unwrap();

    let manager = counting_setup(&store);
    let mut projection = manager
        .create_projection("copier", ProjectionConfig::default())
        .unwrap()
        .from_stream(StreamName::from("user-1"))
        .unwrap()
        .when_any(Box::new(
            |_state: &Value, event: &RecordedEvent, ctx: &mut ProjectorContext| {
                ctx.emit(event.clone())?;
                ctx.link_to(&StreamName::from("linked-1"), event.clone())?;
                Ok(None)
            },
        ))
        .unwrap();

    projection.run(false).unwrap();

    // Emitted events land in the projection's own stream
    assert_eq!(
        store
            .load(&StreamName::from("copier"), 1, None, None)
            .unwrap()
            .count(),
        2
    );
    // Linked events land in the named stream, renumbered there
    let linked: Vec<u64> = store
        .load(&StreamName::from("linked-1"), 1, None, None)
        .unwrap()
        .map(|e| e.number)
        .collect();
    assert_eq!(linked, vec![1, 2]);
}

#[test]
fn handler_return_value_only_replaces_state_when_it_is_an_object() {
    let store = Arc::new(InMemoryEventStore::new());
    store
        .create(Stream::new(StreamName::from("user-1")).with_events(events_of("UserCreated", 3)))
        .unwrap();

    let manager = counting_setup(&store);
    let mut projection = manager
        .create_projection("ignores_non_objects", ProjectionConfig::default())
        .unwrap()
        .init(Box::new(|| json!({ "kept": true })))
        .unwrap()
        .from_stream(StreamName::from("user-1"))
        .unwrap()
        .when_any(Box::new(
            |_state: &Value, _event: &RecordedEvent, _ctx: &mut ProjectorContext| Ok(None),
        ))
        .unwrap();

    projection.run(false).unwrap();
    assert_eq!(projection.state(), json!({ "kept": true }));
}

#[test]
fn vanished_streams_are_treated_as_empty_not_as_errors() {
    let store = Arc::new(InMemoryEventStore::new());
    store
        .create(Stream::new(StreamName::from("user-1")).with_events(events_of("UserCreated", 2)))
        .unwrap();

    let manager = counting_setup(&store);
    let mut projection = manager
        .create_projection("survivor", ProjectionConfig::default())
        .unwrap()
        .init(Box::new(|| json!({ "count": 0 })))
        .unwrap()
        .from_streams(vec![StreamName::from("user-1"), StreamName::from("gone-1")])
        .unwrap()
        .when_any(count_handler())
        .unwrap();

    projection.run(false).unwrap();
    assert_eq!(projection.state()["count"], 2);
}

#[test]
fn configuration_calls_are_settable_exactly_once() {
    let store = Arc::new(InMemoryEventStore::new());
    let manager = counting_setup(&store);

    let projection = manager
        .create_projection("misuse", ProjectionConfig::default())
        .unwrap()
        .init(Box::new(|| json!({})))
        .unwrap();
    let err = projection.init(Box::new(|| json!({}))).unwrap_err();
    assert!(matches!(err, StrataError::RuntimeMisuse(_)));

    let projection = manager
        .create_projection("misuse2", ProjectionConfig::default())
        .unwrap()
        .from_stream(StreamName::from("a"))
        .unwrap();
    let err = projection.from_all().unwrap_err();
    assert!(matches!(err, StrataError::RuntimeMisuse(_)));

    let projection = manager
        .create_projection("misuse3", ProjectionConfig::default())
        .unwrap()
        .when_any(count_handler())
        .unwrap();
    let err = projection.when(HashMap::new()).unwrap_err();
    assert!(matches!(err, StrataError::RuntimeMisuse(_)));
}

#[test]
fn run_and_reset_require_a_source_and_handlers() {
    let store = Arc::new(InMemoryEventStore::new());
    let manager = counting_setup(&store);

    let mut unconfigured = manager
        .create_projection("empty", ProjectionConfig::default())
        .unwrap();
    assert!(matches!(
        unconfigured.run(false).unwrap_err(),
        StrataError::RuntimeMisuse(_)
    ));
    assert!(matches!(
        unconfigured.reset().unwrap_err(),
        StrataError::RuntimeMisuse(_)
    ));

    let mut source_only = manager
        .create_projection("source_only", ProjectionConfig::default())
        .unwrap()
        .from_all()
        .unwrap();
    assert!(matches!(
        source_only.run(false).unwrap_err(),
        StrataError::RuntimeMisuse(_)
    ));
}

#[test]
fn reset_restores_init_state_and_clears_cursors() {
    let store = Arc::new(InMemoryEventStore::new());
    store
        .create(Stream::new(StreamName::from("user-1")).with_events(events_of("UserCreated", 4)))
        .unwrap();

    let manager = counting_setup(&store);
    let mut projection = manager
        .create_projection("resettable", ProjectionConfig::default())
        .unwrap()
        .init(Box::new(|| json!({ "count": 0 })))
        .unwrap()
        .from_stream(StreamName::from("user-1"))
        .unwrap()
        .when_any(count_handler())
        .unwrap();

    projection.run(false).unwrap();
    assert_eq!(projection.state()["count"], 4);

    projection.reset().unwrap();
    assert_eq!(projection.state(), json!({ "count": 0 }));
    assert!(projection.stream_positions().is_empty());

    // Rerun reprocesses from scratch
    projection.run(false).unwrap();
    assert_eq!(projection.state()["count"], 4);
}

#[test]
fn invalid_config_is_rejected_at_creation() {
    let store = Arc::new(InMemoryEventStore::new());
    let manager = counting_setup(&store);

    let err = manager
        .create_projection("bad", ProjectionConfig::default().with_cache_size(0))
        .unwrap_err();
    assert!(matches!(err, StrataError::InvalidArgument(_)));

    let err = manager
        .create_projection("bad2", ProjectionConfig::default().with_sleep_ms(0))
        .unwrap_err();
    assert!(matches!(err, StrataError::InvalidArgument(_)));
}
