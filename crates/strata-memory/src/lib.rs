//! In-memory event store backend.
//!
//! Keeps every stream in a reader/writer-locked map: mutations
//! (create/append/delete) are serialized behind the write lock while
//! loads share the read lock and return snapshots. No durability, no
//! crash recovery; versioning and ordering semantics are identical to
//! what a durable backend must provide.

mod store;

pub use store::InMemoryEventStore;
