use std::collections::BTreeMap;
use strata_core::types::StreamName;
use strata_core::{EventStore, Result};

/// Logical stream selection of a projection or query, fixed once via
/// one of the `from_*` configuration calls.
pub(crate) enum SourceQuery {
    Streams(Vec<StreamName>),
    Categories(Vec<String>),
    All,
}

/// Resolve the selection against the store's current stream list and
/// union the result into the tracked positions. Existing cursors are
/// kept; newly discovered streams start at 0 ("not yet read").
///
/// Category match means the stream name starts with `"<category>-"`;
/// `All` skips internal `$` streams.
pub(crate) fn prepare_positions<S: EventStore>(
    source: &SourceQuery,
    store: &S,
    positions: &mut BTreeMap<StreamName, u64>,
) -> Result<()> {
    match source {
        SourceQuery::Streams(streams) => {
            for stream in streams {
                positions.entry(stream.clone()).or_insert(0);
            }
        }
        SourceQuery::Categories(categories) => {
            for name in store.list_stream_names()? {
                let matched = categories
                    .iter()
                    .any(|category| match name.category() {
                        Some(prefix) => prefix == category,
                        None => false,
                    });
                if matched {
                    positions.entry(name).or_insert(0);
                }
            }
        }
        SourceQuery::All => {
            for name in store.list_stream_names()? {
                if !name.is_internal() {
                    positions.entry(name).or_insert(0);
                }
            }
        }
    }
    Ok(())
}
