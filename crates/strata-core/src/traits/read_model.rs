use crate::error::Result;
use serde_json::Value;

/// External projection target with a write staging discipline.
///
/// Mutations are queued via [`stack`](ReadModel::stack) and flushed in
/// one go by [`persist`](ReadModel::persist); the runner calls
/// `persist` every `persist_block_size` consumed events and at the end
/// of each tick, so a flush is atomic from the runner's perspective.
///
/// Lifecycle: uninitialized -> initialized (`init`) -> `reset` /
/// `delete`.
pub trait ReadModel {
    fn init(&mut self) -> Result<()>;

    fn is_initialized(&self) -> bool;

    /// Discard all projected data but stay initialized.
    fn reset(&mut self) -> Result<()>;

    /// Tear the read model down entirely.
    fn delete(&mut self) -> Result<()>;

    /// Queue a named mutation for the next flush.
    fn stack(&mut self, operation: &str, args: Vec<Value>);

    /// Flush all queued mutations.
    fn persist(&mut self) -> Result<()>;
}
