use serde_json::Value;
use std::collections::BTreeMap;
use strata_core::{ReadModel, Result, StrataError};

/// Map-backed read model, mainly useful for tests and examples.
///
/// Supported stacked operations:
/// - `"insert"` / `"update"`: args `[key, value]`
/// - `"delete"`: args `[key]`
///
/// `persist` applies queued operations in stacking order; an unknown
/// operation name or malformed arguments fail the flush with
/// `InvalidArgument` and drop the rest of the queue.
#[derive(Default)]
pub struct InMemoryReadModel {
    storage: BTreeMap<String, Value>,
    pending: Vec<(String, Vec<Value>)>,
    initialized: bool,
}

impl InMemoryReadModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn storage(&self) -> &BTreeMap<String, Value> {
        &self.storage
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.storage.get(key)
    }

    fn apply(&mut self, operation: &str, args: Vec<Value>) -> Result<()> {
        let mut args = args.into_iter();
        let key = args
            .next()
            .and_then(|key| key.as_str().map(str::to_string))
            .ok_or_else(|| {
                StrataError::InvalidArgument(format!(
                    "operation '{operation}' requires a string key argument"
                ))
            })?;

        match operation {
            "insert" | "update" => {
                let value = args.next().ok_or_else(|| {
                    StrataError::InvalidArgument(format!(
                        "operation '{operation}' requires a value argument"
                    ))
                })?;
                self.storage.insert(key, value);
            }
            "delete" => {
                self.storage.remove(&key);
            }
            other => {
                return Err(StrataError::InvalidArgument(format!(
                    "unknown read model operation '{other}'"
                )));
            }
        }
        Ok(())
    }
}

impl ReadModel for InMemoryReadModel {
    fn init(&mut self) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn reset(&mut self) -> Result<()> {
        self.storage.clear();
        self.pending.clear();
        Ok(())
    }

    fn delete(&mut self) -> Result<()> {
        self.storage.clear();
        self.pending.clear();
        self.initialized = false;
        Ok(())
    }

    fn stack(&mut self, operation: &str, args: Vec<Value>) {
        self.pending.push((operation.to_string(), args));
    }

    fn persist(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        for (operation, args) in pending {
            self.apply(&operation, args)?;
        }
        Ok(())
    }
}
