use crate::error::{Result, StrataError};
use serde::{Deserialize, Serialize};

/// Configuration for a projection runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Size of the rolling stream-name cache used by `link_to`
    /// Default: 1000
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Idle sleep between ticks that yielded zero events (milliseconds)
    /// Default: 100ms
    #[serde(default = "default_sleep_ms")]
    pub sleep_ms: u64,
}

/// Configuration for a read-model projection runner.
///
/// No `cache_size` here: the read-model runner has no emit/link_to
/// channel, so there is no stream-name cache to size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadModelProjectionConfig {
    /// Idle sleep between empty ticks (milliseconds)
    /// Default: 100ms
    #[serde(default = "default_sleep_ms")]
    pub sleep_ms: u64,

    /// Flush pending read-model writes every N consumed events
    /// Default: 1000
    #[serde(default = "default_persist_block_size")]
    pub persist_block_size: usize,
}

fn default_cache_size() -> usize {
    1000
}

fn default_sleep_ms() -> u64 {
    100
}

fn default_persist_block_size() -> usize {
    1000
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            cache_size: default_cache_size(),
            sleep_ms: default_sleep_ms(),
        }
    }
}

impl ProjectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    pub fn with_sleep_ms(mut self, ms: u64) -> Self {
        self.sleep_ms = ms;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_size < 1 {
            return Err(StrataError::InvalidArgument(
                "cache size must be a positive integer".into(),
            ));
        }
        if self.sleep_ms < 1 {
            return Err(StrataError::InvalidArgument(
                "sleep must be a positive integer".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ReadModelProjectionConfig {
    fn default() -> Self {
        Self {
            sleep_ms: default_sleep_ms(),
            persist_block_size: default_persist_block_size(),
        }
    }
}

impl ReadModelProjectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sleep_ms(mut self, ms: u64) -> Self {
        self.sleep_ms = ms;
        self
    }

    pub fn with_persist_block_size(mut self, size: usize) -> Self {
        self.persist_block_size = size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.sleep_ms < 1 {
            return Err(StrataError::InvalidArgument(
                "sleep must be a positive integer".into(),
            ));
        }
        if self.persist_block_size < 1 {
            return Err(StrataError::InvalidArgument(
                "persist block size must be a positive integer".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_documents_deserialize_to_defaults() {
        let config: ProjectionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.cache_size, 1000);
        assert_eq!(config.sleep_ms, 100);

        let config: ReadModelProjectionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.sleep_ms, 100);
        assert_eq!(config.persist_block_size, 1000);
    }

    #[test]
    fn zero_values_fail_validation() {
        let err = ProjectionConfig::new().with_cache_size(0).validate();
        assert!(matches!(err, Err(StrataError::InvalidArgument(_))));

        let err = ReadModelProjectionConfig::new()
            .with_persist_block_size(0)
            .validate();
        assert!(matches!(err, Err(StrataError::InvalidArgument(_))));

        let err = ReadModelProjectionConfig::new().with_sleep_ms(0).validate();
        assert!(matches!(err, Err(StrataError::InvalidArgument(_))));
    }
}
