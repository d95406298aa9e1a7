//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Configuration for opening an [`Engine`](crate::Engine).
///
/// All fields have sensible defaults. Use struct update syntax to override
/// specific settings:
///
/// ```rust
/// use tracker_update_engine::EngineConfig;
///
/// let config = EngineConfig {
///     cache_size_mb: 128,
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Cache size in megabytes hinted to the backing store.
    ///
    /// redb manages its own page cache internally; this is retained as a
    /// tuning knob for future backends and validated the same way the
    /// backing store's configuration always has been.
    pub cache_size_mb: usize,

    /// Durability mode for write operations.
    pub sync_mode: SyncMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_size_mb: 64,
            sync_mode: SyncMode::Normal,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration.
    ///
    /// Called automatically by `Engine::open()`.
    pub fn validate(&self) -> Result<()> {
        if self.cache_size_mb == 0 {
            return Err(EngineError::internal(
                "cache_size_mb must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Durability mode for write operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// Sync to disk on transaction commit. Default and recommended.
    #[default]
    Normal,

    /// Defer syncing (faster writes, may lose recent data on crash).
    Fast,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_cache_size_is_invalid() {
        let config = EngineConfig {
            cache_size_mb: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
