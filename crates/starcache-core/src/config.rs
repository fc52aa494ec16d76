//! Engine configuration, read from TOML.

use crate::{batch::LoadOptions, error::InternalError};
use serde::{Deserialize, Serialize};
use std::path::Path;

///
/// EngineConfig
///
/// Every field has a default; unknown keys are rejected.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Threads running SQL loads.
    pub worker_threads: usize,

    /// Emit GROUPING SETS when the dialect supports them.
    pub enable_grouping_sets: bool,

    /// Return loaded segments without installing them.
    pub disable_caching: bool,

    /// Render generated SQL on several indented lines.
    pub formatted_sql: bool,

    /// Bound of the cache executor's command queue.
    pub executor_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            enable_grouping_sets: true,
            disable_caching: false,
            formatted_sql: false,
            executor_queue_capacity: 1024,
        }
    }
}

impl EngineConfig {
    pub fn from_toml(text: &str) -> Result<Self, InternalError> {
        let config: Self = toml::from_str(text)
            .map_err(|err| InternalError::config_invalid(format!("invalid engine config: {err}")))?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, InternalError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            InternalError::config_invalid(format!("cannot read {}: {err}", path.display()))
        })?;

        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), InternalError> {
        if self.worker_threads == 0 {
            return Err(InternalError::config_invalid(
                "worker_threads must be at least 1",
            ));
        }
        if self.executor_queue_capacity == 0 {
            return Err(InternalError::config_invalid(
                "executor_queue_capacity must be at least 1",
            ));
        }

        Ok(())
    }

    #[must_use]
    pub const fn load_options(&self) -> LoadOptions {
        LoadOptions {
            grouping_sets: self.enable_grouping_sets,
            formatted_sql: self.formatted_sql,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorOrigin;

    #[test]
    fn empty_document_is_the_default() {
        assert_eq!(EngineConfig::from_toml("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn fields_override_defaults() {
        let config = EngineConfig::from_toml(
            "worker_threads = 2\nenable_grouping_sets = false\nformatted_sql = true\n",
        )
        .unwrap();

        assert_eq!(config.worker_threads, 2);
        assert!(!config.load_options().grouping_sets);
        assert!(config.load_options().formatted_sql);
        assert_eq!(config.executor_queue_capacity, 1024);
    }

    #[test]
    fn unknown_keys_and_zero_sizes_are_rejected() {
        let err = EngineConfig::from_toml("worker_thread = 2").unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(err.origin, ErrorOrigin::Config);

        let err = EngineConfig::from_toml("worker_threads = 0").unwrap_err();
        assert_eq!(err.message, "worker_threads must be at least 1");

        assert!(EngineConfig::from_toml("executor_queue_capacity = 0").is_err());
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = EngineConfig {
            disable_caching: true,
            ..EngineConfig::default()
        };
        let text = toml::to_string(&config).unwrap();

        assert_eq!(EngineConfig::from_toml(&text).unwrap(), config);
    }
}
