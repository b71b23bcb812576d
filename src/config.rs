// Editing configuration - history and notification sizing

use ron::from_str as ron_from_str;
use serde::{Deserialize, Serialize};

/// Configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse editing configuration: {0}")]
    Parse(String),

    #[error("Invalid editing configuration: {0}")]
    Invalid(String),
}

/// Settings shared by every editing session of a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditingConfig {
    /// Number of entries kept by each of the undo and redo stacks
    pub history_capacity: usize,
    /// Capacity of a session's GUI notification ring buffer
    pub notification_capacity: usize,
}

impl Default for EditingConfig {
    fn default() -> Self {
        Self {
            history_capacity: crate::command::manager::DEFAULT_MAX_HISTORY,
            notification_capacity: 256,
        }
    }
}

impl EditingConfig {
    /// Parse a configuration from RON. Missing fields keep their defaults.
    pub fn from_ron_str(data: &str) -> Result<Self, ConfigError> {
        let config: Self = ron_from_str(data).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        if self.notification_capacity == 0 {
            return Err(ConfigError::Invalid(
                "notification_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
