// Tue Jan 13 2026 - Alex

use crate::error::AckError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub forwarder_fallback_timeout_ms: u64,
    pub conflict_free_max_attempts: u32,
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            forwarder_fallback_timeout_ms: 60_000,
            conflict_free_max_attempts: 1024,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, AckError> {
        let raw = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&raw)?;
        config.validate().map_err(AckError::ConfigInvalid)?;
        Ok(config)
    }

    pub fn with_forwarder_fallback_timeout(mut self, timeout: Duration) -> Self {
        self.forwarder_fallback_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_conflict_free_max_attempts(mut self, attempts: u32) -> Self {
        self.conflict_free_max_attempts = attempts;
        self
    }

    pub fn forwarder_fallback_timeout(&self) -> Duration {
        Duration::from_millis(self.forwarder_fallback_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.forwarder_fallback_timeout_ms == 0 {
            return Err("forwarder_fallback_timeout_ms must be greater than 0".to_string());
        }
        if self.conflict_free_max_attempts == 0 {
            return Err("conflict_free_max_attempts must be greater than 0".to_string());
        }
        Ok(())
    }
}
