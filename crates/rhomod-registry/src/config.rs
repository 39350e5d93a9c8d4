//! Registry configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_REGISTRY_PATH: &str = "registry.jsonl";
pub const DEFAULT_LOCK_RETRIES: u32 = 50;
pub const DEFAULT_LOCK_RETRY_DELAY_MS: u64 = 20;

/// Where the registry lives and how long writers wait for the file lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// JSONL file holding `content hash → handle` entries.
    pub path: PathBuf,

    /// How many times a writer retries a busy lock before giving up.
    pub lock_retries: u32,

    /// Pause between lock attempts, in milliseconds.
    pub lock_retry_delay_ms: u64,
}

impl RegistryConfig {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn lock_retry_delay(&self) -> Duration {
        Duration::from_millis(self.lock_retry_delay_ms)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_REGISTRY_PATH),
            lock_retries: DEFAULT_LOCK_RETRIES,
            lock_retry_delay_ms: DEFAULT_LOCK_RETRY_DELAY_MS,
        }
    }
}
