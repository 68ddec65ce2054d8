use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Snapshot format written by this crate
pub const FORMAT_VERSION: u32 = 1;

/// Persisted user settings, stored beside the board tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub last_open_board: usize,
}

/// Persistence gateway configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Quiet period before a scheduled save is written
    pub debounce_ms: u64,
    pub boards_key: String,
    pub settings_key: String,
    /// Combined size limit of both records, reported by `storage_usage`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_bytes: Option<u64>,
}

impl GatewayConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce_ms = debounce.as_millis() as u64;
        self
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            boards_key: "taskboard.boards".to_string(),
            settings_key: "taskboard.settings".to_string(),
            quota_bytes: None,
        }
    }
}
