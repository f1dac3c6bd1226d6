//! Boot context for correlating the logs of one startup.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one application boot across every log line it produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootContext {
    /// Unique boot identifier.
    pub boot_id: Uuid,
    /// When the boot started.
    pub started_at: DateTime<Utc>,
    /// Component that started the boot (e.g. `"runtime"`).
    pub source: String,
    /// Free-form labels, such as the config file in use.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl BootContext {
    /// New context with a fresh id.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            boot_id: Uuid::new_v4(),
            started_at: Utc::now(),
            source: source.into(),
            labels: BTreeMap::new(),
        }
    }

    /// Add a label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Milliseconds since the boot started.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }

    /// First eight hex digits of the boot id.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.boot_id.simple().to_string().chars().take(8).collect()
    }

    /// Span carrying the boot id. Instrument the boot future with it.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "boot",
            boot_id = %self.short_id(),
            source = %self.source,
        )
    }
}

impl Default for BootContext {
    fn default() -> Self {
        Self::new("unknown")
    }
}
