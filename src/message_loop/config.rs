//! Per-loop configuration

use serde::Deserialize;
use std::time::Duration;

/// Settings applied to every loop a registry creates
///
/// Deserialised from the `[loop]` table of the TOML config file:
///
/// ```toml
/// [loop]
/// drain_timeout_ms = 5000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoopConfig {
    /// Upper bound for a single `drain` call; `None` waits indefinitely
    #[serde(rename = "drain_timeout_ms", with = "optional_millis")]
    pub drain_timeout: Option<Duration>,
}

impl LoopConfig {
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = Some(timeout);
        self
    }
}

mod optional_millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
