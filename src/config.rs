//! Stacking configuration.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

/// Default delay before a hovered window is raised.
const AUTO_RAISE_INTERVAL_MILLIS: u64 = 750;

/// Window management options affecting the stacking order.
#[derive(Deserialize, PartialEq, Eq, Copy, Clone, Debug)]
#[serde(default)]
pub struct Config {
    /// Only consider the window's own output when toggling between raise and
    /// lower.
    pub separate_screen_focus: bool,

    /// Raise windows the pointer rests on.
    pub auto_raise: bool,

    /// Auto-raise delay in milliseconds.
    pub auto_raise_interval: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_raise_interval: AUTO_RAISE_INTERVAL_MILLIS,
            separate_screen_focus: false,
            auto_raise: false,
        }
    }
}

impl Config {
    /// Parse the configuration from a JSON object.
    ///
    /// A `null` value results in the default configuration.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }

        serde_json::from_value(value)
    }

    /// Auto-raise timer duration.
    pub fn auto_raise_delay(&self) -> Duration {
        Duration::from_millis(self.auto_raise_interval)
    }
}
