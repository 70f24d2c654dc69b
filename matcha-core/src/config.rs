//! Runtime configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Configuration for the event poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Timeout passed to each `crossterm::event::poll` call.
    #[serde(with = "millis", rename = "poll_timeout_ms")]
    pub poll_timeout: Duration,
    /// Sleep between poll cycles.
    #[serde(with = "millis", rename = "loop_sleep_ms")]
    pub loop_sleep: Duration,
    /// Events read per poll cycle at most.
    pub max_batch: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(10),
            loop_sleep: Duration::from_millis(16),
            max_batch: 20,
        }
    }
}

/// Settings for [`App`](crate::runtime::App)
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// # use matcha_core::RuntimeConfig;
/// let config = RuntimeConfig::from_json(r#"{ "render_batch": 4, "mouse": false }"#).unwrap();
/// assert_eq!(config.render_batch, 4);
/// assert!(!config.mouse);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Tick on which pending render requests are flushed.
    #[serde(with = "millis", rename = "frame_interval_ms")]
    pub frame_interval: Duration,
    /// Pending render requests that trigger a frame before the tick.
    pub render_batch: usize,
    /// Capacity of the render request queue.
    pub render_queue: usize,
    /// Capacity of the input event queue.
    pub event_queue: usize,
    /// Input polling.
    pub poller: PollerConfig,
    /// Capture mouse events.
    pub mouse: bool,
    /// Deliver bracketed paste as a single event.
    pub bracketed_paste: bool,
    /// Report terminal focus changes.
    pub focus_change: bool,
    /// Quit on Ctrl+C when no handler takes it.
    pub exit_on_ctrl_c: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_secs(1) / 24,
            render_batch: 8,
            render_queue: 64,
            event_queue: 10,
            poller: PollerConfig::default(),
            mouse: true,
            bracketed_paste: true,
            focus_change: true,
            exit_on_ctrl_c: true,
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the runtime cannot work with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.frame_interval.is_zero() {
            return Err(Error::InvalidConfig("frame interval must be positive".into()));
        }
        if self.render_batch == 0 {
            return Err(Error::InvalidConfig("render batch must be at least 1".into()));
        }
        if self.render_queue == 0 || self.event_queue == 0 {
            return Err(Error::InvalidConfig("queue capacities must be at least 1".into()));
        }
        if self.poller.max_batch == 0 {
            return Err(Error::InvalidConfig("poller batch must be at least 1".into()));
        }
        Ok(())
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().try_into().unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
