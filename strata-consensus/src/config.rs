use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Runtime parameters shared by every consensus instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Δ: initial EPFD delay and its backoff increment.
    pub delta: Duration,
    /// Pause between dispatch passes that made no progress.
    pub pass_interval: Duration,
    /// How long an unhandled message stays queued before it is dropped.
    /// `None`, the default, keeps retrying it every pass.
    pub unhandled_retention: Option<Duration>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            delta: Duration::from_millis(100),
            pass_interval: Duration::from_millis(15),
            unhandled_retention: None,
        }
    }
}
