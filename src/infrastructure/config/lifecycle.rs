//! Shutdown and restart timing configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::application::lifecycle::{BackgroundFaultPolicy, HubSettings, ShutdownTimings};

/// `[lifecycle]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    /// Stop allowance per active worker (milliseconds).
    #[serde(default = "default_worker_stop_allowance_ms")]
    pub worker_stop_allowance_ms: u64,
    /// Pause after the worker stop race (milliseconds).
    #[serde(default = "default_post_stop_grace_ms")]
    pub post_stop_grace_ms: u64,
    /// Delay before a failed startup exits (milliseconds).
    #[serde(default = "default_fatal_grace_ms")]
    pub fatal_grace_ms: u64,
    /// Wait after launching a replacement process (milliseconds).
    #[serde(default = "default_restart_handover_ms")]
    pub restart_handover_ms: u64,
    #[serde(default)]
    pub escalate_background_faults: bool,
}

fn default_worker_stop_allowance_ms() -> u64 {
    5000
}

fn default_post_stop_grace_ms() -> u64 {
    1000
}

fn default_fatal_grace_ms() -> u64 {
    10_000
}

fn default_restart_handover_ms() -> u64 {
    2000
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            worker_stop_allowance_ms: default_worker_stop_allowance_ms(),
            post_stop_grace_ms: default_post_stop_grace_ms(),
            fatal_grace_ms: default_fatal_grace_ms(),
            restart_handover_ms: default_restart_handover_ms(),
            escalate_background_faults: false,
        }
    }
}

impl LifecycleConfig {
    #[must_use]
    pub fn timings(&self) -> ShutdownTimings {
        ShutdownTimings {
            worker_stop_allowance: Duration::from_millis(self.worker_stop_allowance_ms),
            post_stop_grace: Duration::from_millis(self.post_stop_grace_ms),
        }
    }

    #[must_use]
    pub fn hub_settings(&self) -> HubSettings {
        HubSettings {
            background_faults: if self.escalate_background_faults {
                BackgroundFaultPolicy::Escalate
            } else {
                BackgroundFaultPolicy::Observe
            },
            restart_handover: Duration::from_millis(self.restart_handover_ms),
        }
    }

    #[must_use]
    pub fn fatal_grace(&self) -> Duration {
        Duration::from_millis(self.fatal_grace_ms)
    }
}
