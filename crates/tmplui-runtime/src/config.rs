#![forbid(unsafe_code)]

//! Runtime tuning knobs.
//!
//! # Environment Variables
//!
//! | variable                        | field                   | default |
//! |---------------------------------|-------------------------|---------|
//! | `TMPLUI_RECONCILE_INTERVAL_MS`  | `reconcile_interval`    | 150     |
//! | `TMPLUI_UPDATE_QUEUE_CAPACITY`  | `update_queue_capacity` | 100     |
//!
//! Unparseable or zero values are ignored.

use std::env;

use web_time::Duration;

pub const ENV_RECONCILE_INTERVAL_MS: &str = "TMPLUI_RECONCILE_INTERVAL_MS";
pub const ENV_UPDATE_QUEUE_CAPACITY: &str = "TMPLUI_UPDATE_QUEUE_CAPACITY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Period of the reconciliation trigger.
    pub reconcile_interval: Duration,
    /// Bound of the UI update queue.
    pub update_queue_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            reconcile_interval: Duration::from_millis(150),
            update_queue_capacity: 100,
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Defaults overridden by `lookup(variable)`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(val) = lookup(ENV_RECONCILE_INTERVAL_MS)
            && let Ok(ms) = val.trim().parse::<u64>()
            && ms > 0
        {
            config.reconcile_interval = Duration::from_millis(ms);
        }
        if let Some(val) = lookup(ENV_UPDATE_QUEUE_CAPACITY)
            && let Ok(n) = val.trim().parse::<usize>()
            && n > 0
        {
            config.update_queue_capacity = n;
        }
        config
    }

    #[must_use]
    pub fn with_reconcile_interval(mut self, interval: Duration) -> Self {
        self.reconcile_interval = interval;
        self
    }

    #[must_use]
    pub fn with_update_queue_capacity(mut self, capacity: usize) -> Self {
        self.update_queue_capacity = capacity.max(1);
        self
    }
}
