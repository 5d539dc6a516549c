//! Timeout policy resolution.
//!
//! The running-job timeout is configured globally and may be overridden per job with
//! the `cleanup-timeout` annotation. A negative value in either place disables the
//! timeout for that job.

use chrono::Duration;
use std::collections::BTreeMap;

use crate::{config::PolicyConfig, kubernetes::resources::TIMEOUT_OVERRIDE_ANNOTATION};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningTimeout {
    /// Never kill the job while it runs.
    Never,
    After(Duration),
}

impl RunningTimeout {
    /// `None` when `seconds` does not fit in a `Duration`.
    pub fn from_seconds(seconds: i64) -> Option<Self> {
        if seconds < 0 {
            Some(RunningTimeout::Never)
        } else {
            Duration::try_seconds(seconds).map(RunningTimeout::After)
        }
    }
}

/// Override annotation whose value is not a usable number of seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidOverride {
    pub value: String,
    pub reason: String,
}

impl PolicyConfig {
    /// Out-of-range values are rejected by `Config::from_args`; saturate for hand-built policies.
    pub fn finished_retention(&self) -> Duration {
        Duration::try_seconds(self.timeout_finished_seconds).unwrap_or_else(Duration::max_value)
    }

    pub fn default_running_timeout(&self) -> RunningTimeout {
        RunningTimeout::from_seconds(self.timeout_all_seconds)
            .unwrap_or_else(|| RunningTimeout::After(Duration::max_value()))
    }

    /// Effective running timeout for a job carrying `annotations`.
    ///
    /// A malformed override is returned as an error, never replaced by the default.
    pub fn resolve_running_timeout(
        &self,
        annotations: &BTreeMap<String, String>,
    ) -> Result<RunningTimeout, InvalidOverride> {
        match annotations.get(TIMEOUT_OVERRIDE_ANNOTATION) {
            None => Ok(self.default_running_timeout()),
            Some(raw) => {
                let seconds = raw.trim().parse::<i64>().map_err(|e| InvalidOverride {
                    value: raw.clone(),
                    reason: e.to_string(),
                })?;
                RunningTimeout::from_seconds(seconds).ok_or_else(|| InvalidOverride {
                    value: raw.clone(),
                    reason: "number of seconds out of range".to_string(),
                })
            }
        }
    }
}
