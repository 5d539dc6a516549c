use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Command-line arguments. Every flag falls back to an environment variable so the
/// cleaner can be configured from a CronJob manifest or a `.env` file alike.
#[derive(Debug, Clone, Parser)]
#[command(name = "kube-job-cleaner", version, about = "Delete finished, overdue and orphaned jobs and pods")]
pub struct Args {
    /// Delete all finished jobs and pods older than this many seconds
    #[arg(long, env = "CLEANUP_TIMEOUT_FINISHED_SECONDS", default_value_t = 3600, allow_negative_numbers = true)]
    pub timeout_finished_seconds: i64,

    /// Kill all running jobs older than this many seconds (negative disables)
    #[arg(long, env = "CLEANUP_TIMEOUT_ALL_SECONDS", default_value_t = -1, allow_negative_numbers = true)]
    pub timeout_all_seconds: i64,

    /// Log what would be deleted without deleting anything
    #[arg(long, env = "CLEANUP_DRY_RUN")]
    pub dry_run: bool,

    /// Repeat the sweep every N seconds instead of exiting after one
    #[arg(long, env = "CLEANUP_INTERVAL_SECONDS")]
    pub interval_seconds: Option<u64>,

    /// Write Prometheus metrics to this file after every sweep
    #[arg(long, env = "CLEANUP_METRICS_FILE")]
    pub metrics_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub policy: PolicyConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Retention policy applied during a sweep. Fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyConfig {
    pub timeout_finished_seconds: i64,
    /// Negative means running jobs are never killed unless overridden per job.
    pub timeout_all_seconds: i64,
    pub dry_run: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            timeout_finished_seconds: 3600,
            timeout_all_seconds: -1,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// `None` runs a single sweep and exits.
    pub interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub file: Option<PathBuf>,
}

impl Config {
    pub fn load() -> crate::Result<Self> {
        // Load environment variables from .env file if it exists
        let _ = dotenvy::dotenv();

        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> crate::Result<Self> {
        let config = Config {
            policy: PolicyConfig {
                timeout_finished_seconds: args.timeout_finished_seconds,
                timeout_all_seconds: args.timeout_all_seconds,
                dry_run: args.dry_run,
            },
            schedule: ScheduleConfig {
                interval_seconds: args.interval_seconds,
            },
            metrics: MetricsConfig {
                file: args.metrics_file,
            },
        };

        if config.policy.timeout_finished_seconds < 0 {
            return Err(crate::Error::Config(format!(
                "timeout-finished-seconds must not be negative, got {}",
                config.policy.timeout_finished_seconds
            )));
        }

        for (flag, seconds) in [
            ("timeout-finished-seconds", config.policy.timeout_finished_seconds),
            ("timeout-all-seconds", config.policy.timeout_all_seconds),
        ] {
            if chrono::Duration::try_seconds(seconds).is_none() {
                return Err(crate::Error::Config(format!(
                    "{} is out of range, got {}",
                    flag, seconds
                )));
            }
        }

        if config.schedule.interval_seconds == Some(0) {
            return Err(crate::Error::Config(
                "interval-seconds must be greater than zero".to_string(),
            ));
        }

        if config.policy.timeout_all_seconds < 0 {
            tracing::debug!("Running-job timeout disabled; only per-job overrides apply");
        }

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::default(),
            schedule: ScheduleConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}
