pub mod clock;
pub mod config;
pub mod gc;
pub mod kubernetes;
pub mod metrics;

pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use gc::{Decision, Reason, SweepReport, Sweeper};
pub use kubernetes::{ClusterApi, KubeCluster, ObjectIdentity};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Kubernetes error: {0}")]
    Kubernetes(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid cleanup-timeout override {value:?} on job {job}: {reason}")]
    InvalidTimeoutOverride {
        job: String,
        value: String,
        reason: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
