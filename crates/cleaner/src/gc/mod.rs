//! Garbage-collection core.
//!
//! Classification (`jobs`, `pods`, `orphans`) is pure: it takes objects, the sweep's
//! `now` and the policy, and returns decisions. Only `executor` and `sweep` touch the
//! cluster.

pub mod containers;
pub mod decision;
pub mod executor;
pub mod jobs;
pub mod orphans;
pub mod pods;
pub mod policy;
pub mod sweep;

pub use decision::{Decision, ObjectKind, Outcome, Reason, SkipReason};
pub use executor::GcExecutor;
pub use policy::RunningTimeout;
pub use sweep::{SweepReport, Sweeper};
