use chrono::Duration;
use serde::Serialize;
use std::fmt;

use crate::kubernetes::ObjectIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Job,
    Pod,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Job => write!(f, "job"),
            ObjectKind::Pod => write!(f, "pod"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Reason {
    /// Job completed longer ago than the finished retention.
    FinishedTooLong,
    /// Job still running past its effective timeout.
    RanTooLong,
    /// Stopped pod older than the finished retention.
    PodFinishedTooLong,
    /// Pod whose parent job no longer exists.
    Orphaned,
}

impl Reason {
    /// Value of the `kind` label on the deletion counter.
    pub fn metric_label(&self) -> &'static str {
        match self {
            Reason::FinishedTooLong | Reason::RanTooLong => "job",
            Reason::PodFinishedTooLong => "pod",
            Reason::Orphaned => "orphan",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Reason::FinishedTooLong => "Job has been finished too long",
            Reason::RanTooLong => "Job ran too long",
            Reason::PodFinishedTooLong => "Pod has been finished too long",
            Reason::Orphaned => "Parent job no longer exists",
        };
        f.write_str(text)
    }
}

/// Verdict on one object within one sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub kind: ObjectKind,
    pub target: ObjectIdentity,
    #[serde(serialize_with = "serialize_age")]
    pub age: Duration,
    pub reason: Reason,
    pub deletable: bool,
}

impl Decision {
    pub fn age_seconds(&self) -> i64 {
        self.age.num_seconds()
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}s old) {}",
            self.kind,
            self.target,
            self.age_seconds(),
            self.reason
        )
    }
}

fn serialize_age<S: serde::Serializer>(age: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(age.num_seconds())
}

/// Why an object produced no decision at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// Deletion already in progress.
    Terminating,
    /// Unfinished job without a start time; no age can be computed.
    MissingStartTime,
    /// Running job with no timeout in effect.
    NoRunningTimeout,
    /// Pod neither in a terminal phase nor opted in.
    NotStopped,
    /// Stopped pod reporting no container statuses.
    MissingContainerStatuses,
    /// No container carries a termination timestamp.
    NoTerminatedContainer,
    /// Job-managed pod without a parent identity label.
    MissingParentLabel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Decided(Decision),
    Skipped(SkipReason),
}

impl Outcome {
    pub fn decision(&self) -> Option<&Decision> {
        match self {
            Outcome::Decided(d) => Some(d),
            Outcome::Skipped(_) => None,
        }
    }

    pub fn is_deletable(&self) -> bool {
        self.decision().map(|d| d.deletable).unwrap_or(false)
    }
}
