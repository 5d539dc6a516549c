use chrono::{DateTime, Duration, Utc};
use k8s_openapi::api::core::v1::ContainerStatus;

/// How long ago a pod's containers stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationAge {
    /// The pod reports no container statuses at all.
    MissingStatuses,
    /// No container has a termination record with a finish time.
    Undetermined,
    /// Age of the most recently finished container.
    Stopped(Duration),
}

/// Time since the last container of a pod stopped.
///
/// Each container contributes its current terminated state, or failing that its last
/// terminated state. The smallest age wins: a pod is only fully stopped once its last
/// container is.
pub fn time_since_stopped(
    statuses: Option<&[ContainerStatus]>,
    now: DateTime<Utc>,
) -> TerminationAge {
    let Some(statuses) = statuses else {
        return TerminationAge::MissingStatuses;
    };

    statuses
        .iter()
        .filter_map(finished_at)
        .map(|finished| now - finished)
        .min()
        .map(TerminationAge::Stopped)
        .unwrap_or(TerminationAge::Undetermined)
}

fn finished_at(status: &ContainerStatus) -> Option<DateTime<Utc>> {
    let current = status.state.as_ref().and_then(|s| s.terminated.as_ref());
    // A restarting container may be "waiting" now while its last run terminated.
    let terminated = match current {
        Some(t) => t,
        None => status.last_state.as_ref()?.terminated.as_ref()?,
    };
    terminated.finished_at.as_ref().map(|t| t.0)
}
