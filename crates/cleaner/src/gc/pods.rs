use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;

use crate::{
    config::PolicyConfig,
    gc::{
        containers::{time_since_stopped, TerminationAge},
        decision::{Decision, ObjectKind, Outcome, Reason, SkipReason},
    },
    kubernetes::{
        resources::{is_terminating, FINISHED_OPT_IN_ANNOTATION},
        ObjectIdentity,
    },
};

const TERMINAL_PHASES: [&str; 2] = ["Succeeded", "Failed"];

/// Pods in a terminal phase, plus any pod annotated `cleanup-finished`.
pub fn is_candidate(pod: &Pod) -> bool {
    let terminal = pod
        .status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .map(|phase| TERMINAL_PHASES.contains(&phase))
        .unwrap_or(false);

    terminal || pod.annotations().contains_key(FINISHED_OPT_IN_ANNOTATION)
}

pub fn classify_pod(pod: &Pod, now: DateTime<Utc>, policy: &PolicyConfig) -> Outcome {
    if is_terminating(pod) {
        return Outcome::Skipped(SkipReason::Terminating);
    }
    if !is_candidate(pod) {
        return Outcome::Skipped(SkipReason::NotStopped);
    }

    let statuses = pod
        .status
        .as_ref()
        .and_then(|s| s.container_statuses.as_deref());

    match time_since_stopped(statuses, now) {
        TerminationAge::MissingStatuses => Outcome::Skipped(SkipReason::MissingContainerStatuses),
        TerminationAge::Undetermined => Outcome::Skipped(SkipReason::NoTerminatedContainer),
        TerminationAge::Stopped(age) => Outcome::Decided(Decision {
            kind: ObjectKind::Pod,
            target: ObjectIdentity::of(pod),
            age,
            reason: Reason::PodFinishedTooLong,
            deletable: age > policy.finished_retention(),
        }),
    }
}
