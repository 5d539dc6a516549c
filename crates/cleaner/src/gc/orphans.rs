//! Orphaned pod detection.
//!
//! Pods are joined to jobs through the `controller-uid` label, not owner references.
//! A job-managed pod whose label names a job that no longer exists is an orphan and is
//! deleted regardless of age.

use chrono::{DateTime, Duration, Utc};
use k8s_openapi::api::{batch::v1::Job, core::v1::Pod};
use kube::ResourceExt;
use std::collections::HashSet;

use crate::{
    gc::decision::{Decision, ObjectKind, Outcome, Reason, SkipReason},
    kubernetes::{
        resources::{is_terminating, parent_uid},
        ObjectIdentity,
    },
};

pub fn current_job_uids(jobs: &[Job]) -> HashSet<String> {
    jobs.iter().filter_map(|job| job.uid()).collect()
}

pub fn classify_orphan(pod: &Pod, job_uids: &HashSet<String>, now: DateTime<Utc>) -> Option<Outcome> {
    if is_terminating(pod) {
        return Some(Outcome::Skipped(SkipReason::Terminating));
    }
    let Some(parent) = parent_uid(pod) else {
        return Some(Outcome::Skipped(SkipReason::MissingParentLabel));
    };
    if job_uids.contains(parent) {
        return None;
    }

    // Age is informational only.
    let age = pod
        .creation_timestamp()
        .map(|created| now - created.0)
        .unwrap_or_else(Duration::zero);

    Some(Outcome::Decided(Decision {
        kind: ObjectKind::Pod,
        target: ObjectIdentity::of(pod),
        age,
        reason: Reason::Orphaned,
        deletable: true,
    }))
}

/// Orphan decisions for every pod whose parent job is absent from `job_uids`.
pub fn detect_orphans(pods: &[Pod], job_uids: &HashSet<String>, now: DateTime<Utc>) -> Vec<Decision> {
    pods.iter()
        .filter_map(|pod| match classify_orphan(pod, job_uids, now) {
            Some(Outcome::Decided(decision)) => Some(decision),
            _ => None,
        })
        .collect()
}
