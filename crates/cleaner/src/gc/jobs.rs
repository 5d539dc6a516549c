use chrono::{DateTime, Utc};
use k8s_openapi::api::batch::v1::{Job, JobStatus};
use kube::ResourceExt;

use crate::{
    config::PolicyConfig,
    gc::{
        decision::{Decision, ObjectKind, Outcome, Reason, SkipReason},
        policy::RunningTimeout,
    },
    kubernetes::{resources::is_terminating, ObjectIdentity},
    Error, Result,
};

/// A job is finished once it reports a success or failure and a completion time.
/// A job with a result but no completion time is still treated as running.
pub fn is_finished(status: &JobStatus) -> bool {
    let has_result = status.succeeded.unwrap_or(0) > 0 || status.failed.unwrap_or(0) > 0;
    has_result && status.completion_time.is_some()
}

/// Decide whether `job` should be deleted at `now`.
///
/// Returns an error only for a malformed `cleanup-timeout` override; the caller reports
/// it and moves on to the next job.
pub fn classify_job(job: &Job, now: DateTime<Utc>, policy: &PolicyConfig) -> Result<Outcome> {
    if is_terminating(job) {
        return Ok(Outcome::Skipped(SkipReason::Terminating));
    }

    let no_status = JobStatus::default();
    let status = job.status.as_ref().unwrap_or(&no_status);
    let target = ObjectIdentity::of(job);

    if is_finished(status) {
        if let Some(completed) = &status.completion_time {
            let age = now - completed.0;
            return Ok(Outcome::Decided(Decision {
                kind: ObjectKind::Job,
                target,
                age,
                reason: Reason::FinishedTooLong,
                deletable: age > policy.finished_retention(),
            }));
        }
    }

    let Some(started) = &status.start_time else {
        return Ok(Outcome::Skipped(SkipReason::MissingStartTime));
    };
    let age = now - started.0;

    let timeout = policy
        .resolve_running_timeout(job.annotations())
        .map_err(|e| Error::InvalidTimeoutOverride {
            job: target.to_string(),
            value: e.value,
            reason: e.reason,
        })?;

    match timeout {
        RunningTimeout::Never => Ok(Outcome::Skipped(SkipReason::NoRunningTimeout)),
        RunningTimeout::After(limit) => Ok(Outcome::Decided(Decision {
            kind: ObjectKind::Job,
            target,
            age,
            reason: Reason::RanTooLong,
            deletable: age > limit,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    fn ago(seconds: i64) -> String {
        (now() - Duration::seconds(seconds))
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string()
    }

    fn job(status: serde_json::Value, annotations: serde_json::Value) -> Job {
        serde_json::from_value(json!({
            "metadata": {
                "name": "report",
                "namespace": "analytics",
                "uid": "job-uid-1",
                "annotations": annotations,
            },
            "status": status,
        }))
        .unwrap()
    }

    fn policy(timeout_finished_seconds: i64, timeout_all_seconds: i64) -> PolicyConfig {
        PolicyConfig {
            timeout_finished_seconds,
            timeout_all_seconds,
            dry_run: false,
        }
    }

    fn decided(outcome: Outcome) -> Decision {
        match outcome {
            Outcome::Decided(d) => d,
            other => panic!("expected a decision, got {:?}", other),
        }
    }

    #[test]
    fn test_finished_job_past_retention_is_deleted() {
        let j = job(json!({ "succeeded": 1, "startTime": ago(5000), "completionTime": ago(4000) }), json!({}));
        let d = decided(classify_job(&j, now(), &policy(3600, -1)).unwrap());
        assert!(d.deletable);
        assert_eq!(d.reason, Reason::FinishedTooLong);
        assert_eq!(d.age_seconds(), 4000);
        assert_eq!(d.target.to_string(), "analytics/report");
    }

    #[test]
    fn test_finished_job_within_retention_is_kept() {
        let j = job(json!({ "failed": 1, "startTime": ago(5000), "completionTime": ago(3600) }), json!({}));
        let d = decided(classify_job(&j, now(), &policy(3600, -1)).unwrap());
        assert!(!d.deletable);
        assert_eq!(d.reason, Reason::FinishedTooLong);
    }

    #[test]
    fn test_finished_age_is_measured_from_completion_not_start() {
        let j = job(json!({ "succeeded": 1, "startTime": ago(99_999), "completionTime": ago(10) }), json!({}));
        let d = decided(classify_job(&j, now(), &policy(3600, 60)).unwrap());
        assert!(!d.deletable);
        assert_eq!(d.age_seconds(), 10);
    }

    #[test]
    fn test_running_job_without_timeout_is_skipped() {
        let j = job(json!({ "active": 1, "startTime": ago(100_000) }), json!({}));
        assert_eq!(
            classify_job(&j, now(), &policy(3600, -1)).unwrap(),
            Outcome::Skipped(SkipReason::NoRunningTimeout)
        );
    }

    #[test]
    fn test_running_job_past_global_timeout_is_deleted() {
        let j = job(json!({ "active": 1, "startTime": ago(700) }), json!({}));
        let d = decided(classify_job(&j, now(), &policy(3600, 600)).unwrap());
        assert!(d.deletable);
        assert_eq!(d.reason, Reason::RanTooLong);

        let young = job(json!({ "active": 1, "startTime": ago(600) }), json!({}));
        assert!(!classify_job(&young, now(), &policy(3600, 600)).unwrap().is_deletable());
    }

    #[test]
    fn test_override_shorter_than_default() {
        let j = job(json!({ "active": 1, "startTime": ago(200) }), json!({ "cleanup-timeout": "120" }));
        let d = decided(classify_job(&j, now(), &policy(3600, 3600)).unwrap());
        assert!(d.deletable);
        assert_eq!(d.age_seconds(), 200);

        let without = job(json!({ "active": 1, "startTime": ago(200) }), json!({}));
        assert!(!classify_job(&without, now(), &policy(3600, 3600)).unwrap().is_deletable());
    }

    #[test]
    fn test_malformed_override_is_reported() {
        let j = job(json!({ "active": 1, "startTime": ago(200) }), json!({ "cleanup-timeout": "soon" }));
        let err = classify_job(&j, now(), &policy(3600, 60)).unwrap_err();
        match err {
            Error::InvalidTimeoutOverride { job, value, .. } => {
                assert_eq!(job, "analytics/report");
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_override_is_reported() {
        let j = job(
            json!({ "active": 1, "startTime": ago(200) }),
            json!({ "cleanup-timeout": "9223372036854775807" }),
        );
        let err = classify_job(&j, now(), &policy(3600, 60)).unwrap_err();
        assert!(matches!(err, Error::InvalidTimeoutOverride { .. }));
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_finished_without_completion_time_counts_as_running() {
        let j = job(json!({ "failed": 1, "startTime": ago(500) }), json!({}));
        let d = decided(classify_job(&j, now(), &policy(3600, 300)).unwrap());
        assert_eq!(d.reason, Reason::RanTooLong);
        assert!(d.deletable);
    }

    #[test]
    fn test_missing_start_time_is_skipped() {
        let j = job(json!({ "active": 1 }), json!({ "cleanup-timeout": "1" }));
        assert_eq!(
            classify_job(&j, now(), &policy(3600, 0)).unwrap(),
            Outcome::Skipped(SkipReason::MissingStartTime)
        );

        let no_status: Job = serde_json::from_value(json!({ "metadata": { "name": "fresh" } })).unwrap();
        assert_eq!(
            classify_job(&no_status, now(), &policy(3600, 0)).unwrap(),
            Outcome::Skipped(SkipReason::MissingStartTime)
        );
    }

    #[test]
    fn test_terminating_job_is_skipped() {
        let j: Job = serde_json::from_value(json!({
            "metadata": { "name": "going", "deletionTimestamp": ago(1) },
            "status": { "succeeded": 1, "completionTime": ago(99_999) },
        }))
        .unwrap();
        assert_eq!(
            classify_job(&j, now(), &policy(3600, -1)).unwrap(),
            Outcome::Skipped(SkipReason::Terminating)
        );
    }
}
