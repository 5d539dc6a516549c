//! One garbage-collection pass over the cluster.
//!
//! Order matters: jobs first (cascading to their pods), then stopped pods, then a fresh
//! job listing to find pods whose parent is gone. Scheduling repeated sweeps is the
//! caller's business.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    clock::Clock,
    config::PolicyConfig,
    gc::{
        decision::{Decision, ObjectKind, Outcome, SkipReason},
        executor::GcExecutor,
        jobs::classify_job,
        orphans::{current_job_uids, detect_orphans},
        pods::classify_pod,
    },
    kubernetes::{
        resources::{merge_unique, JOB_MARKER_SELECTORS},
        ClusterApi, ObjectIdentity,
    },
    metrics, Error, Result,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deletion {
    pub kind: ObjectKind,
    pub target: ObjectIdentity,
}

/// A per-object failure that was reported and skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectError {
    pub kind: ObjectKind,
    pub target: ObjectIdentity,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub now: DateTime<Utc>,
    pub dry_run: bool,
    /// Every decision reached, including the ones that keep their object.
    pub decisions: Vec<Decision>,
    /// Deletions issued, or that would have been issued in dry-run mode.
    pub deleted: Vec<Deletion>,
    /// Stopped pods skipped for lack of container statuses.
    pub warnings: Vec<ObjectIdentity>,
    pub errors: Vec<ObjectError>,
}

impl SweepReport {
    pub fn new(now: DateTime<Utc>, dry_run: bool) -> Self {
        Self {
            now,
            dry_run,
            decisions: Vec::new(),
            deleted: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn deletable(&self) -> impl Iterator<Item = &Decision> {
        self.decisions.iter().filter(|d| d.deletable)
    }

    /// Whether `target` was already deleted earlier in this sweep.
    pub fn was_deleted(&self, target: &ObjectIdentity) -> bool {
        self.deleted.iter().any(|d| &d.target == target)
    }
}

pub struct Sweeper {
    api: Arc<dyn ClusterApi>,
    clock: Arc<dyn Clock>,
    policy: PolicyConfig,
    executor: GcExecutor,
}

impl Sweeper {
    pub fn new(api: Arc<dyn ClusterApi>, clock: Arc<dyn Clock>, policy: PolicyConfig) -> Self {
        let executor = GcExecutor::new(api.clone(), policy.dry_run);
        Self {
            api,
            clock,
            policy,
            executor,
        }
    }

    /// Runs a full sweep. Only a failure to list objects aborts it.
    pub async fn run_once(&self) -> Result<SweepReport> {
        let now = self.clock.now();
        let mut report = SweepReport::new(now, self.policy.dry_run);

        self.sweep_jobs(now, &mut report).await?;
        self.sweep_stopped_pods(now, &mut report).await?;
        self.sweep_orphans(now, &mut report).await?;

        metrics::SWEEPS_TOTAL.inc();
        metrics::LAST_SWEEP_TIMESTAMP.set(now.timestamp());
        info!(
            deletions = report.deleted.len(),
            errors = report.errors.len(),
            dry_run = report.dry_run,
            "Finished"
        );
        Ok(report)
    }

    async fn sweep_jobs(&self, now: DateTime<Utc>, report: &mut SweepReport) -> Result<()> {
        let jobs = self.api.list_jobs().await?;

        for job in &jobs {
            match classify_job(job, now, &self.policy) {
                Ok(Outcome::Decided(decision)) => self.apply(decision, report).await,
                Ok(Outcome::Skipped(_)) => {}
                Err(e @ Error::InvalidTimeoutOverride { .. }) => {
                    error!("Skipping job: {}", e);
                    metrics::record_error("override");
                    report.errors.push(ObjectError {
                        kind: ObjectKind::Job,
                        target: ObjectIdentity::of(job),
                        message: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn sweep_stopped_pods(&self, now: DateTime<Utc>, report: &mut SweepReport) -> Result<()> {
        let pods = self.api.list_pods().await?;

        for pod in &pods {
            // In dry-run mode cascaded pods are still listed.
            if report.was_deleted(&ObjectIdentity::of(pod)) {
                continue;
            }
            match classify_pod(pod, now, &self.policy) {
                Outcome::Decided(decision) => self.apply(decision, report).await,
                Outcome::Skipped(SkipReason::MissingContainerStatuses) => {
                    let target = ObjectIdentity::of(pod);
                    warn!("Skipping pod without container statuses ({})", target);
                    report.warnings.push(target);
                }
                Outcome::Skipped(_) => {}
            }
        }
        Ok(())
    }

    async fn sweep_orphans(&self, now: DateTime<Utc>, report: &mut SweepReport) -> Result<()> {
        // Re-list so jobs deleted earlier in this sweep count as gone.
        let mut job_uids = current_job_uids(&self.api.list_jobs().await?);
        for deletion in report.deleted.iter().filter(|d| d.kind == ObjectKind::Job) {
            if let Some(uid) = &deletion.target.uid {
                job_uids.remove(uid);
            }
        }

        let mut listed = Vec::new();
        for selector in JOB_MARKER_SELECTORS {
            listed.extend(self.api.list_pods_by_label(selector).await?);
        }
        let pods: Vec<_> = merge_unique(listed)
            .into_iter()
            .filter(|pod| !report.was_deleted(&ObjectIdentity::of(pod)))
            .collect();

        for decision in detect_orphans(&pods, &job_uids, now) {
            self.apply(decision, report).await;
        }
        Ok(())
    }

    async fn apply(&self, decision: Decision, report: &mut SweepReport) {
        self.executor.execute(&decision, report).await;
        report.decisions.push(decision);
    }
}
