use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    gc::{
        decision::{Decision, ObjectKind},
        sweep::{Deletion, ObjectError, SweepReport},
    },
    kubernetes::{
        resources::{merge_unique, owned_pods_selectors},
        ClusterApi, ObjectIdentity,
    },
    metrics,
};

/// Applies delete decisions, or only logs them in dry-run mode.
///
/// Failures are recorded in the report and never abort the caller.
pub struct GcExecutor {
    api: Arc<dyn ClusterApi>,
    dry_run: bool,
}

impl GcExecutor {
    pub fn new(api: Arc<dyn ClusterApi>, dry_run: bool) -> Self {
        Self { api, dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub async fn execute(&self, decision: &Decision, report: &mut SweepReport) {
        if !decision.deletable {
            return;
        }

        info!("Deleting {}", decision);
        let kind = decision.reason.metric_label();
        match decision.kind {
            ObjectKind::Job => {
                if self.delete_job(&decision.target, kind, report).await {
                    self.delete_owned_pods(&decision.target, report).await;
                }
            }
            ObjectKind::Pod => {
                self.delete_pod(&decision.target, kind, report).await;
            }
        }
    }

    async fn delete_job(&self, target: &ObjectIdentity, kind: &str, report: &mut SweepReport) -> bool {
        if self.dry_run {
            debug!("** DRY RUN ** job {} left in place", target);
        } else if let Err(e) = self.api.delete_job(target).await {
            self.record_failure(ObjectKind::Job, target, e.to_string(), report);
            return false;
        }
        self.record_success(ObjectKind::Job, target, kind, report);
        true
    }

    async fn delete_pod(&self, target: &ObjectIdentity, kind: &str, report: &mut SweepReport) -> bool {
        if self.dry_run {
            debug!("** DRY RUN ** pod {} left in place", target);
        } else if let Err(e) = self.api.delete_pod(target).await {
            self.record_failure(ObjectKind::Pod, target, e.to_string(), report);
            return false;
        }
        self.record_success(ObjectKind::Pod, target, kind, report);
        true
    }

    /// Deleting a job through the API leaves its pods behind, so remove them explicitly.
    async fn delete_owned_pods(&self, job: &ObjectIdentity, report: &mut SweepReport) {
        let Some(uid) = &job.uid else {
            warn!("Job {} has no UID, its pods cannot be matched", job);
            return;
        };

        let mut listed = Vec::new();
        for selector in owned_pods_selectors(uid) {
            match self.api.list_pods_by_label(&selector).await {
                Ok(pods) => listed.extend(pods),
                Err(e) => {
                    self.record_failure(ObjectKind::Job, job, format!("listing pods: {}", e), report);
                    return;
                }
            }
        }
        let pods = merge_unique(listed);

        for pod in &pods {
            let target = ObjectIdentity::of(pod);
            info!("Deleting pod {} of job {}", target, job);
            self.delete_pod(&target, "cascade", report).await;
        }
    }

    fn record_success(&self, kind: ObjectKind, target: &ObjectIdentity, metric_kind: &str, report: &mut SweepReport) {
        metrics::record_deletion(metric_kind, self.dry_run);
        report.deleted.push(Deletion {
            kind,
            target: target.clone(),
        });
    }

    fn record_failure(&self, kind: ObjectKind, target: &ObjectIdentity, message: String, report: &mut SweepReport) {
        error!("Failed to delete {} {}: {}", kind, target, message);
        metrics::record_error("delete");
        report.errors.push(ObjectError {
            kind,
            target: target.clone(),
            message,
        });
    }
}
