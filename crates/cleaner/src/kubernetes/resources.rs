use k8s_openapi::api::core::v1::Pod;
use kube::{Resource, ResourceExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Job annotation overriding the running-job timeout, in seconds.
pub const TIMEOUT_OVERRIDE_ANNOTATION: &str = "cleanup-timeout";

/// Pod annotation opting a pod into finished-pod cleanup regardless of phase.
pub const FINISHED_OPT_IN_ANNOTATION: &str = "cleanup-finished";

/// Label carrying the UID of the job that created the pod.
pub const CONTROLLER_UID_LABEL: &str = "controller-uid";

/// Prefixed form of [`CONTROLLER_UID_LABEL`] set by Kubernetes 1.27+.
pub const BATCH_CONTROLLER_UID_LABEL: &str = "batch.kubernetes.io/controller-uid";

/// Marker label present on every pod created by a job.
pub const JOB_NAME_LABEL: &str = "job-name";

/// Prefixed form of [`JOB_NAME_LABEL`] set by Kubernetes 1.27+.
pub const BATCH_JOB_NAME_LABEL: &str = "batch.kubernetes.io/job-name";

/// Selectors matching job-managed pods. Label selectors cannot OR across keys, so the
/// legacy and prefixed markers are queried separately.
pub const JOB_MARKER_SELECTORS: [&str; 2] = [JOB_NAME_LABEL, BATCH_JOB_NAME_LABEL];

/// Identity of a namespaced object, enough to address it for deletion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectIdentity {
    pub name: String,
    pub namespace: Option<String>,
    pub uid: Option<String>,
}

impl ObjectIdentity {
    pub fn of<K: Resource>(obj: &K) -> Self {
        Self {
            name: obj.name_any(),
            namespace: obj.namespace(),
            uid: obj.uid(),
        }
    }
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// UID of the job that owns this pod, read from its correlation label.
pub fn parent_uid(pod: &Pod) -> Option<&str> {
    let labels = pod.labels();
    labels
        .get(CONTROLLER_UID_LABEL)
        .or_else(|| labels.get(BATCH_CONTROLLER_UID_LABEL))
        .map(String::as_str)
}

/// Label selectors matching every pod created by the job with `uid`, one per label form.
pub fn owned_pods_selectors(uid: &str) -> [String; 2] {
    [
        format!("{}={}", CONTROLLER_UID_LABEL, uid),
        format!("{}={}", BATCH_CONTROLLER_UID_LABEL, uid),
    ]
}

/// Concatenates pod lists from several selectors, keeping the first copy of each pod.
pub fn merge_unique(pods: impl IntoIterator<Item = Pod>) -> Vec<Pod> {
    let mut seen = HashSet::new();
    pods.into_iter()
        .filter(|pod| seen.insert(ObjectIdentity::of(pod)))
        .collect()
}

/// Objects with a deletion timestamp are already being torn down.
pub fn is_terminating<K: Resource>(obj: &K) -> bool {
    obj.meta().deletion_timestamp.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pod(labels: serde_json::Value) -> Pod {
        serde_json::from_value(json!({
            "metadata": { "name": "worker-abc", "namespace": "batch", "uid": "pod-1", "labels": labels }
        }))
        .unwrap()
    }

    #[test]
    fn test_identity_display() {
        let p = pod(json!({}));
        let id = ObjectIdentity::of(&p);
        assert_eq!(id.to_string(), "batch/worker-abc");
        assert_eq!(id.uid.as_deref(), Some("pod-1"));
    }

    #[test]
    fn test_parent_uid_prefers_legacy_label() {
        let p = pod(json!({ "controller-uid": "legacy", "batch.kubernetes.io/controller-uid": "prefixed" }));
        assert_eq!(parent_uid(&p), Some("legacy"));
    }

    #[test]
    fn test_parent_uid_falls_back_to_prefixed_label() {
        let p = pod(json!({ "batch.kubernetes.io/controller-uid": "prefixed" }));
        assert_eq!(parent_uid(&p), Some("prefixed"));
        assert_eq!(parent_uid(&pod(json!({}))), None);
    }

    #[test]
    fn test_owned_pods_selectors_cover_both_label_forms() {
        assert_eq!(
            owned_pods_selectors("1234"),
            [
                "controller-uid=1234".to_string(),
                "batch.kubernetes.io/controller-uid=1234".to_string(),
            ]
        );
    }

    #[test]
    fn test_merge_unique_drops_duplicates() {
        let both = pod(json!({ "controller-uid": "j", "batch.kubernetes.io/controller-uid": "j" }));
        let other: Pod = serde_json::from_value(json!({
            "metadata": { "name": "worker-def", "namespace": "batch", "uid": "pod-2" }
        }))
        .unwrap();
        let merged = merge_unique(vec![both.clone(), other, both]);
        let names: Vec<_> = merged.iter().map(|p| p.name_any()).collect();
        assert_eq!(names, vec!["worker-abc", "worker-def"]);
    }
}
