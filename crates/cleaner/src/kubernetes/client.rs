use async_trait::async_trait;
use k8s_openapi::{
    api::{batch::v1::Job, core::v1::Pod},
    NamespaceResourceScope,
};
use kube::{
    api::{Api, DeleteParams, ListParams, Preconditions},
    Client, Resource,
};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

use crate::{kubernetes::ObjectIdentity, Error, Result};

const PAGE_SIZE: u32 = 500;

/// The slice of the Kubernetes API the cleaner needs. Lists span all namespaces.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_jobs(&self) -> Result<Vec<Job>>;
    async fn list_pods(&self) -> Result<Vec<Pod>>;
    async fn list_pods_by_label(&self, selector: &str) -> Result<Vec<Pod>>;
    /// Deleting an object that no longer exists succeeds.
    async fn delete_job(&self, job: &ObjectIdentity) -> Result<()>;
    async fn delete_pod(&self, pod: &ObjectIdentity) -> Result<()>;
}

pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    /// Connects with the in-cluster service account, or the local kubeconfig when
    /// running outside a cluster.
    pub async fn new() -> Result<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| Error::Kubernetes(format!("Failed to create client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn list_all<K>(&self, selector: Option<&str>) -> Result<Vec<K>>
    where
        K: Resource + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::all(self.client.clone());
        let mut params = ListParams::default().limit(PAGE_SIZE);
        if let Some(selector) = selector {
            params = params.labels(selector);
        }

        let mut items = Vec::new();
        loop {
            let page = api.list(&params).await.map_err(|e| {
                Error::Kubernetes(format!("Failed to list {}: {}", K::plural(&Default::default()), e))
            })?;
            let next = page.metadata.continue_;
            items.extend(page.items);

            match next {
                Some(token) if !token.is_empty() => params = params.continue_token(&token),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn delete_one<K>(&self, target: &ObjectIdentity) -> Result<()>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = match &target.namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::default_namespaced(self.client.clone()),
        };

        // Pin the UID so a recreated object with the same name survives.
        let mut params = DeleteParams::default();
        if let Some(uid) = &target.uid {
            params.preconditions = Some(Preconditions {
                uid: Some(uid.clone()),
                resource_version: None,
            });
        }

        match api.delete(&target.name, &params).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(resp)) if resp.code == 404 || resp.code == 409 => {
                debug!("{} {} already gone ({})", K::kind(&Default::default()), target, resp.reason);
                Ok(())
            }
            Err(e) => Err(Error::Kubernetes(format!(
                "Failed to delete {} {}: {}",
                K::kind(&Default::default()),
                target,
                e
            ))),
        }
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn list_jobs(&self) -> Result<Vec<Job>> {
        self.list_all::<Job>(None).await
    }

    async fn list_pods(&self) -> Result<Vec<Pod>> {
        self.list_all::<Pod>(None).await
    }

    async fn list_pods_by_label(&self, selector: &str) -> Result<Vec<Pod>> {
        self.list_all::<Pod>(Some(selector)).await
    }

    async fn delete_job(&self, job: &ObjectIdentity) -> Result<()> {
        self.delete_one::<Job>(job).await
    }

    async fn delete_pod(&self, pod: &ObjectIdentity) -> Result<()> {
        self.delete_one::<Pod>(pod).await
    }
}
