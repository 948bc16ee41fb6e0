use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Pod};
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::json;

#[cfg(test)]
use mockall::automock;

use crate::crd::{Sidecar, SidecarStatus};
use crate::rules::PodSelector;
use crate::Error;

/// The cluster operations the rule engine relies on.
///
/// Every call goes to the live API; nothing is cached between reconciles.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Fetch a `Sidecar` by identity. A resource that no longer exists yields `None`.
    async fn get_sidecar(&self, namespace: &str, name: &str) -> Result<Option<Sidecar>, Error>;

    /// Names of every namespace currently in the cluster, in listing order.
    async fn list_namespaces(&self) -> Result<Vec<String>, Error>;

    /// Pods in `namespace` matching `selector`, in listing order.
    async fn list_pods(&self, namespace: &str, selector: &PodSelector) -> Result<Vec<Pod>, Error>;

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), Error>;

    /// Write `status` to the status subresource of `sidecar`.
    async fn update_sidecar_status(
        &self,
        sidecar: &Sidecar,
        status: &SidecarStatus,
    ) -> Result<(), Error>;
}

/// Merge patch body for the status subresource.
///
/// Carrying the read resourceVersion makes the API server reject the write if
/// someone else updated the resource in between.
pub fn status_patch(sidecar: &Sidecar, status: &SidecarStatus) -> serde_json::Value {
    json!({
        "metadata": { "resourceVersion": sidecar.resource_version() },
        "status": status,
    })
}

/// [`ClusterClient`] backed by a real `kube::Client`.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
    field_manager: String,
}

impl KubeClusterClient {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get_sidecar(&self, namespace: &str, name: &str) -> Result<Option<Sidecar>, Error> {
        let api: Api<Sidecar> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .map_err(|e| Error::cluster_query(format!("get sidecar {namespace}/{name}"), e))
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, Error> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let namespaces = api
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::cluster_query("list namespaces", e))?;

        Ok(namespaces.items.iter().map(|ns| ns.name_any()).collect())
    }

    async fn list_pods(&self, namespace: &str, selector: &PodSelector) -> Result<Vec<Pod>, Error> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let mut list_params = ListParams::default();
        if let Some(query) = selector.to_query() {
            list_params = list_params.labels(&query);
        }

        let pods = api
            .list(&list_params)
            .await
            .map_err(|e| Error::cluster_query(format!("list pods in {namespace}"), e))?;

        Ok(pods.items)
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), Error> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default())
            .await
            .map_err(|source| Error::Deletion {
                namespace: namespace.to_string(),
                name: name.to_string(),
                source,
            })?;

        Ok(())
    }

    async fn update_sidecar_status(
        &self,
        sidecar: &Sidecar,
        status: &SidecarStatus,
    ) -> Result<(), Error> {
        let namespace = sidecar
            .namespace()
            .ok_or(Error::MissingMetadata("metadata.namespace"))?;
        let name = sidecar.name_any();
        let api: Api<Sidecar> = Api::namespaced(self.client.clone(), &namespace);

        let patch = status_patch(sidecar, status);

        let mut patch_params = PatchParams::default();
        patch_params.field_manager = Some(self.field_manager.clone());

        api.patch_status(&name, &patch_params, &Patch::Merge(&patch))
            .await
            .map_err(|source| Error::StatusUpdate {
                namespace: namespace.clone(),
                name: name.clone(),
                source,
            })?;

        Ok(())
    }
}
