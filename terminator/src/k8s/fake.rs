//! In-memory cluster used by the rule engine tests.

use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::ObjectMeta;
use kube::error::ErrorResponse;
use kube::ResourceExt;

use super::ClusterClient;
use crate::crd::{DeleteRule, Sidecar, SidecarSpec, SidecarStatus};
use crate::rules::PodSelector;
use crate::Error;

pub(crate) fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("fake {reason}"),
        reason: reason.to_string(),
        code,
    })
}

pub(crate) fn pod(namespace: &str, name: &str, labels: &[(&str, &str)]) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(
                labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub(crate) fn sidecar(namespace: &str, name: &str, rules: Vec<DeleteRule>) -> Sidecar {
    let mut sidecar = Sidecar::new(name, SidecarSpec { delete_rules: rules });
    sidecar.metadata.namespace = Some(namespace.to_string());
    sidecar
}

#[derive(Default)]
struct State {
    namespaces: Vec<String>,
    pods: Vec<Pod>,
    sidecar: Option<Sidecar>,
    deleted: Vec<(String, String)>,
    status_updates: Vec<SidecarStatus>,
    fail_namespace_list: bool,
    fail_pod_list: bool,
    fail_delete_of: Option<String>,
    fail_status_update: bool,
}

#[derive(Default)]
pub(crate) struct FakeCluster {
    state: Mutex<State>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(self, namespace: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .namespaces
            .push(namespace.to_string());
        self
    }

    pub fn with_pod(self, namespace: &str, name: &str, labels: &[(&str, &str)]) -> Self {
        self.state
            .lock()
            .unwrap()
            .pods
            .push(pod(namespace, name, labels));
        self
    }

    pub fn with_sidecar(self, sidecar: Sidecar) -> Self {
        self.state.lock().unwrap().sidecar = Some(sidecar);
        self
    }

    pub fn failing_namespace_list(self) -> Self {
        self.state.lock().unwrap().fail_namespace_list = true;
        self
    }

    pub fn failing_pod_list(self) -> Self {
        self.state.lock().unwrap().fail_pod_list = true;
        self
    }

    /// Fail the delete of the pod called `name` as if the API server rejected it.
    pub fn failing_delete_of(self, name: &str) -> Self {
        self.state.lock().unwrap().fail_delete_of = Some(name.to_string());
        self
    }

    pub fn failing_status_update(self) -> Self {
        self.state.lock().unwrap().fail_status_update = true;
        self
    }

    pub fn add_namespace(&self, namespace: &str) {
        self.state
            .lock()
            .unwrap()
            .namespaces
            .push(namespace.to_string());
    }

    pub fn remove_namespace(&self, namespace: &str) {
        self.state
            .lock()
            .unwrap()
            .namespaces
            .retain(|ns| ns != namespace);
    }

    pub fn remove_sidecar(&self) {
        self.state.lock().unwrap().sidecar = None;
    }

    /// `(namespace, name)` of every deleted pod, in deletion order.
    pub fn deleted(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn remaining_pods(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .pods
            .iter()
            .map(|p| p.name_any())
            .collect()
    }

    pub fn status_updates(&self) -> Vec<SidecarStatus> {
        self.state.lock().unwrap().status_updates.clone()
    }

    pub fn sidecar(&self) -> Option<Sidecar> {
        self.state.lock().unwrap().sidecar.clone()
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn get_sidecar(&self, namespace: &str, name: &str) -> Result<Option<Sidecar>, Error> {
        let state = self.state.lock().unwrap();
        Ok(state
            .sidecar
            .clone()
            .filter(|s| s.namespace().as_deref() == Some(namespace) && s.name_any() == name))
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, Error> {
        let state = self.state.lock().unwrap();
        if state.fail_namespace_list {
            return Err(Error::cluster_query(
                "list namespaces",
                api_error(403, "Forbidden"),
            ));
        }
        Ok(state.namespaces.clone())
    }

    async fn list_pods(&self, namespace: &str, selector: &PodSelector) -> Result<Vec<Pod>, Error> {
        let state = self.state.lock().unwrap();
        if state.fail_pod_list {
            return Err(Error::cluster_query(
                format!("list pods in {namespace}"),
                api_error(429, "TooManyRequests"),
            ));
        }
        Ok(state
            .pods
            .iter()
            .filter(|p| p.namespace().as_deref() == Some(namespace))
            .filter(|p| selector.matches(p.labels()))
            .cloned()
            .collect())
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        let deletion_error = |code, reason| Error::Deletion {
            namespace: namespace.to_string(),
            name: name.to_string(),
            source: api_error(code, reason),
        };

        if state.fail_delete_of.as_deref() == Some(name) {
            return Err(deletion_error(500, "InternalError"));
        }

        let position = state
            .pods
            .iter()
            .position(|p| p.namespace().as_deref() == Some(namespace) && p.name_any() == name)
            .ok_or_else(|| deletion_error(404, "NotFound"))?;
        state.pods.remove(position);
        state
            .deleted
            .push((namespace.to_string(), name.to_string()));
        Ok(())
    }

    async fn update_sidecar_status(
        &self,
        sidecar: &Sidecar,
        status: &SidecarStatus,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        if state.fail_status_update {
            return Err(Error::StatusUpdate {
                namespace: sidecar.namespace().unwrap_or_default(),
                name: sidecar.name_any(),
                source: api_error(409, "Conflict"),
            });
        }
        if let Some(stored) = state.sidecar.as_mut() {
            stored.status = Some(status.clone());
        }
        state.status_updates.push(status.clone());
        Ok(())
    }
}

