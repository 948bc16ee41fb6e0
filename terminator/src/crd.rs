//! The `Sidecar` custom resource.
//!
//! A `Sidecar` declares an ordered list of delete rules. The controller only reads
//! `.spec` and only ever writes the status subresource.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use kube::{CustomResource, CustomResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Value meaning "all" when used as a namespace, or as both key and value of a label.
pub const WILDCARD: &str = "*";

/// Condition type and reason recorded after a successful pass.
pub const CONDITION_RECONCILED: &str = "Reconciled";

#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "terminator.defenseunicorns.com",
    version = "v1alpha1",
    kind = "Sidecar",
    plural = "sidecars",
    namespaced,
    status = "SidecarStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct SidecarSpec {
    /// Rules evaluated strictly in this order.
    #[serde(default)]
    pub delete_rules: Vec<DeleteRule>,
}

/// Selects the pods to remove: a namespace (or `*`) plus equality label constraints.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct DeleteRule {
    /// A literal namespace name, or `*` for every namespace in the cluster.
    pub namespace: String,

    /// Required label values, ANDed together. Empty, or exactly `{"*": "*"}`, selects all pods.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl DeleteRule {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            labels: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct SidecarStatus {
    /// Accumulated outcome records, oldest first.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// Kubernetes-style status record.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
    #[serde(rename = "lastTransitionTime")]
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// Create a condition stamped with the current time.
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Utc::now(),
        }
    }
}

/// Render the CustomResourceDefinition as YAML, ready for `kubectl apply`.
pub fn crd_yaml() -> anyhow::Result<String> {
    Ok(serde_yaml::to_string(&Sidecar::crd())?)
}
