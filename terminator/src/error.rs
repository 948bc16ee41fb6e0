//! Errors produced while reconciling a `Sidecar`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Reading from the cluster failed (namespace list, pod list, resource fetch).
    #[error("failed to {action}: {source}")]
    ClusterQuery {
        action: String,
        #[source]
        source: kube::Error,
    },

    /// A delete rule carries a label constraint that is not a valid requirement.
    #[error("invalid label requirement {key:?}={value:?}: {reason}")]
    SelectorConstruction {
        key: String,
        value: String,
        reason: String,
    },

    /// A pod delete call failed, including pods that vanished after listing.
    #[error("failed to delete pod {namespace}/{name}: {source}")]
    Deletion {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    /// Persisting the outcome condition failed after all deletions went through.
    #[error("failed to update status of sidecar {namespace}/{name}: {source}")]
    StatusUpdate {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    /// An object handed to the controller lacks a field it needs.
    #[error("object is missing {0}")]
    MissingMetadata(&'static str),
}

impl Error {
    pub fn cluster_query(action: impl Into<String>, source: kube::Error) -> Self {
        Self::ClusterQuery {
            action: action.into(),
            source,
        }
    }

    pub fn selector(key: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::SelectorConstruction {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Short machine-friendly name of the failure class, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ClusterQuery { .. } => "ClusterQuery",
            Error::SelectorConstruction { .. } => "SelectorConstruction",
            Error::Deletion { .. } => "Deletion",
            Error::StatusUpdate { .. } => "StatusUpdate",
            Error::MissingMetadata(_) => "MissingMetadata",
        }
    }
}
