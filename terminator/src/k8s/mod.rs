/// This module is responsible for interfacing with Kubernetes.
pub mod client;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{ClusterClient, KubeClusterClient};

#[cfg(test)]
pub use client::MockClusterClient;
