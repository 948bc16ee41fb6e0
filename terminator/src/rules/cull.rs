use kube::ResourceExt;
use tracing::{debug, info};

use super::PodSelector;
use crate::k8s::ClusterClient;
use crate::Error;

/// Delete every pod in `namespace` matched by `selector`, one at a time in listing
/// order. Returns how many pods were deleted.
///
/// The first failed delete, including a pod that disappeared after listing, stops the
/// remaining deletions and is returned as is.
pub async fn cull_pods(
    client: &dyn ClusterClient,
    namespace: &str,
    selector: &PodSelector,
) -> Result<usize, Error> {
    let pods = client.list_pods(namespace, selector).await?;
    debug!(namespace, %selector, count = pods.len(), "listed matching pods");

    for pod in &pods {
        let name = pod.name_any();
        info!(namespace, name = %name, "Deleting pod");
        client.delete_pod(namespace, &name).await?;
    }

    Ok(pods.len())
}
