use tracing::debug;

use crate::crd::WILDCARD;
use crate::k8s::ClusterClient;
use crate::Error;

/// Expand a rule's namespace field into the namespaces to target.
///
/// A literal name is returned as is, without checking that it exists. The wildcard
/// is expanded from a fresh namespace listing on every call.
pub async fn resolve_namespaces(
    client: &dyn ClusterClient,
    target: &str,
) -> Result<Vec<String>, Error> {
    if target != WILDCARD {
        return Ok(vec![target.to_string()]);
    }

    let namespaces = client.list_namespaces().await?;
    debug!(count = namespaces.len(), "expanded wildcard namespace");
    Ok(namespaces)
}
