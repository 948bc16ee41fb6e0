use tracing::{debug, info};

use super::{cull_pods, report_outcome, resolve_namespaces, PodSelector};
use crate::crd::DeleteRule;
use crate::k8s::ClusterClient;
use crate::Error;

/// Totals for one pass over a sidecar's delete rules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RulesOutcome {
    pub rules: usize,
    /// Resolved namespaces summed over all rules. A namespace hit by two rules counts twice.
    pub namespaces: usize,
    pub pods_deleted: usize,
}

/// Apply `rules` in declared order.
///
/// Each rule resolves its namespaces, builds its selector, then culls every namespace
/// in turn. Any error stops the pass immediately.
pub async fn run_delete_rules(
    client: &dyn ClusterClient,
    rules: &[DeleteRule],
) -> Result<RulesOutcome, Error> {
    let mut outcome = RulesOutcome::default();

    for (index, rule) in rules.iter().enumerate() {
        let namespaces = resolve_namespaces(client, &rule.namespace).await?;
        let selector = PodSelector::from_labels(&rule.labels)?;
        debug!(
            rule = index,
            namespace = %rule.namespace,
            resolved = namespaces.len(),
            %selector,
            "Evaluating delete rule"
        );

        for namespace in &namespaces {
            outcome.pods_deleted += cull_pods(client, namespace, &selector).await?;
        }

        outcome.rules += 1;
        outcome.namespaces += namespaces.len();
    }

    Ok(outcome)
}

/// One full reconcile of the sidecar identified by `namespace`/`name`.
///
/// Returns `Ok(None)` when the sidecar no longer exists. Status is only written after
/// every rule succeeded.
pub async fn reconcile_sidecar(
    client: &dyn ClusterClient,
    namespace: &str,
    name: &str,
) -> Result<Option<RulesOutcome>, Error> {
    let Some(sidecar) = client.get_sidecar(namespace, name).await? else {
        debug!("Sidecar is gone, nothing to do");
        return Ok(None);
    };

    let outcome = run_delete_rules(client, &sidecar.spec.delete_rules).await?;
    info!(
        rules = outcome.rules,
        namespaces = outcome.namespaces,
        pods_deleted = outcome.pods_deleted,
        "Applied delete rules"
    );

    report_outcome(client, &sidecar, &outcome).await?;
    Ok(Some(outcome))
}
