use kube::ResourceExt;
use tracing::info;

use super::RulesOutcome;
use crate::crd::{Condition, ConditionStatus, Sidecar, CONDITION_RECONCILED};
use crate::k8s::ClusterClient;
use crate::Error;

/// The condition recorded after every fully successful pass.
pub fn reconciled_condition(outcome: &RulesOutcome) -> Condition {
    Condition::new(
        CONDITION_RECONCILED,
        ConditionStatus::True,
        CONDITION_RECONCILED,
        format!(
            "Processed {} across {}",
            counted(outcome.rules, "delete rule"),
            counted(outcome.namespaces, "namespace")
        ),
    )
}

fn counted(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Append a `Reconciled` condition to the sidecar's existing ones and persist the status.
///
/// Conditions accumulate; earlier ones are never replaced or deduplicated.
pub async fn report_outcome(
    client: &dyn ClusterClient,
    sidecar: &Sidecar,
    outcome: &RulesOutcome,
) -> Result<Condition, Error> {
    let condition = reconciled_condition(outcome);

    let mut status = sidecar.status.clone().unwrap_or_default();
    status.conditions.push(condition.clone());

    client.update_sidecar_status(sidecar, &status).await?;
    info!(
        sidecar = %sidecar.name_any(),
        conditions = status.conditions.len(),
        "{}",
        condition.message
    );

    Ok(condition)
}
