//! Controller wiring for `Sidecar` resources.
//!
//! A reconcile is triggered when a `Sidecar` spec changes or a pod it owns changes.
//! Status-only writes, including the condition appended by every pass, do not
//! trigger another reconcile. The kube runtime serializes reconciles per resource and bounds how many distinct
//! resources are reconciled at once.

use std::sync::Arc;

use anyhow::Context as _;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::runtime::controller::{Action, Config as ControllerConfig, Controller};
use kube::runtime::watcher::{watcher, Config as WatcherConfig};
use kube::runtime::{predicates, reflector, WatchStreamExt};
use kube::{Client, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

use crate::config::Config;
use crate::crd::Sidecar;
use crate::k8s::{ClusterClient, KubeClusterClient};
use crate::requeue::RequeuePolicy;
use crate::rules::reconcile_sidecar;
use crate::Error;

/// Shared state handed to every reconcile.
pub struct Context {
    pub client: Arc<dyn ClusterClient>,
    pub requeue: Arc<dyn RequeuePolicy>,
}

impl Context {
    pub fn new(client: Arc<dyn ClusterClient>, requeue: Arc<dyn RequeuePolicy>) -> Self {
        Self { client, requeue }
    }
}

fn object_key(sidecar: &Sidecar) -> String {
    format!(
        "{}/{}",
        sidecar.namespace().unwrap_or_default(),
        sidecar.name_any()
    )
}

/// Value the Sidecar watch is filtered on: a new value means a new reconcile.
///
/// `metadata.generation` only moves on spec changes, so the status write made at
/// the end of every pass is not seen as a change.
pub fn spec_trigger(sidecar: &Sidecar) -> Option<u64> {
    predicates::generation(sidecar)
}

/// Reconcile one `Sidecar`.
///
/// The object from the watch cache is only used for its identity; the rule engine
/// re-reads it from the API server.
#[instrument(skip(sidecar, ctx), fields(sidecar = %object_key(&sidecar)))]
pub async fn reconcile(sidecar: Arc<Sidecar>, ctx: Arc<Context>) -> Result<Action, Error> {
    let namespace = sidecar
        .namespace()
        .ok_or(Error::MissingMetadata("metadata.namespace"))?;
    let name = sidecar.name_any();
    info!("Reconciling Sidecar resource");

    reconcile_sidecar(ctx.client.as_ref(), &namespace, &name).await?;

    ctx.requeue.reset(&object_key(&sidecar));
    Ok(Action::await_change())
}

/// Log the failure and requeue after the delay chosen by the configured policy.
pub fn error_policy(sidecar: Arc<Sidecar>, error: &Error, ctx: Arc<Context>) -> Action {
    let key = object_key(&sidecar);
    let delay = ctx.requeue.on_error(&key, error);
    error!(
        ?error,
        kind = error.kind(),
        sidecar = %key,
        requeue_after = ?delay,
        "Reconciliation failed"
    );
    Action::requeue(delay)
}

/// Run the controller until a termination signal is received.
pub async fn run(client: Client, config: &Config) -> anyhow::Result<()> {
    let sidecars: Api<Sidecar> = match &config.watch_namespace {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    };
    let pods: Api<Pod> = Api::all(client.clone());

    sidecars
        .list(&ListParams::default().limit(1))
        .await
        .context("Sidecar resources cannot be listed, is the CRD installed?")?;

    let ctx = Arc::new(Context::new(
        Arc::new(KubeClusterClient::new(client, config.field_manager.clone())),
        Arc::new(config.requeue.backoff()),
    ));

    info!(
        namespace = config.watch_namespace.as_deref().unwrap_or("<all>"),
        concurrency = config.concurrency,
        "Starting Sidecar controller"
    );

    let (reader, writer) = reflector::store();
    let sidecar_changes = watcher(sidecars, WatcherConfig::default())
        .default_backoff()
        .reflect(writer)
        .applied_objects()
        .predicate_filter(spec_trigger);

    Controller::for_stream(sidecar_changes, reader)
        .owns(pods, WatcherConfig::default())
        .with_config(ControllerConfig::default().concurrency(config.concurrency))
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((object, action)) => {
                    debug!(sidecar = %object, ?action, "Reconciliation completed");
                }
                Err(e) => {
                    warn!(error = ?e, "Reconciliation error");
                }
            }
        })
        .await;

    info!("Sidecar controller stopped");
    Ok(())
}
