//! Controller for the top-level Gateway API pass
//!
//! Keyed on the shared ClusterOperator, so every Gateway API CRD event,
//! deletions included, collapses onto one pass that refreshes the status
//! extension and starts the GatewayClass controller.

use futures::StreamExt;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{
    runtime::{
        controller::{Action, Controller},
        reflector::ObjectRef,
        watcher::Config as WatcherConfig,
    },
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::controllers::{requeue_for, Context};
use crate::crd::ClusterOperator;
use crate::metrics::prometheus::{RECONCILE_DURATION, RECONCILIATIONS, RECONCILIATION_ERRORS};
use crate::reconcilers::gatewayapi::{self, is_gateway_api_group};
use crate::Error;

const RESYNC_INTERVAL: Duration = Duration::from_secs(300);

/// Run the Gateway API controller
pub async fn run(client: Client, ctx: Arc<Context>) {
    let cluster_operator_name = ctx.config.cluster_operator_name.clone();
    let selector = format!("metadata.name={}", cluster_operator_name);
    let cluster_operators: Api<ClusterOperator> = Api::all(client.clone());
    let crds: Api<CustomResourceDefinition> = Api::all(client);

    info!("Starting Gateway API controller");

    // One pass up front so the GatewayClass controller starts even while the
    // ClusterOperator is missing
    if let Err(e) = gatewayapi::reconcile(&ctx, &ctx.shutdown).await {
        warn!("Initial Gateway API pass failed: {}", e);
    }

    Controller::new(cluster_operators, WatcherConfig::default().fields(&selector))
        .watches(crds, WatcherConfig::default().any_semantic(), move |crd| {
            crd_trigger(&crd, &cluster_operator_name)
        })
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok(o) => debug!("Reconciled {:?}", o),
                Err(e) => error!("Reconcile failed: {:?}", e),
            }
        })
        .await;

    info!("Gateway API controller stopped");
}

/// Map a CRD event onto the ClusterOperator pass; other groups are ignored
///
/// The mapper sees deleted objects too, so removing a CRD refreshes the status.
pub fn crd_trigger(
    crd: &CustomResourceDefinition,
    cluster_operator_name: &str,
) -> Option<ObjectRef<ClusterOperator>> {
    is_gateway_api_group(&crd.spec.group).then(|| ObjectRef::new(cluster_operator_name))
}

#[instrument(skip(cluster_operator, ctx), fields(name = %cluster_operator.name_any()))]
async fn reconcile(cluster_operator: Arc<ClusterOperator>, ctx: Arc<Context>) -> Result<Action, Error> {
    let start = std::time::Instant::now();
    RECONCILIATIONS.with_label_values(&["GatewayAPI"]).inc();

    let cancel = ctx.shutdown.child_token();
    let result = gatewayapi::reconcile(&ctx, &cancel).await;

    let duration = start.elapsed().as_secs_f64();
    RECONCILE_DURATION
        .with_label_values(&["GatewayAPI"])
        .observe(duration);

    match &result {
        Ok(outcome) => info!(
            "Gateway API pass finished in {:.2}s ({} unmanaged CRDs, status changed: {}, controller started: {})",
            duration,
            outcome.unmanaged_crd_names.len(),
            outcome.status_changed,
            outcome.controller_started
        ),
        Err(e) => {
            RECONCILIATION_ERRORS
                .with_label_values(&["GatewayAPI"])
                .inc();
            error!("Gateway API pass failed: {}", e);
        }
    }

    result.map(|_| Action::requeue(RESYNC_INTERVAL))
}

fn error_policy(cluster_operator: Arc<ClusterOperator>, err: &Error, _ctx: Arc<Context>) -> Action {
    error!(
        "Gateway API pass error for cluster operator {}: {:?}",
        cluster_operator.name_any(),
        err
    );
    requeue_for(err)
}
