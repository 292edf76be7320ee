//! Controller for the marker GatewayClass

use futures::StreamExt;
use kube::{
    runtime::{
        controller::{Action, Controller},
        watcher::Config as WatcherConfig,
    },
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};

use crate::controllers::{requeue_for, Context};
use crate::crd::{GatewayClass, ServiceMeshControlPlane, Subscription};
use crate::metrics::prometheus::{RECONCILE_DURATION, RECONCILIATIONS, RECONCILIATION_ERRORS};
use crate::reconcilers::gatewayclass::{self, ReconcileRequest};
use crate::Error;

/// Periodic resync for the level-triggered pass
const RESYNC_INTERVAL: Duration = Duration::from_secs(300);

/// Run the GatewayClass controller
///
/// Only the configured GatewayClass is watched; changes to the control plane
/// or subscription it owns requeue it.
///
/// Deleting the GatewayClass does not reach `reconcile`, the object is gone from
/// the store. Its dependents carry owner references to it, so the garbage
/// collector removes them instead.
pub async fn run(client: Client, ctx: Arc<Context>) {
    let selector = format!("metadata.name={}", ctx.config.gateway_class_name);
    let gateway_classes: Api<GatewayClass> = Api::all(client.clone());
    let control_planes: Api<ServiceMeshControlPlane> =
        Api::namespaced(client.clone(), &ctx.config.operand_namespace);
    let subscriptions: Api<Subscription> =
        Api::namespaced(client, &ctx.config.operator_namespace);

    info!(
        "Starting GatewayClass controller for {:?}",
        ctx.config.gateway_class_name
    );

    Controller::new(gateway_classes, WatcherConfig::default().fields(&selector))
        .owns(control_planes, WatcherConfig::default())
        .owns(subscriptions, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok(o) => info!("Reconciled {:?}", o),
                Err(e) => error!("Reconcile failed: {:?}", e),
            }
        })
        .await;

    info!("GatewayClass controller stopped");
}

/// Reconcile the marker GatewayClass
#[instrument(skip(gateway_class, ctx), fields(name = %gateway_class.name_any()))]
async fn reconcile(gateway_class: Arc<GatewayClass>, ctx: Arc<Context>) -> Result<Action, Error> {
    let start = std::time::Instant::now();
    let request = ReconcileRequest::new(gateway_class.name_any());

    RECONCILIATIONS.with_label_values(&["GatewayClass"]).inc();

    let cancel = ctx.shutdown.child_token();
    let result = gatewayclass::reconcile(&request, &ctx, &cancel).await;

    let duration = start.elapsed().as_secs_f64();
    RECONCILE_DURATION
        .with_label_values(&["GatewayClass"])
        .observe(duration);

    match &result {
        Ok(outcome) => info!(
            "Reconciled gatewayclass {} in {:.2}s ({} writes)",
            request.name,
            duration,
            outcome.writes()
        ),
        Err(e) => {
            RECONCILIATION_ERRORS
                .with_label_values(&["GatewayClass"])
                .inc();
            error!("Failed to reconcile gatewayclass {}: {}", request.name, e);
        }
    }

    result.map(|_| Action::requeue(RESYNC_INTERVAL))
}

fn error_policy(gateway_class: Arc<GatewayClass>, err: &Error, _ctx: Arc<Context>) -> Action {
    error!(
        "Reconciliation error for gatewayclass {}: {:?}",
        gateway_class.name_any(),
        err
    );
    requeue_for(err)
}
