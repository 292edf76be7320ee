//! Top-level Gateway API pass
//!
//! Reports Gateway API CRDs this operator does not manage, and starts the
//! GatewayClass controller once the feature is enabled.

use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::ResourceExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::controllers::Context;
use crate::crd::{GATEWAY_API_EXPERIMENTAL_GROUP, GATEWAY_API_GROUP};
use crate::reconcilers::status;
use crate::repository::cancellable;
use crate::Result;

/// Gateway API CRDs installed and owned by the operator
pub const MANAGED_GATEWAY_API_CRDS: [&str; 4] = [
    "gatewayclasses.gateway.networking.k8s.io",
    "gateways.gateway.networking.k8s.io",
    "httproutes.gateway.networking.k8s.io",
    "referencegrants.gateway.networking.k8s.io",
];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GatewayApiOutcome {
    pub unmanaged_crd_names: Vec<String>,
    pub status_changed: bool,
    /// Whether this pass started the GatewayClass controller
    pub controller_started: bool,
}

/// Whether `group` is one of the Gateway API groups
pub fn is_gateway_api_group(group: &str) -> bool {
    group == GATEWAY_API_GROUP || group == GATEWAY_API_EXPERIMENTAL_GROUP
}

/// Sorted names of Gateway API CRDs outside the managed set
pub fn unmanaged_gateway_api_crd_names(crds: &[CustomResourceDefinition]) -> Vec<String> {
    let mut names: Vec<String> = crds
        .iter()
        .filter(|crd| is_gateway_api_group(&crd.spec.group))
        .map(|crd| crd.name_any())
        .filter(|name| !MANAGED_GATEWAY_API_CRDS.contains(&name.as_str()))
        .collect();
    names.sort();
    names
}

/// Run one Gateway API pass
///
/// A failed status report does not hold back the GatewayClass controller: it is
/// still started, and the report error is returned afterwards. A cancelled pass
/// starts nothing.
pub async fn reconcile(ctx: &Arc<Context>, cancel: &CancellationToken) -> Result<GatewayApiOutcome> {
    let report = match report_unmanaged_crds(ctx, cancel).await {
        Err(e) if e.is_cancelled() => return Err(e),
        report => report,
    };
    if let Err(e) = &report {
        warn!("Gateway API status report failed: {}", e);
    }

    let mut controller_started = false;
    if ctx.config.gateway_api_controller_enabled {
        let launcher = Arc::clone(&ctx.launcher);
        let launch_ctx = Arc::clone(ctx);
        controller_started = ctx
            .gatewayclass_controller
            .ensure_started(|| async move { launcher.launch(launch_ctx).await })
            .await?;
    }

    let (unmanaged_crd_names, status_changed) = report?;
    Ok(GatewayApiOutcome {
        unmanaged_crd_names,
        status_changed,
        controller_started,
    })
}

/// List CRDs and publish the unmanaged Gateway API ones
async fn report_unmanaged_crds(
    ctx: &Context,
    cancel: &CancellationToken,
) -> Result<(Vec<String>, bool)> {
    let crds = cancellable(cancel, ctx.crds.list(&BTreeMap::new()))
        .await
        .map_err(|e| e.during("list customresourcedefinitions"))?;

    let unmanaged_crd_names = unmanaged_gateway_api_crd_names(&crds);
    debug!(unmanaged = ?unmanaged_crd_names, "Found unmanaged Gateway API CRDs");

    let status_changed =
        status::set_unmanaged_gateway_api_crd_names(ctx, &unmanaged_crd_names, cancel).await?;
    Ok((unmanaged_crd_names, status_changed))
}
