//! Status reporting on the shared ClusterOperator
//!
//! Only `status.extension` is ours. The current object is read, cloned, the
//! clone's extension replaced, and the clone written back through the status
//! subresource, and only when the decoded extension actually differs.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::controllers::Context;
use crate::crd::{ClusterOperator, IngressOperatorStatusExtension};
use crate::metrics::STATUS_UPDATES;
use crate::repository::{cancellable, ensure_not_cancelled, ObjectRepository};
use crate::{Error, Result};

/// Publish the names of unmanaged Gateway API CRDs; an empty list clears the field
pub async fn set_unmanaged_gateway_api_crd_names(
    ctx: &Context,
    crd_names: &[String],
    cancel: &CancellationToken,
) -> Result<bool> {
    let desired = IngressOperatorStatusExtension::from_crd_names(crd_names);
    reconcile_status(
        ctx.cluster_operators.as_ref(),
        &ctx.config.cluster_operator_name,
        &desired,
        cancel,
    )
    .await
}

/// Converge the extension of ClusterOperator `name` to `desired`
///
/// Returns whether a write was issued. A missing ClusterOperator is an error:
/// it is created by cluster bootstrap, never by this operator.
pub async fn reconcile_status(
    cluster_operators: &dyn ObjectRepository<ClusterOperator>,
    name: &str,
    desired: &IngressOperatorStatusExtension,
    cancel: &CancellationToken,
) -> Result<bool> {
    let current = cancellable(cancel, cluster_operators.get(name))
        .await
        .map_err(|e| e.during(format!("get cluster operator {:?}", name)))?
        .ok_or_else(|| Error::not_found("cluster operator", name))?;

    let current_extension = IngressOperatorStatusExtension::decode(
        current.status.as_ref().and_then(|s| s.extension.as_ref()),
    )
    .map_err(|e| e.during(format!("read status extension of cluster operator {:?}", name)))?;

    if current_extension == *desired {
        debug!(cluster_operator = name, "Status extension unchanged");
        return Ok(false);
    }

    let mut updated = current.clone();
    let raw = desired
        .encode()
        .map_err(|e| e.during(format!("write status extension of cluster operator {:?}", name)))?;
    updated.status.get_or_insert_with(Default::default).extension = raw;

    ensure_not_cancelled(cancel)?;
    cancellable(cancel, cluster_operators.update_status(&updated))
        .await
        .map_err(|e| e.during(format!("update cluster operator {:?}", name)))?;

    STATUS_UPDATES.inc();
    info!(
        cluster_operator = name,
        unmanaged_gateway_api_crd_names = ?desired.unmanaged_gateway_api_crd_names,
        "Updated cluster operator status extension"
    );

    Ok(true)
}
