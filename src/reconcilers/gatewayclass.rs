//! Convergence of the service mesh installation for a GatewayClass
//!
//! Level-triggered: every pass re-reads the signal, recomputes the full
//! desired set and converges the cluster to it. Nothing is carried between
//! passes, so a pass that fails halfway is finished by the next one.

use std::fmt::Debug;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapters::owner::{has_owner_reference, is_owned_by_marker, MarkerRef};
use crate::controllers::Context;
use crate::metrics::{MANAGED_RESOURCES, OBJECT_WRITES};
use crate::reconcilers::desired::{self, DesiredObject, ManagedObject, ObjectKind, Signal};
use crate::repository::{cancellable, ensure_not_cancelled, ObjectRepository};
use crate::Result;

/// A reconciliation request, keyed by the name of the triggering GatewayClass
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileRequest {
    pub name: String,
}

impl ReconcileRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// What a pass did
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub active: bool,
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
}

impl ReconcileOutcome {
    /// Number of writes the pass issued
    pub fn writes(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }

    fn record(&mut self, kind: ObjectKind, name: String, result: Convergence) {
        let label = kind_label(kind);
        let entry = format!("{}/{}", label, name);
        match result {
            Convergence::Created => {
                OBJECT_WRITES.with_label_values(&[label, "create"]).inc();
                self.created.push(entry);
            }
            Convergence::Updated => {
                OBJECT_WRITES.with_label_values(&[label, "update"]).inc();
                self.updated.push(entry);
            }
            Convergence::Deleted => {
                OBJECT_WRITES.with_label_values(&[label, "delete"]).inc();
                self.deleted.push(entry);
            }
            Convergence::Unchanged => {}
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Convergence {
    Created,
    Updated,
    Deleted,
    Unchanged,
}

/// Read the signal for `request`: feature flag first, then marker existence
pub async fn observe_signal(
    request: &ReconcileRequest,
    ctx: &Context,
    cancel: &CancellationToken,
) -> Result<Signal> {
    if !ctx.config.gateway_api_controller_enabled {
        return Ok(Signal::Inactive);
    }
    let marker = cancellable(cancel, ctx.gateway_classes.get(&request.name))
        .await
        .map_err(|e| e.during(format!("get gatewayclass {:?}", request.name)))?;
    Ok(match marker {
        Some(gateway_class) => Signal::Active(MarkerRef::from_gateway_class(&gateway_class)),
        None => Signal::Inactive,
    })
}

/// Run one convergence pass for `request`
pub async fn reconcile(
    request: &ReconcileRequest,
    ctx: &Context,
    cancel: &CancellationToken,
) -> Result<ReconcileOutcome> {
    ensure_not_cancelled(cancel)?;

    let signal = observe_signal(request, ctx, cancel).await?;
    let desired = desired::compute_desired(&signal, &ctx.config);
    debug!(
        gatewayclass = %request.name,
        active = signal.is_active(),
        desired = desired.len(),
        "Computed desired objects"
    );

    let mut outcome = ReconcileOutcome {
        active: signal.is_active(),
        ..Default::default()
    };

    for object in &desired {
        let (name, result) = match object {
            DesiredObject::Subscription(sub) => (
                sub.name_any(),
                ensure_present(ctx.subscriptions.as_ref(), sub, cancel).await?,
            ),
            DesiredObject::ControlPlane(smcp) => (
                smcp.name_any(),
                ensure_present(ctx.control_planes.as_ref(), smcp, cancel).await?,
            ),
        };
        outcome.record(object.kind(), name, result);
    }

    for managed in desired::managed_objects(&ctx.config) {
        if desired.iter().any(|d| d.kind() == managed.kind) {
            continue;
        }
        let result = match managed.kind {
            ObjectKind::Subscription => {
                ensure_absent(ctx.subscriptions.as_ref(), &managed, &request.name, cancel).await?
            }
            ObjectKind::ControlPlane => {
                ensure_absent(ctx.control_planes.as_ref(), &managed, &request.name, cancel)
                    .await?
            }
        };
        outcome.record(managed.kind, managed.name, result);
    }

    MANAGED_RESOURCES
        .with_label_values(&["GatewayClass"])
        .set(desired.len() as f64);

    if outcome.writes() > 0 {
        info!(
            gatewayclass = %request.name,
            created = ?outcome.created,
            updated = ?outcome.updated,
            deleted = ?outcome.deleted,
            "Converged gateway dependents"
        );
    }

    Ok(outcome)
}

fn kind_label(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Subscription => "Subscription",
        ObjectKind::ControlPlane => "ServiceMeshControlPlane",
    }
}

/// Create `desired` if missing; otherwise only assert its owner references
async fn ensure_present<K>(
    repo: &dyn ObjectRepository<K>,
    desired: &K,
    cancel: &CancellationToken,
) -> Result<Convergence>
where
    K: Resource<DynamicType = ()> + Clone + Debug + Send + Sync + 'static,
{
    let kind = K::kind(&());
    let name = desired.name_any();
    let namespace = desired.namespace().unwrap_or_default();

    let current = cancellable(cancel, repo.get(&name))
        .await
        .map_err(|e| e.during(format!("get {} {}/{}", kind, namespace, name)))?;

    let Some(current) = current else {
        ensure_not_cancelled(cancel)?;
        return match cancellable(cancel, repo.create(desired)).await {
            Ok(_) => {
                info!("Created {} {}/{}", kind, namespace, name);
                Ok(Convergence::Created)
            }
            Err(e) if e.is_already_exists() => {
                warn!("{} {}/{} was created concurrently", kind, namespace, name);
                Ok(Convergence::Unchanged)
            }
            Err(e) => Err(e.during(format!("create {} {}/{}", kind, namespace, name))),
        };
    };

    let missing: Vec<OwnerReference> = desired
        .owner_references()
        .iter()
        .filter(|wanted| !has_owner_reference(current.owner_references(), wanted))
        .cloned()
        .collect();
    if missing.is_empty() {
        debug!("{} {}/{} is up to date", kind, namespace, name);
        return Ok(Convergence::Unchanged);
    }

    let mut updated = current.clone();
    updated
        .meta_mut()
        .owner_references
        .get_or_insert_with(Vec::new)
        .extend(missing);

    ensure_not_cancelled(cancel)?;
    cancellable(cancel, repo.update(&updated))
        .await
        .map_err(|e| e.during(format!("update {} {}/{}", kind, namespace, name)))?;
    info!("Updated owner references of {} {}/{}", kind, namespace, name);
    Ok(Convergence::Updated)
}

/// Delete `managed` if it exists and was created for marker `marker_name`
async fn ensure_absent<K>(
    repo: &dyn ObjectRepository<K>,
    managed: &ManagedObject,
    marker_name: &str,
    cancel: &CancellationToken,
) -> Result<Convergence>
where
    K: Resource<DynamicType = ()> + Clone + Debug + Send + Sync + 'static,
{
    let kind = K::kind(&());
    let (namespace, name) = (&managed.namespace, &managed.name);

    let current = cancellable(cancel, repo.get(name))
        .await
        .map_err(|e| e.during(format!("get {} {}/{}", kind, namespace, name)))?;

    let Some(current) = current else {
        return Ok(Convergence::Unchanged);
    };
    if !is_owned_by_marker(current.owner_references(), marker_name) {
        debug!(
            "Leaving {} {}/{} alone, it is not owned by gatewayclass {:?}",
            kind, namespace, name, marker_name
        );
        return Ok(Convergence::Unchanged);
    }

    ensure_not_cancelled(cancel)?;
    match cancellable(cancel, repo.delete(name)).await {
        Ok(()) => {
            info!("Deleted {} {}/{}", kind, namespace, name);
            Ok(Convergence::Deleted)
        }
        Err(e) if e.is_not_found() => Ok(Convergence::Unchanged),
        Err(e) => Err(e.during(format!("delete {} {}/{}", kind, namespace, name))),
    }
}
