//! Controller wiring: shared context and the watch/dispatch loops

pub mod gatewayapi_controller;
pub mod gatewayclass_controller;
pub mod lifecycle;

use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::runtime::controller::Action;
use kube::Client;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::crd::{ClusterOperator, GatewayClass, ServiceMeshControlPlane, Subscription};
use crate::repository::{KubeRepository, ObjectRepository};
use crate::Error;
use lifecycle::{ControllerHandle, ControllerLauncher, GatewayClassLauncher};

/// Shared context for controllers
///
/// Built once by the composition root and handed to every reconciliation.
pub struct Context {
    pub config: Config,
    /// Cluster-scoped GatewayClasses
    pub gateway_classes: Arc<dyn ObjectRepository<GatewayClass>>,
    /// Subscriptions in the operator namespace
    pub subscriptions: Arc<dyn ObjectRepository<Subscription>>,
    /// Control planes in the operand namespace
    pub control_planes: Arc<dyn ObjectRepository<ServiceMeshControlPlane>>,
    pub cluster_operators: Arc<dyn ObjectRepository<ClusterOperator>>,
    pub crds: Arc<dyn ObjectRepository<CustomResourceDefinition>>,
    /// Start-once guard for the GatewayClass controller
    pub gatewayclass_controller: Arc<ControllerHandle>,
    pub launcher: Arc<dyn ControllerLauncher>,
    /// Cancelled when the process shuts down
    pub shutdown: CancellationToken,
}

impl Context {
    /// Create a context backed by the Kubernetes API
    pub fn new(client: Client, config: Config, shutdown: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            gateway_classes: Arc::new(KubeRepository::cluster(client.clone())),
            subscriptions: Arc::new(KubeRepository::namespaced(
                client.clone(),
                &config.operator_namespace,
            )),
            control_planes: Arc::new(KubeRepository::namespaced(
                client.clone(),
                &config.operand_namespace,
            )),
            cluster_operators: Arc::new(KubeRepository::cluster(client.clone())),
            crds: Arc::new(KubeRepository::cluster(client.clone())),
            gatewayclass_controller: Arc::new(ControllerHandle::new("gatewayclass")),
            launcher: Arc::new(GatewayClassLauncher::new(client)),
            config,
            shutdown,
        })
    }
}

/// Requeue delay for a failed pass, by error category
pub fn requeue_for(err: &Error) -> Action {
    match err.root() {
        Error::Conflict { .. } | Error::AlreadyExists { .. } => {
            Action::requeue(Duration::from_secs(5))
        }
        Error::Cancelled => Action::await_change(),
        Error::Decode { .. } | Error::Encode { .. } | Error::ConfigError(_) => {
            Action::requeue(Duration::from_secs(300))
        }
        _ => Action::requeue(Duration::from_secs(30)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::repository::MemoryRepository;

    /// Context over empty in-memory repositories
    pub fn memory_context(launcher: Arc<dyn ControllerLauncher>) -> Arc<Context> {
        Arc::new(Context {
            config: Config::default(),
            gateway_classes: Arc::new(MemoryRepository::new()),
            subscriptions: Arc::new(MemoryRepository::new()),
            control_planes: Arc::new(MemoryRepository::new()),
            cluster_operators: Arc::new(MemoryRepository::new()),
            crds: Arc::new(MemoryRepository::new()),
            gatewayclass_controller: Arc::new(ControllerHandle::new("gatewayclass")),
            launcher,
            shutdown: CancellationToken::new(),
        })
    }

    #[test]
    fn conflicts_requeue_quickly() {
        let err = Error::Conflict {
            kind: "ClusterOperator".to_string(),
            name: "ingress".to_string(),
            message: "stale".to_string(),
        }
        .during("update cluster operator");
        assert_eq!(requeue_for(&err), Action::requeue(Duration::from_secs(5)));
    }

    #[test]
    fn cancelled_passes_wait_for_change() {
        assert_eq!(requeue_for(&Error::Cancelled), Action::await_change());
    }
}
