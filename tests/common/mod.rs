//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use gateway_api_operator::config::Config;
use gateway_api_operator::controllers::lifecycle::{ControllerHandle, ControllerLauncher};
use gateway_api_operator::controllers::Context;
use gateway_api_operator::crd::{
    ClusterOperator, ClusterOperatorSpec, ClusterOperatorStatus, GatewayClass,
    GatewayClassSpec, ServiceMeshControlPlane, Subscription, GATEWAY_CONTROLLER_NAME,
};
use gateway_api_operator::repository::{Change, MemoryRepository, ObjectRepository};
use gateway_api_operator::{Error, Result};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
    CustomResourceDefinition, CustomResourceDefinitionNames, CustomResourceDefinitionSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Launcher
// ============================================================================

/// Counts launches; fails while `fail` is set
#[derive(Default)]
pub struct CountingLauncher {
    pub launches: AtomicUsize,
    pub fail: AtomicBool,
}

impl CountingLauncher {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ControllerLauncher for CountingLauncher {
    async fn launch(&self, _ctx: Arc<Context>) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::ControllerStart {
                controller: "gatewayclass".to_string(),
                message: "GatewayClass API is not served".to_string(),
            });
        }
        tokio::task::yield_now().await;
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub gateway_classes: Arc<MemoryRepository<GatewayClass>>,
    pub subscriptions: Arc<MemoryRepository<Subscription>>,
    pub control_planes: Arc<MemoryRepository<ServiceMeshControlPlane>>,
    pub cluster_operators: Arc<MemoryRepository<ClusterOperator>>,
    pub crds: Arc<MemoryRepository<CustomResourceDefinition>>,
    pub launcher: Arc<CountingLauncher>,
    pub ctx: Arc<Context>,
}

impl Harness {
    pub fn new(config: Config) -> Self {
        let gateway_classes = Arc::new(MemoryRepository::new());
        let subscriptions = Arc::new(MemoryRepository::new());
        let control_planes = Arc::new(MemoryRepository::new());
        let cluster_operators = Arc::new(MemoryRepository::new());
        let crds = Arc::new(MemoryRepository::new());
        let launcher = Arc::new(CountingLauncher::default());

        let ctx = Arc::new(Context {
            config,
            gateway_classes: gateway_classes.clone(),
            subscriptions: subscriptions.clone(),
            control_planes: control_planes.clone(),
            cluster_operators: cluster_operators.clone(),
            crds: crds.clone(),
            gatewayclass_controller: Arc::new(ControllerHandle::new("gatewayclass")),
            launcher: launcher.clone(),
            shutdown: CancellationToken::new(),
        });

        Self {
            gateway_classes,
            subscriptions,
            control_planes,
            cluster_operators,
            crds,
            launcher,
            ctx,
        }
    }

    pub fn enabled() -> Self {
        Self::new(enabled_config())
    }

    pub fn disabled() -> Self {
        Self::new(Config::default())
    }

    /// Writes recorded against the dependent repositories
    pub fn dependent_writes(&self) -> usize {
        self.subscriptions.writes().len() + self.control_planes.writes().len()
    }

    pub fn clear_writes(&self) {
        self.subscriptions.clear_writes();
        self.control_planes.clear_writes();
        self.cluster_operators.clear_writes();
    }
}

pub fn enabled_config() -> Config {
    Config {
        gateway_api_controller_enabled: true,
        ..Config::default()
    }
}

// ============================================================================
// Object fixtures
// ============================================================================

pub fn gateway_class(name: &str) -> GatewayClass {
    GatewayClass::new(
        name,
        GatewayClassSpec {
            controller_name: GATEWAY_CONTROLLER_NAME.to_string(),
            description: None,
        },
    )
}

pub fn cluster_operator(name: &str, status: Option<ClusterOperatorStatus>) -> ClusterOperator {
    let mut co = ClusterOperator::new(name, ClusterOperatorSpec {});
    co.status = status;
    co
}

pub fn crd(plural: &str, group: &str) -> CustomResourceDefinition {
    CustomResourceDefinition {
        metadata: ObjectMeta {
            name: Some(format!("{}.{}", plural, group)),
            ..Default::default()
        },
        spec: CustomResourceDefinitionSpec {
            group: group.to_string(),
            names: CustomResourceDefinitionNames {
                plural: plural.to_string(),
                kind: plural.to_string(),
                ..Default::default()
            },
            scope: "Namespaced".to_string(),
            ..Default::default()
        },
        status: None,
    }
}

pub fn labels() -> BTreeMap<String, String> {
    BTreeMap::new()
}

// ============================================================================
// Repository wrappers for race simulation
// ============================================================================

/// Reports every object as absent on `get`, as a lagging cache would
pub struct StaleGetRepository<K> {
    pub inner: Arc<MemoryRepository<K>>,
}

/// Lets another writer bump the object right after every `get`
pub struct InterferingRepository<K> {
    pub inner: Arc<MemoryRepository<K>>,
}

#[async_trait]
impl<K> ObjectRepository<K> for StaleGetRepository<K>
where
    K: Resource<DynamicType = ()> + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, _name: &str) -> Result<Option<K>> {
        Ok(None)
    }

    async fn list(&self, labels: &BTreeMap<String, String>) -> Result<Vec<K>> {
        self.inner.list(labels).await
    }

    async fn create(&self, obj: &K) -> Result<K> {
        self.inner.create(obj).await
    }

    async fn update(&self, obj: &K) -> Result<K> {
        self.inner.update(obj).await
    }

    async fn update_status(&self, obj: &K) -> Result<K> {
        self.inner.update_status(obj).await
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.inner.delete(name).await
    }

    fn watch(&self) -> BoxStream<'static, Result<Change<K>>> {
        self.inner.watch()
    }
}

#[async_trait]
impl<K> ObjectRepository<K> for InterferingRepository<K>
where
    K: Resource<DynamicType = ()> + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, name: &str) -> Result<Option<K>> {
        let current = self.inner.get(name).await?;
        if let Some(obj) = &current {
            self.inner.insert(obj.clone());
        }
        Ok(current)
    }

    async fn list(&self, labels: &BTreeMap<String, String>) -> Result<Vec<K>> {
        self.inner.list(labels).await
    }

    async fn create(&self, obj: &K) -> Result<K> {
        self.inner.create(obj).await
    }

    async fn update(&self, obj: &K) -> Result<K> {
        self.inner.update(obj).await
    }

    async fn update_status(&self, obj: &K) -> Result<K> {
        self.inner.update_status(obj).await
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.inner.delete(name).await
    }

    fn watch(&self) -> BoxStream<'static, Result<Change<K>>> {
        self.inner.watch()
    }
}

/// Cancels `cancel` as soon as a create succeeds, ending the pass between writes
pub struct CancelAfterCreate<K> {
    pub inner: Arc<MemoryRepository<K>>,
    pub cancel: CancellationToken,
}

#[async_trait]
impl<K> ObjectRepository<K> for CancelAfterCreate<K>
where
    K: Resource<DynamicType = ()> + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, name: &str) -> Result<Option<K>> {
        self.inner.get(name).await
    }

    async fn list(&self, labels: &BTreeMap<String, String>) -> Result<Vec<K>> {
        self.inner.list(labels).await
    }

    async fn create(&self, obj: &K) -> Result<K> {
        let created = self.inner.create(obj).await?;
        self.cancel.cancel();
        Ok(created)
    }

    async fn update(&self, obj: &K) -> Result<K> {
        self.inner.update(obj).await
    }

    async fn update_status(&self, obj: &K) -> Result<K> {
        self.inner.update_status(obj).await
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.inner.delete(name).await
    }

    fn watch(&self) -> BoxStream<'static, Result<Change<K>>> {
        self.inner.watch()
    }
}
