//! Object repository abstraction over the cluster API
//!
//! Reconcilers talk to the cluster only through [`ObjectRepository`], one
//! instance per resource kind and scope. [`KubeRepository`] backs it with the
//! Kubernetes API; [`MemoryRepository`] keeps objects in process.

mod kube_repository;
mod memory_repository;

pub use kube_repository::KubeRepository;
pub use memory_repository::{MemoryRepository, Operation, Write};

use std::collections::BTreeMap;
use std::future::Future;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// Change notification delivered by [`ObjectRepository::watch`]
#[derive(Clone, Debug, PartialEq)]
pub enum Change<K> {
    Applied(K),
    Deleted(K),
}

impl<K> Change<K> {
    pub fn object(&self) -> &K {
        match self {
            Change::Applied(obj) | Change::Deleted(obj) => obj,
        }
    }
}

/// Key-addressed object store with optimistic concurrency
///
/// Every object is addressed by name within the repository's scope. Writes
/// carrying a stale `resourceVersion` fail with [`Error::Conflict`].
#[async_trait]
pub trait ObjectRepository<K>: Send + Sync
where
    K: Clone + Send + Sync + 'static,
{
    /// Fetch an object; `Ok(None)` when it does not exist
    async fn get(&self, name: &str) -> Result<Option<K>>;

    /// List objects whose labels contain every entry of `labels`
    async fn list(&self, labels: &BTreeMap<String, String>) -> Result<Vec<K>>;

    /// Create an object; fails with [`Error::AlreadyExists`] on a name clash
    async fn create(&self, obj: &K) -> Result<K>;

    /// Replace an object's metadata and spec
    async fn update(&self, obj: &K) -> Result<K>;

    /// Replace only the status subresource
    async fn update_status(&self, obj: &K) -> Result<K>;

    /// Delete an object; fails with [`Error::NotFound`] when it is already gone
    async fn delete(&self, name: &str) -> Result<()>;

    /// Stream of changes to objects in scope
    ///
    /// The operator's own dispatch runs on `kube::runtime::Controller`, which
    /// watches through its reflectors; this stream is for embedders and tests
    /// driving passes from change events directly.
    fn watch(&self) -> BoxStream<'static, Result<Change<K>>>;
}

/// Run `fut` unless `cancel` fires first
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        res = fut => res,
    }
}

pub fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}
