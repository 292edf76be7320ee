//! [`ObjectRepository`] backed by the Kubernetes API

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::{Api, Client, Resource, ResourceExt};
use kube_runtime::watcher;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Change, ObjectRepository};
use crate::{Error, Result};

/// Repository over a single `Api<K>` scope
pub struct KubeRepository<K> {
    api: Api<K>,
}

impl<K> KubeRepository<K>
where
    K: Resource<DynamicType = ()>,
{
    pub fn new(api: Api<K>) -> Self {
        Self { api }
    }
}

impl<K> KubeRepository<K>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
{
    /// Repository for objects in `namespace`
    pub fn namespaced(client: Client, namespace: &str) -> Self {
        Self::new(Api::namespaced(client, namespace))
    }
}

impl<K> KubeRepository<K>
where
    K: Resource<DynamicType = (), Scope = ClusterResourceScope>,
{
    /// Repository for cluster-scoped objects
    pub fn cluster(client: Client) -> Self {
        Self::new(Api::all(client))
    }
}

fn kind_of<K: Resource<DynamicType = ()>>() -> String {
    K::kind(&()).to_string()
}

/// Map API status codes onto the repository error taxonomy
fn map_error(err: kube::Error, operation: &str, kind: &str, name: &str) -> Error {
    match &err {
        kube::Error::Api(resp) if resp.code == 404 => Error::not_found(kind, name),
        kube::Error::Api(resp) if resp.code == 409 && resp.reason == "AlreadyExists" => {
            Error::already_exists(kind, name)
        }
        kube::Error::Api(resp) if resp.code == 409 => Error::Conflict {
            kind: kind.to_string(),
            name: name.to_string(),
            message: resp.message.clone(),
        },
        _ => Error::Kube {
            operation: format!("{} {} {:?}", operation, kind, name),
            source: err,
        },
    }
}

fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl<K> ObjectRepository<K> for KubeRepository<K>
where
    K: Resource<DynamicType = ()>
        + Clone
        + Debug
        + DeserializeOwned
        + Serialize
        + Send
        + Sync
        + 'static,
{
    async fn get(&self, name: &str) -> Result<Option<K>> {
        self.api
            .get_opt(name)
            .await
            .map_err(|e| map_error(e, "get", &kind_of::<K>(), name))
    }

    async fn list(&self, labels: &BTreeMap<String, String>) -> Result<Vec<K>> {
        let mut params = ListParams::default();
        if !labels.is_empty() {
            params = params.labels(&label_selector(labels));
        }
        self.api
            .list(&params)
            .await
            .map(|list| list.items)
            .map_err(|e| map_error(e, "list", &kind_of::<K>(), ""))
    }

    async fn create(&self, obj: &K) -> Result<K> {
        self.api
            .create(&PostParams::default(), obj)
            .await
            .map_err(|e| map_error(e, "create", &kind_of::<K>(), &obj.name_any()))
    }

    async fn update(&self, obj: &K) -> Result<K> {
        let name = obj.name_any();
        self.api
            .replace(&name, &PostParams::default(), obj)
            .await
            .map_err(|e| map_error(e, "update", &kind_of::<K>(), &name))
    }

    async fn update_status(&self, obj: &K) -> Result<K> {
        let name = obj.name_any();
        let data = serde_json::to_vec(obj).map_err(|source| Error::Encode {
            what: format!("{} {:?}", kind_of::<K>(), name),
            source,
        })?;
        self.api
            .replace_status(&name, &PostParams::default(), data)
            .await
            .map_err(|e| map_error(e, "update status of", &kind_of::<K>(), &name))
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.api
            .delete(name, &DeleteParams::background())
            .await
            .map(|_| ())
            .map_err(|e| map_error(e, "delete", &kind_of::<K>(), name))
    }

    /// Not used by the bundled controllers, which watch through `Controller`
    fn watch(&self) -> BoxStream<'static, Result<Change<K>>> {
        let kind = kind_of::<K>();
        watcher(self.api.clone(), watcher::Config::default())
            .filter_map(move |event| {
                let kind = kind.clone();
                async move {
                    match event {
                        Ok(watcher::Event::Apply(obj)) | Ok(watcher::Event::InitApply(obj)) => {
                            Some(Ok(Change::Applied(obj)))
                        }
                        Ok(watcher::Event::Delete(obj)) => Some(Ok(Change::Deleted(obj))),
                        Ok(_) => None,
                        Err(e) => Some(Err(Error::Transport(format!("watch {}: {}", kind, e)))),
                    }
                }
            })
            .boxed()
    }
}
