//! In-process [`ObjectRepository`]
//!
//! Mirrors the API server semantics the reconcilers rely on: resource versions
//! bump on every write, stale writes conflict, `update` leaves status alone and
//! `update_status` leaves everything but status alone. Every write is recorded
//! so callers can assert on exactly what a pass did.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;

use super::{Change, ObjectRepository};
use crate::{Error, Result};

const WATCH_CAPACITY: usize = 64;

/// Repository operation, used for the write log and failure injection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    List,
    Create,
    Update,
    UpdateStatus,
    Delete,
}

/// A recorded write
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Write {
    pub operation: Operation,
    pub name: String,
}

struct State<K> {
    objects: BTreeMap<String, K>,
    last_version: u64,
    writes: Vec<Write>,
    failing: HashSet<Operation>,
}

pub struct MemoryRepository<K> {
    state: Mutex<State<K>>,
    changes: broadcast::Sender<Change<K>>,
}

impl<K> Default for MemoryRepository<K>
where
    K: Resource<DynamicType = ()> + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> MemoryRepository<K>
where
    K: Resource<DynamicType = ()> + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(WATCH_CAPACITY);
        Self {
            state: Mutex::new(State {
                objects: BTreeMap::new(),
                last_version: 0,
                writes: Vec::new(),
                failing: HashSet::new(),
            }),
            changes,
        }
    }

    /// Repository pre-populated with `objects`
    pub fn with_objects(objects: impl IntoIterator<Item = K>) -> Self {
        let repo = Self::new();
        for obj in objects {
            repo.insert(obj);
        }
        repo
    }

    /// Store an object directly, bypassing the write log and failure injection
    pub fn insert(&self, obj: K) -> K {
        let stored = store(&mut self.lock(), obj);
        let _ = self.changes.send(Change::Applied(stored.clone()));
        stored
    }

    /// Read an object without recording or failing
    pub fn peek(&self, name: &str) -> Option<K> {
        self.lock().objects.get(name).cloned()
    }

    pub fn objects(&self) -> Vec<K> {
        self.lock().objects.values().cloned().collect()
    }

    /// Writes recorded since creation or the last [`clear_writes`](Self::clear_writes)
    pub fn writes(&self) -> Vec<Write> {
        self.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    /// Make every subsequent `operation` fail with a transport error
    pub fn fail_on(&self, operation: Operation) {
        self.lock().failing.insert(operation);
    }

    pub fn clear_failures(&self) {
        self.lock().failing.clear();
    }

    fn lock(&self) -> MutexGuard<'_, State<K>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_failure(state: &State<K>, operation: Operation) -> Result<()> {
        if state.failing.contains(&operation) {
            return Err(Error::Transport(format!(
                "{} {:?} unavailable",
                K::kind(&()),
                operation
            )));
        }
        Ok(())
    }

    fn check_version(state: &State<K>, obj: &K) -> Result<K> {
        let name = obj.name_any();
        let stored = state
            .objects
            .get(&name)
            .ok_or_else(|| Error::not_found(K::kind(&()), &name))?;
        if let Some(version) = obj.resource_version() {
            if Some(&version) != stored.meta().resource_version.as_ref() {
                return Err(Error::Conflict {
                    kind: K::kind(&()).to_string(),
                    name,
                    message: format!(
                        "resource version {} is stale, current is {}",
                        version,
                        stored.meta().resource_version.clone().unwrap_or_default()
                    ),
                });
            }
        }
        Ok(stored.clone())
    }

    fn commit(&self, state: &mut State<K>, operation: Operation, obj: K) -> K {
        let stored = store(state, obj);
        state.writes.push(Write {
            operation,
            name: stored.name_any(),
        });
        let _ = self.changes.send(Change::Applied(stored.clone()));
        stored
    }
}

/// Save `obj` under a fresh resource version, assigning a uid on first store
fn store<K: Resource<DynamicType = ()> + Clone>(state: &mut State<K>, mut obj: K) -> K {
    state.last_version += 1;
    let meta = obj.meta_mut();
    meta.resource_version = Some(state.last_version.to_string());
    if meta.uid.is_none() {
        meta.uid = Some(format!(
            "{}-{}",
            K::kind(&()).to_lowercase(),
            state.last_version
        ));
    }
    let name = meta.name.clone().unwrap_or_default();
    state.objects.insert(name, obj.clone());
    obj
}

/// `base` with its `status` replaced by the status of `status_from`
fn splice_status<K>(base: &K, status_from: &K) -> Result<K>
where
    K: Resource<DynamicType = ()> + Serialize + DeserializeOwned,
{
    let what = || format!("{} {:?}", K::kind(&()), base.meta().name);
    let encode = |source| Error::Encode {
        what: what(),
        source,
    };
    let mut value = serde_json::to_value(base).map_err(encode)?;
    let status = serde_json::to_value(status_from)
        .map_err(encode)?
        .get("status")
        .cloned();
    if let Some(map) = value.as_object_mut() {
        match status {
            Some(status) => {
                map.insert("status".to_string(), status);
            }
            None => {
                map.remove("status");
            }
        }
    }
    serde_json::from_value(value).map_err(|source| Error::Decode {
        what: what(),
        source,
    })
}

#[async_trait]
impl<K> ObjectRepository<K> for MemoryRepository<K>
where
    K: Resource<DynamicType = ()> + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, name: &str) -> Result<Option<K>> {
        let state = self.lock();
        Self::check_failure(&state, Operation::Get)?;
        Ok(state.objects.get(name).cloned())
    }

    async fn list(&self, labels: &BTreeMap<String, String>) -> Result<Vec<K>> {
        let state = self.lock();
        Self::check_failure(&state, Operation::List)?;
        Ok(state
            .objects
            .values()
            .filter(|obj| {
                let have = obj.labels();
                labels.iter().all(|(k, v)| have.get(k) == Some(v))
            })
            .cloned()
            .collect())
    }

    async fn create(&self, obj: &K) -> Result<K> {
        let mut state = self.lock();
        Self::check_failure(&state, Operation::Create)?;
        let name = obj.name_any();
        if state.objects.contains_key(&name) {
            return Err(Error::already_exists(K::kind(&()), name));
        }
        Ok(self.commit(&mut state, Operation::Create, obj.clone()))
    }

    async fn update(&self, obj: &K) -> Result<K> {
        let mut state = self.lock();
        Self::check_failure(&state, Operation::Update)?;
        let stored = Self::check_version(&state, obj)?;
        let updated = splice_status(obj, &stored)?;
        Ok(self.commit(&mut state, Operation::Update, updated))
    }

    async fn update_status(&self, obj: &K) -> Result<K> {
        let mut state = self.lock();
        Self::check_failure(&state, Operation::UpdateStatus)?;
        let stored = Self::check_version(&state, obj)?;
        let updated = splice_status(&stored, obj)?;
        Ok(self.commit(&mut state, Operation::UpdateStatus, updated))
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let mut state = self.lock();
        Self::check_failure(&state, Operation::Delete)?;
        let removed = state
            .objects
            .remove(name)
            .ok_or_else(|| Error::not_found(K::kind(&()), name))?;
        state.writes.push(Write {
            operation: Operation::Delete,
            name: name.to_string(),
        });
        let _ = self.changes.send(Change::Deleted(removed));
        Ok(())
    }

    fn watch(&self) -> BoxStream<'static, Result<Change<K>>> {
        let rx = self.changes.subscribe();
        stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(change) => return Some((Ok(change), rx)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}
