//! In-memory data broker with optimistic concurrency
//!
//! Every committed entry carries a version drawn from one monotonically
//! increasing counter. A transaction remembers the version of each entry it
//! read; commit re-checks those versions under the commit lock and rejects
//! the whole transaction if any of them moved. Reads never take the lock.
//!
//! Layer scans also record a per-layer version that moves whenever an entry
//! is created in or removed from that layer, so a scan conflicts with a
//! concurrent insert it could not have seen.

use super::{
    DataBroker, LogicalDatastore, ReadWriteTransaction, StoreError, TopologyObject, TopologyPath,
};
use crate::model::NetworkLayer;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

type StoreKey = (LogicalDatastore, TopologyPath);
type LayerKey = (LogicalDatastore, NetworkLayer);

/// Version recorded for an entry that did not exist when read
const ABSENT: u64 = 0;

#[derive(Debug, Clone)]
struct Entry {
    version: u64,
    object: TopologyObject,
}

#[derive(Debug, Default)]
struct Inner {
    entries: DashMap<StoreKey, Entry>,
    layer_versions: DashMap<LayerKey, u64>,
    commit_lock: Mutex<()>,
    last_version: AtomicU64,
    commits: AtomicU64,
    conflicts: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BrokerStats {
    pub commits: u64,
    pub conflicts: u64,
    pub entries: usize,
}

#[derive(Serialize)]
struct SnapshotEntry<'a> {
    datastore: LogicalDatastore,
    path: String,
    version: u64,
    object: &'a TopologyObject,
}

/// Shared handle; clones see the same entries
#[derive(Debug, Clone, Default)]
pub struct MemoryDataBroker {
    inner: Arc<Inner>,
}

impl MemoryDataBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> BrokerStats {
        BrokerStats {
            commits: self.inner.commits.load(Ordering::Relaxed),
            conflicts: self.inner.conflicts.load(Ordering::Relaxed),
            entries: self.inner.entries.len(),
        }
    }

    /// Committed state as JSON, ordered by datastore and path
    pub fn snapshot_json(&self) -> serde_json::Result<serde_json::Value> {
        let entries: BTreeMap<StoreKey, Entry> = self
            .inner
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let snapshot: Vec<SnapshotEntry<'_>> = entries
            .iter()
            .map(|((datastore, path), entry)| SnapshotEntry {
                datastore: *datastore,
                path: path.to_string(),
                version: entry.version,
                object: &entry.object,
            })
            .collect();
        serde_json::to_value(snapshot)
    }
}

impl DataBroker for MemoryDataBroker {
    fn new_transaction(&self) -> Box<dyn ReadWriteTransaction> {
        Box::new(MemoryTransaction {
            inner: Arc::clone(&self.inner),
            read_versions: HashMap::new(),
            layer_reads: HashMap::new(),
            staged: Vec::new(),
        })
    }
}

#[derive(Debug, Clone)]
enum StagedWrite {
    Put(TopologyObject),
    Merge(TopologyObject),
    Delete,
}

pub struct MemoryTransaction {
    inner: Arc<Inner>,
    read_versions: HashMap<StoreKey, u64>,
    layer_reads: HashMap<LayerKey, u64>,
    staged: Vec<(StoreKey, StagedWrite)>,
}

fn apply(
    key: &StoreKey,
    current: Option<TopologyObject>,
    write: &StagedWrite,
) -> Result<Option<TopologyObject>, StoreError> {
    match write {
        StagedWrite::Put(object) => Ok(Some(object.clone())),
        StagedWrite::Delete => Ok(None),
        StagedWrite::Merge(object) => match (current, object) {
            (None, object) => Ok(Some(object.clone())),
            (Some(TopologyObject::Node(mut stored)), TopologyObject::Node(incoming)) => {
                stored.merge_from(incoming.clone());
                Ok(Some(TopologyObject::Node(stored)))
            }
            (Some(TopologyObject::Link(_)), TopologyObject::Link(_))
            | (Some(TopologyObject::TerminationPoint(_)), TopologyObject::TerminationPoint(_)) => {
                Ok(Some(object.clone()))
            }
            (Some(stored), object) => Err(StoreError::TypeMismatch {
                path: key.1.to_string(),
                expected: stored.kind(),
                found: object.kind(),
            }),
        },
    }
}

impl MemoryTransaction {
    fn committed(&mut self, key: &StoreKey) -> Option<TopologyObject> {
        let (version, object) = match self.inner.entries.get(key) {
            Some(entry) => (entry.version, Some(entry.object.clone())),
            None => (ABSENT, None),
        };
        self.read_versions.entry(key.clone()).or_insert(version);
        object
    }

    fn with_staged(
        &self,
        key: &StoreKey,
        mut value: Option<TopologyObject>,
    ) -> Result<Option<TopologyObject>, StoreError> {
        for (staged_key, write) in &self.staged {
            if staged_key == key {
                value = apply(key, value, write)?;
            }
        }
        Ok(value)
    }
}

impl ReadWriteTransaction for MemoryTransaction {
    fn read(
        &mut self,
        store: LogicalDatastore,
        path: &TopologyPath,
    ) -> Result<Option<TopologyObject>, StoreError> {
        let key = (store, path.clone());
        let committed = self.committed(&key);
        self.with_staged(&key, committed)
    }

    fn read_layer(
        &mut self,
        store: LogicalDatastore,
        layer: NetworkLayer,
    ) -> Result<Vec<(TopologyPath, TopologyObject)>, StoreError> {
        let layer_version = self
            .inner
            .layer_versions
            .get(&(store, layer))
            .map_or(ABSENT, |version| *version);
        self.layer_reads.entry((store, layer)).or_insert(layer_version);

        let mut view: BTreeMap<TopologyPath, Option<TopologyObject>> = BTreeMap::new();
        for entry in self.inner.entries.iter() {
            let (entry_store, path) = entry.key();
            if *entry_store == store && path.layer() == layer {
                view.insert(path.clone(), Some(entry.value().object.clone()));
                self.read_versions
                    .entry(entry.key().clone())
                    .or_insert(entry.value().version);
            }
        }
        for ((staged_store, path), _) in &self.staged {
            if *staged_store == store && path.layer() == layer {
                view.entry(path.clone()).or_insert(None);
            }
        }

        let mut objects = Vec::with_capacity(view.len());
        for (path, committed) in view {
            let key = (store, path);
            if let Some(object) = self.with_staged(&key, committed)? {
                objects.push((key.1, object));
            }
        }
        Ok(objects)
    }

    fn merge(&mut self, store: LogicalDatastore, path: TopologyPath, object: TopologyObject) {
        self.staged.push(((store, path), StagedWrite::Merge(object)));
    }

    fn put(&mut self, store: LogicalDatastore, path: TopologyPath, object: TopologyObject) {
        self.staged.push(((store, path), StagedWrite::Put(object)));
    }

    fn delete(&mut self, store: LogicalDatastore, path: TopologyPath) {
        self.staged.push(((store, path), StagedWrite::Delete));
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTransaction {
            inner,
            read_versions,
            layer_reads,
            staged,
        } = *self;
        let _guard = inner.commit_lock.lock();

        for ((store, layer), read_version) in &layer_reads {
            let current = inner
                .layer_versions
                .get(&(*store, *layer))
                .map_or(ABSENT, |version| *version);
            if current != *read_version {
                inner.conflicts.fetch_add(1, Ordering::Relaxed);
                debug!(%layer, read_version, current, "layer changed under scan");
                return Err(StoreError::Conflict {
                    path: layer.to_string(),
                });
            }
        }

        for (key, read_version) in &read_versions {
            let current = inner
                .entries
                .get(key)
                .map_or(ABSENT, |entry| entry.version);
            if current != *read_version {
                inner.conflicts.fetch_add(1, Ordering::Relaxed);
                debug!(path = %key.1, read_version, current, "commit conflict");
                return Err(StoreError::Conflict {
                    path: key.1.to_string(),
                });
            }
        }

        // resolve every write before touching the map so a bad merge aborts the commit
        let mut resolved: BTreeMap<StoreKey, Option<TopologyObject>> = BTreeMap::new();
        for (key, write) in &staged {
            let current = match resolved.get(key) {
                Some(value) => value.clone(),
                None => inner.entries.get(key).map(|entry| entry.object.clone()),
            };
            let value = apply(key, current, write)?;
            resolved.insert(key.clone(), value);
        }

        let writes = resolved.len();
        for (key, value) in resolved {
            let layer_key = (key.0, key.1.layer());
            let version = inner.last_version.fetch_add(1, Ordering::Relaxed) + 1;
            // entry first, layer version second: a scan that sees the new
            // layer version also sees the entry
            let membership_changed = match value {
                Some(object) => inner.entries.insert(key, Entry { version, object }).is_none(),
                None => inner.entries.remove(&key).is_some(),
            };
            if membership_changed {
                inner.layer_versions.insert(layer_key, version);
            }
        }
        inner.commits.fetch_add(1, Ordering::Relaxed);
        trace!(writes, reads = read_versions.len(), "transaction committed");
        Ok(())
    }
}
