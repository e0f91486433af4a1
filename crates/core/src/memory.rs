//! In-memory object store
//!
//! Behaves like a flat-namespace storage service: containers hold keyed
//! objects, delimiter listings report common prefixes, and manifests resolve
//! to the size of their segments. Every mutating call is recorded so tests can
//! assert on the exact sequence of remote operations, and individual calls can
//! be made to fail with a chosen status.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use jiff::Timestamp;

use crate::error::{Error, Result};
use crate::object::{content_hash, Metadata, StorageManifest, StorageObject};
use crate::path::{self, SEPARATOR};
use crate::traits::{ListingEntry, ObjectStore};

/// A mutating call seen by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    CreateContainer(String),
    CreateFolder { container: String, folder: String },
    Put { container: String, key: String },
    Delete { container: String, key: String },
    PutManifest { container: String, key: String, kind: &'static str },
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    etag: String,
    content_type: Option<String>,
    metadata: Metadata,
    last_modified: Timestamp,
    manifest: Option<StorageManifest>,
}

#[derive(Debug, Default)]
struct State {
    containers: BTreeMap<String, BTreeMap<String, StoredObject>>,
    ops: Vec<StoreOp>,
    put_failures: HashMap<String, u16>,
    manifest_failure: Option<u16>,
}

/// Thread-safe in-memory storage service
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next upload of `key` fail with `status`
    pub fn fail_put_on(&self, key: impl Into<String>, status: u16) {
        self.write().put_failures.insert(key.into(), status);
    }

    /// Make the next manifest upload fail with `status`
    pub fn fail_manifest(&self, status: u16) {
        self.write().manifest_failure = Some(status);
    }

    /// Mutating calls seen so far
    pub fn ops(&self) -> Vec<StoreOp> {
        self.read().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.write().ops.clear();
    }

    /// Number of plain object uploads seen so far
    pub fn put_count(&self) -> usize {
        self.read()
            .ops
            .iter()
            .filter(|op| matches!(op, StoreOp::Put { .. }))
            .count()
    }

    /// Raw bytes stored under a key
    pub fn data(&self, container: &str, key: &str) -> Option<Vec<u8>> {
        self.read()
            .containers
            .get(container)
            .and_then(|objects| objects.get(key))
            .map(|stored| stored.data.clone())
    }

    /// Content of an object, assembling manifests from their segments
    pub fn read_object(&self, container: &str, key: &str) -> Result<Vec<u8>> {
        let state = self.read();
        let stored = lookup(&state, container, key)?;
        match &stored.manifest {
            None => Ok(stored.data.clone()),
            Some(manifest) => {
                let mut content = Vec::new();
                for segment in resolve_segments(&state, manifest)? {
                    let part = lookup(&state, &segment.container, &segment.key)?;
                    content.extend_from_slice(&part.data);
                }
                Ok(content)
            }
        }
    }
}

fn lookup<'a>(state: &'a State, container: &str, key: &str) -> Result<&'a StoredObject> {
    state
        .containers
        .get(container)
        .and_then(|objects| objects.get(key))
        .ok_or_else(|| Error::remote(format!("{container}/{key}"), 404))
}

fn to_object(container: &str, key: &str, stored: &StoredObject) -> StorageObject {
    let mut object = StorageObject::new(container, key, stored.data.len() as u64)
        .with_etag(stored.etag.clone())
        .with_last_modified(stored.last_modified)
        .with_metadata(stored.metadata.clone());
    object.content_type = stored.content_type.clone();
    object
}

/// Segments a manifest currently refers to, in order
fn resolve_segments(state: &State, manifest: &StorageManifest) -> Result<Vec<StorageObject>> {
    match manifest {
        StorageManifest::Static(m) => Ok(m.segments().to_vec()),
        StorageManifest::Dynamic(m) => {
            let (container, prefix) = m.segment_location();
            let objects = state
                .containers
                .get(container)
                .ok_or_else(|| Error::remote(container, 404))?;
            Ok(objects
                .range(prefix.to_string()..)
                .take_while(|(key, _)| key.starts_with(prefix))
                .filter(|(key, _)| key.as_str() != prefix)
                .map(|(key, stored)| to_object(container, key, stored))
                .collect())
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn container_exists(&self, container: &str) -> Result<bool> {
        Ok(self.read().containers.contains_key(container))
    }

    async fn create_container(&self, container: &str) -> Result<()> {
        let mut state = self.write();
        state.containers.entry(container.to_string()).or_default();
        state.ops.push(StoreOp::CreateContainer(container.to_string()));
        Ok(())
    }

    async fn folder_exists(&self, container: &str, folder: &str) -> Result<bool> {
        let marker = path::folder_marker(folder);
        Ok(self
            .read()
            .containers
            .get(container)
            .is_some_and(|objects| objects.contains_key(&marker)))
    }

    async fn create_folder(&self, container: &str, folder: &str) -> Result<()> {
        let marker = path::folder_marker(folder);
        let mut state = self.write();
        let objects = state
            .containers
            .get_mut(container)
            .ok_or_else(|| Error::remote(container, 404))?;
        objects.insert(
            marker,
            StoredObject {
                data: Vec::new(),
                etag: content_hash(&[]),
                content_type: None,
                metadata: Metadata::new(),
                last_modified: Timestamp::now(),
                manifest: None,
            },
        );
        state.ops.push(StoreOp::CreateFolder {
            container: container.to_string(),
            folder: folder.to_string(),
        });
        Ok(())
    }

    async fn list_folder(&self, container: &str, folder: &str) -> Result<Vec<ListingEntry>> {
        let state = self.read();
        let objects = state
            .containers
            .get(container)
            .ok_or_else(|| Error::remote(container, 404))?;

        let prefix = if folder.is_empty() {
            String::new()
        } else {
            path::folder_marker(folder)
        };

        let mut entries = Vec::new();
        let mut subdirs = BTreeSet::new();
        for (key, stored) in objects
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
        {
            let rest = &key[prefix.len()..];
            match rest.find(SEPARATOR) {
                Some(pos) => {
                    let subdir = format!("{prefix}{}", &rest[..=pos]);
                    if subdirs.insert(subdir.clone()) {
                        entries.push(ListingEntry::Subdir { subdir });
                    }
                }
                None => entries.push(ListingEntry::from_object(&to_object(container, key, stored))),
            }
        }
        Ok(entries)
    }

    async fn list_objects(&self, container: &str, prefix: &str) -> Result<Vec<StorageObject>> {
        let state = self.read();
        let objects = state
            .containers
            .get(container)
            .ok_or_else(|| Error::remote(container, 404))?;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, stored)| to_object(container, key, stored))
            .collect())
    }

    async fn get_object(&self, container: &str, key: &str) -> Result<StorageObject> {
        let state = self.read();
        let stored = lookup(&state, container, key)?;
        let mut object = to_object(container, key, stored);

        if let Some(manifest) = &stored.manifest {
            let segments = resolve_segments(&state, manifest)?;
            object.size_bytes = segments.iter().map(|s| s.size_bytes).sum();
            let joined: String = segments
                .iter()
                .filter_map(|s| s.etag.as_deref())
                .collect();
            object.etag = Some(content_hash(joined.as_bytes()));
        }

        Ok(object)
    }

    async fn put_object(
        &self,
        container: &str,
        key: &str,
        data: Vec<u8>,
        metadata: &Metadata,
    ) -> Result<StorageObject> {
        let mut state = self.write();
        if let Some(status) = state.put_failures.remove(key) {
            return Err(Error::remote(format!("{container}/{key}"), status));
        }

        let stored = StoredObject {
            etag: content_hash(&data),
            data,
            content_type: None,
            metadata: metadata.clone(),
            last_modified: Timestamp::now(),
            manifest: None,
        };
        let object = to_object(container, key, &stored);

        state
            .containers
            .get_mut(container)
            .ok_or_else(|| Error::remote(container, 404))?
            .insert(key.to_string(), stored);
        state.ops.push(StoreOp::Put {
            container: container.to_string(),
            key: key.to_string(),
        });
        Ok(object)
    }

    async fn delete_object(&self, container: &str, key: &str) -> Result<()> {
        let mut state = self.write();
        state
            .containers
            .get_mut(container)
            .and_then(|objects| objects.remove(key))
            .ok_or_else(|| Error::remote(format!("{container}/{key}"), 404))?;
        state.ops.push(StoreOp::Delete {
            container: container.to_string(),
            key: key.to_string(),
        });
        Ok(())
    }

    async fn put_manifest(&self, manifest: &StorageManifest) -> Result<()> {
        let container = manifest.container();
        let key = manifest.object_name();
        let mut state = self.write();

        if let Some(status) = state.manifest_failure.take() {
            return Err(Error::remote(format!("{container}/{key}"), status));
        }

        let data = match manifest {
            StorageManifest::Static(m) => {
                for segment in m.segments() {
                    let stored = lookup(&state, &segment.container, &segment.key)
                        .map_err(|_| Error::remote(format!("{container}/{key}"), 400))?;
                    if stored.data.len() as u64 != segment.size_bytes {
                        return Err(Error::remote(format!("{container}/{key}"), 400));
                    }
                }
                m.to_json()?.into_bytes()
            }
            StorageManifest::Dynamic(_) => Vec::new(),
        };

        let stored = StoredObject {
            etag: content_hash(&data),
            data,
            content_type: manifest.content_type().map(str::to_string),
            metadata: manifest.metadata().clone(),
            last_modified: Timestamp::now(),
            manifest: Some(manifest.clone()),
        };

        state
            .containers
            .get_mut(container)
            .ok_or_else(|| Error::remote(container, 404))?
            .insert(key.to_string(), stored);
        state.ops.push(StoreOp::PutManifest {
            container: container.to_string(),
            key: key.to_string(),
            kind: manifest.kind(),
        });
        Ok(())
    }
}
