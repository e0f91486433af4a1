//! Filesystem object store
//!
//! Layout below the root:
//!
//! ```text
//! <root>/<container>/<key digest>.obj    object content
//! <root>/<container>/<key digest>.meta   JSON record
//! ```
//!
//! File names are the SHA-256 digest of the key, so keys of any length or
//! script map to a fixed-length name. The key itself lives in the record.
//! The record is written after the content and removed before it, so a
//! record always points at complete data.
//!
//! Listings report a static manifest with the size of its segments and a
//! dynamic one with zero bytes; `get_object` resolves both.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use largo_core::object::{content_hash, ManifestEntry};
use largo_core::path::{self, SEPARATOR};
use largo_core::{
    Error, ListingEntry, Metadata, ObjectStore, Profile, Result, StorageManifest, StorageObject,
};

const DATA_SUFFIX: &str = ".obj";
const RECORD_SUFFIX: &str = ".meta";

/// Sidecar record of one stored object
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ObjectRecord {
    key: String,
    size_bytes: u64,
    etag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(default)]
    metadata: Metadata,
    last_modified: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    manifest: Option<ManifestRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum ManifestRecord {
    Static { segments: Vec<ManifestEntry> },
    Dynamic { object_manifest: String },
}

impl ObjectRecord {
    fn to_object(&self, container: &str) -> StorageObject {
        let mut object = StorageObject::new(container, self.key.as_str(), self.size_bytes)
            .with_etag(self.etag.as_str())
            .with_last_modified(self.last_modified)
            .with_metadata(self.metadata.clone());
        object.content_type = self.content_type.clone();
        object
    }
}

/// Object store rooted at a local directory
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open a store at `root`, creating the directory when missing
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        tracing::debug!(root = %root.display(), "opened filesystem store");
        Ok(Self { root })
    }

    /// Open the store a profile points at
    ///
    /// Local directories need no credentials, so the profile token is not used.
    pub async fn from_profile(profile: &Profile) -> Result<Self> {
        Self::open(&profile.root).await
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Content of an object, assembling manifests from their segments
    pub async fn read_object(&self, container: &str, key: &str) -> Result<Vec<u8>> {
        let record = self.load_record(container, key).await?;
        if record.manifest.is_none() {
            return self.read_data(container, key).await;
        }

        let mut content = Vec::new();
        for segment in self.resolve_segments(container, &record).await? {
            content.extend(self.read_data(&segment.container, &segment.key).await?);
        }
        Ok(content)
    }

    fn container_dir(&self, container: &str) -> Result<PathBuf> {
        if container.is_empty()
            || container == "."
            || container == ".."
            || container.contains(SEPARATOR)
            || container.contains('\\')
        {
            return Err(Error::InvalidArgument(format!(
                "invalid container name '{container}'"
            )));
        }
        Ok(self.root.join(container))
    }

    fn object_paths(&self, container: &str, key: &str) -> Result<(PathBuf, PathBuf)> {
        let dir = self.container_dir(container)?;
        let digest = content_hash(key.as_bytes());
        Ok((
            dir.join(format!("{digest}{DATA_SUFFIX}")),
            dir.join(format!("{digest}{RECORD_SUFFIX}")),
        ))
    }

    async fn require_container(&self, container: &str) -> Result<PathBuf> {
        let dir = self.container_dir(container)?;
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(dir),
            Ok(_) => Err(Error::remote(container, 404)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::remote(container, 404)),
            Err(e) => Err(e.into()),
        }
    }

    async fn load_record(&self, container: &str, key: &str) -> Result<ObjectRecord> {
        let (_, record_path) = self.object_paths(container, key)?;
        match tokio::fs::read(&record_path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::remote(format!("{container}/{key}"), 404))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn read_data(&self, container: &str, key: &str) -> Result<Vec<u8>> {
        let (data_path, _) = self.object_paths(container, key)?;
        match tokio::fs::read(&data_path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::remote(format!("{container}/{key}"), 404))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, container: &str, data: &[u8], record: &ObjectRecord) -> Result<()> {
        self.require_container(container).await?;
        let (data_path, record_path) = self.object_paths(container, &record.key)?;
        tokio::fs::write(&data_path, data).await?;
        tokio::fs::write(&record_path, serde_json::to_vec_pretty(record)?).await?;
        Ok(())
    }

    /// Every record in a container, sorted by key
    async fn records(&self, container: &str) -> Result<Vec<ObjectRecord>> {
        let dir = self.require_container(container).await?;
        let mut entries = tokio::fs::read_dir(&dir).await?;
        let mut records = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            if !file_name.to_string_lossy().ends_with(RECORD_SUFFIX) {
                continue;
            }
            let bytes = tokio::fs::read(entry.path()).await?;
            match serde_json::from_slice::<ObjectRecord>(&bytes) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(
                    file = %entry.path().display(),
                    error = %e,
                    "skipping unreadable object record"
                ),
            }
        }

        records.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(records)
    }

    /// Segments a manifest record currently refers to, in order
    async fn resolve_segments(
        &self,
        container: &str,
        record: &ObjectRecord,
    ) -> Result<Vec<StorageObject>> {
        match &record.manifest {
            None => Ok(Vec::new()),
            Some(ManifestRecord::Static { segments }) => {
                let mut resolved = Vec::with_capacity(segments.len());
                for entry in segments {
                    let (seg_container, key) = split_segment_path(&entry.path)
                        .ok_or_else(|| Error::remote(format!("{container}/{}", record.key), 500))?;
                    resolved.push(self.load_record(seg_container, key).await?.to_object(seg_container));
                }
                Ok(resolved)
            }
            Some(ManifestRecord::Dynamic { object_manifest }) => {
                let (seg_container, prefix) = object_manifest
                    .split_once(SEPARATOR)
                    .unwrap_or((object_manifest.as_str(), ""));
                Ok(self
                    .records(seg_container)
                    .await?
                    .iter()
                    .filter(|r| r.key.starts_with(prefix) && r.key != prefix)
                    .map(|r| r.to_object(seg_container))
                    .collect())
            }
        }
    }
}

/// Split `/{container}/{key}` into its parts
fn split_segment_path(path: &str) -> Option<(&str, &str)> {
    path.strip_prefix(SEPARATOR)?.split_once(SEPARATOR)
}

#[async_trait]
impl ObjectStore for FsStore {
    async fn container_exists(&self, container: &str) -> Result<bool> {
        let dir = self.container_dir(container)?;
        match tokio::fs::metadata(&dir).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_container(&self, container: &str) -> Result<()> {
        let dir = self.container_dir(container)?;
        tokio::fs::create_dir_all(&dir).await?;
        tracing::debug!(container, "created container");
        Ok(())
    }

    async fn folder_exists(&self, container: &str, folder: &str) -> Result<bool> {
        if !self.container_exists(container).await? {
            return Ok(false);
        }
        let (_, record_path) = self.object_paths(container, &path::folder_marker(folder))?;
        Ok(tokio::fs::try_exists(&record_path).await?)
    }

    async fn create_folder(&self, container: &str, folder: &str) -> Result<()> {
        let record = ObjectRecord {
            key: path::folder_marker(folder),
            size_bytes: 0,
            etag: content_hash(&[]),
            content_type: None,
            metadata: Metadata::new(),
            last_modified: Timestamp::now(),
            manifest: None,
        };
        self.write(container, &[], &record).await?;
        tracing::debug!(container, folder, "created folder marker");
        Ok(())
    }

    async fn list_folder(&self, container: &str, folder: &str) -> Result<Vec<ListingEntry>> {
        let prefix = if folder.is_empty() {
            String::new()
        } else {
            path::folder_marker(folder)
        };

        let mut entries = Vec::new();
        let mut subdirs = BTreeSet::new();
        for record in self.records(container).await? {
            let Some(rest) = record.key.strip_prefix(prefix.as_str()) else {
                continue;
            };
            match rest.find(SEPARATOR) {
                Some(pos) => {
                    let subdir = format!("{prefix}{}", &rest[..=pos]);
                    if subdirs.insert(subdir.clone()) {
                        entries.push(ListingEntry::Subdir { subdir });
                    }
                }
                None => entries.push(ListingEntry::from_object(&record.to_object(container))),
            }
        }
        Ok(entries)
    }

    async fn list_objects(&self, container: &str, prefix: &str) -> Result<Vec<StorageObject>> {
        Ok(self
            .records(container)
            .await?
            .iter()
            .filter(|r| r.key.starts_with(prefix))
            .map(|r| r.to_object(container))
            .collect())
    }

    async fn get_object(&self, container: &str, key: &str) -> Result<StorageObject> {
        let record = self.load_record(container, key).await?;
        let mut object = record.to_object(container);

        if record.manifest.is_some() {
            let segments = self.resolve_segments(container, &record).await?;
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
        let record = ObjectRecord {
            key: key.to_string(),
            size_bytes: data.len() as u64,
            etag: content_hash(&data),
            content_type: None,
            metadata: metadata.clone(),
            last_modified: Timestamp::now(),
            manifest: None,
        };
        self.write(container, &data, &record).await?;
        Ok(record.to_object(container))
    }

    async fn delete_object(&self, container: &str, key: &str) -> Result<()> {
        let (data_path, record_path) = self.object_paths(container, key)?;
        match tokio::fs::remove_file(&record_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::remote(format!("{container}/{key}"), 404));
            }
            Err(e) => return Err(e.into()),
        }
        match tokio::fs::remove_file(&data_path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    async fn put_manifest(&self, manifest: &StorageManifest) -> Result<()> {
        let container = manifest.container();
        let key = manifest.object_name();
        let target = format!("{container}/{key}");

        let (data, listed_size, record) = match manifest {
            StorageManifest::Static(m) => {
                for segment in m.segments() {
                    let stored = self
                        .load_record(&segment.container, &segment.key)
                        .await
                        .map_err(|_| Error::remote(target.as_str(), 400))?;
                    if stored.size_bytes != segment.size_bytes {
                        return Err(Error::remote(target.as_str(), 400));
                    }
                }
                (
                    m.to_json()?.into_bytes(),
                    m.total_size(),
                    ManifestRecord::Static {
                        segments: m.entries(),
                    },
                )
            }
            StorageManifest::Dynamic(m) => (
                Vec::new(),
                0,
                ManifestRecord::Dynamic {
                    object_manifest: m.object_manifest().to_string(),
                },
            ),
        };

        let record = ObjectRecord {
            key: key.to_string(),
            size_bytes: listed_size,
            etag: content_hash(&data),
            content_type: manifest.content_type().map(str::to_string),
            metadata: manifest.metadata().clone(),
            last_modified: Timestamp::now(),
            manifest: Some(record),
        };
        self.write(container, &data, &record).await?;
        tracing::debug!(container, key, kind = manifest.kind(), "stored manifest");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use largo_core::object::{DynamicManifest, StaticManifest};
    use largo_core::{CreateRequest, LargeObjectCreator};
    use std::io::Cursor;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn temp_store() -> (FsStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FsStore::open(temp_dir.path().join("store")).await.unwrap();
        (store, temp_dir)
    }

    async fn put(store: &FsStore, container: &str, key: &str, data: &[u8]) -> StorageObject {
        store
            .put_object(container, key, data.to_vec(), &Metadata::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_container_lifecycle() {
        let (store, _temp_dir) = temp_store().await;
        assert!(!store.container_exists("docs").await.unwrap());
        store.create_container("docs").await.unwrap();
        assert!(store.container_exists("docs").await.unwrap());
        assert!(store.root().join("docs").is_dir());
    }

    #[tokio::test]
    async fn test_invalid_container_name() {
        let (store, _temp_dir) = temp_store().await;
        for name in ["", "..", "a/b"] {
            assert!(matches!(
                store.create_container(name).await,
                Err(Error::InvalidArgument(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_put_get_and_read() {
        let (store, _temp_dir) = temp_store().await;
        store.create_container("docs").await.unwrap();

        let mut metadata = Metadata::new();
        metadata.insert("owner".into(), "ops".into());
        let stored = store
            .put_object("docs", "reports/2024/q1.pdf", b"hello".to_vec(), &metadata)
            .await
            .unwrap();
        assert_eq!(stored.name, "q1.pdf");
        assert_eq!(stored.etag.as_deref(), Some(content_hash(b"hello").as_str()));

        let object = store.get_object("docs", "reports/2024/q1.pdf").await.unwrap();
        assert_eq!(object.size_bytes, 5);
        assert_eq!(object.metadata.get("owner").unwrap(), "ops");
        assert_eq!(
            store.read_object("docs", "reports/2024/q1.pdf").await.unwrap(),
            b"hello"
        );
    }

    #[tokio::test]
    async fn test_long_and_multibyte_keys() {
        let (store, _temp_dir) = temp_store().await;
        store.create_container("c").await.unwrap();

        let long_key = format!("{}/file.bin", "d".repeat(300));
        let accented_key = format!("{}/f", "é".repeat(50));
        let segment = largo_core::path::segment_key(&long_key, 7);

        for (key, data) in [
            (long_key.as_str(), b"long".as_slice()),
            (accented_key.as_str(), b"accented".as_slice()),
            (segment.as_str(), b"segment".as_slice()),
        ] {
            let stored = put(&store, "c", key, data).await;
            assert_eq!(stored.key, key);

            let object = store.get_object("c", key).await.unwrap();
            assert_eq!(object.size_bytes, data.len() as u64);
            assert_eq!(store.read_object("c", key).await.unwrap(), data);
        }

        let listed = store.list_objects("c", &long_key).await.unwrap();
        let keys: Vec<&str> = listed.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec![long_key.as_str(), segment.as_str()]);

        let accented = store.list_objects("c", "é").await.unwrap();
        assert_eq!(accented.len(), 1);
        assert_eq!(accented[0].name, "f");

        store.delete_object("c", &long_key).await.unwrap();
        assert!(matches!(
            store.get_object("c", &long_key).await,
            Err(Error::RemoteOperationFailed { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_object_and_container_are_404() {
        let (store, _temp_dir) = temp_store().await;
        assert!(matches!(
            store.put_object("nope", "k", vec![1], &Metadata::new()).await,
            Err(Error::RemoteOperationFailed { status: 404, .. })
        ));
        assert!(matches!(
            store.list_objects("nope", "").await,
            Err(Error::RemoteOperationFailed { status: 404, .. })
        ));

        store.create_container("docs").await.unwrap();
        assert!(matches!(
            store.get_object("docs", "missing").await,
            Err(Error::RemoteOperationFailed { status: 404, .. })
        ));
        assert!(matches!(
            store.delete_object("docs", "missing").await,
            Err(Error::RemoteOperationFailed { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_files() {
        let (store, _temp_dir) = temp_store().await;
        store.create_container("docs").await.unwrap();
        put(&store, "docs", "a/b", b"x").await;

        store.delete_object("docs", "a/b").await.unwrap();
        assert!(store.list_objects("docs", "").await.unwrap().is_empty());
        let leftovers = std::fs::read_dir(store.root().join("docs")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_folders_and_listing() {
        let (store, _temp_dir) = temp_store().await;
        assert!(!store.folder_exists("docs", "a").await.unwrap());

        store.create_container("docs").await.unwrap();
        store.create_folder("docs", "a").await.unwrap();
        assert!(store.folder_exists("docs", "a").await.unwrap());
        assert!(!store.folder_exists("docs", "b").await.unwrap());

        for key in ["a/x", "a/b/y", "a/b/z", "top"] {
            put(&store, "docs", key, b"data").await;
        }

        let entries = store.list_folder("docs", "a").await.unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.contains(&ListingEntry::Subdir {
            subdir: "a/b/".into()
        }));

        let folder = store.get_folder("docs", "a").await.unwrap();
        assert_eq!(folder.folders.len(), 1);
        assert_eq!(folder.folders[0].name, "b");
        assert_eq!(folder.objects.len(), 1);
        assert_eq!(folder.objects[0].key, "a/x");

        let flat = store.list_objects("docs", "a/b/").await.unwrap();
        let keys: Vec<&str> = flat.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a/b/y", "a/b/z"]);
    }

    #[tokio::test]
    async fn test_static_manifest_reports_assembled_size() {
        let (store, _temp_dir) = temp_store().await;
        store.create_container("c").await.unwrap();
        store.create_container("c_segments").await.unwrap();
        let segments = vec![
            put(&store, "c_segments", "big/0000000000", b"hello ").await,
            put(&store, "c_segments", "big/0000000001", b"world").await,
        ];

        let manifest = StorageManifest::Static(
            StaticManifest::new("c", "big", Metadata::new(), "c_segments", segments).unwrap(),
        )
        .with_content_type(Some("text/plain".into()));
        store.put_manifest(&manifest).await.unwrap();

        let object = store.get_object("c", "big").await.unwrap();
        assert_eq!(object.size_bytes, 11);
        assert_eq!(object.content_type.as_deref(), Some("text/plain"));
        assert_eq!(store.read_object("c", "big").await.unwrap(), b"hello world");

        let listed = store.list_objects("c", "big").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].size_bytes, 11);
    }

    #[tokio::test]
    async fn test_static_manifest_rejects_changed_segment() {
        let (store, _temp_dir) = temp_store().await;
        store.create_container("c").await.unwrap();
        let segment = put(&store, "c", "big/0000000000", b"abc").await;
        put(&store, "c", "big/0000000000", b"abcdef").await;

        let manifest = StorageManifest::Static(
            StaticManifest::new("c", "big", Metadata::new(), "c", vec![segment]).unwrap(),
        );
        assert!(matches!(
            store.put_manifest(&manifest).await,
            Err(Error::RemoteOperationFailed { status: 400, .. })
        ));
    }

    #[tokio::test]
    async fn test_dynamic_manifest_follows_prefix() {
        let (store, _temp_dir) = temp_store().await;
        store.create_container("c").await.unwrap();
        store.create_container("seg").await.unwrap();
        store.create_folder("seg", "log").await.unwrap();
        put(&store, "seg", "log/0000000000", b"ab").await;

        let manifest = StorageManifest::Dynamic(DynamicManifest::new(
            "c",
            "log",
            Metadata::new(),
            "seg",
        ));
        store.put_manifest(&manifest).await.unwrap();
        assert_eq!(store.get_object("c", "log").await.unwrap().size_bytes, 2);

        put(&store, "seg", "log/0000000001", b"cde").await;
        assert_eq!(store.get_object("c", "log").await.unwrap().size_bytes, 5);
        assert_eq!(store.read_object("c", "log").await.unwrap(), b"abcde");
    }

    #[tokio::test]
    async fn test_creator_against_filesystem() {
        let (store, _temp_dir) = temp_store().await;
        store.create_container("media").await.unwrap();
        let store = Arc::new(store);

        let data: Vec<u8> = (0..3 * 1024 * 1024).map(|i| (i % 199) as u8).collect();
        let request = CreateRequest::new("media", "clips/a.mp4", "media_segments", 3);
        let creator = LargeObjectCreator::new(store.clone());

        let created = creator
            .create(&request, &mut Cursor::new(data.clone()))
            .await
            .unwrap();
        assert_eq!(created.object.size_bytes, data.len() as u64);
        assert_eq!(created.segment_count, 3);
        assert_eq!(store.read_object("media", "clips/a.mp4").await.unwrap(), data);

        let segments = store
            .list_objects("media_segments", "clips/a.mp4/0")
            .await
            .unwrap();
        assert_eq!(segments.len(), 3);
    }
}
