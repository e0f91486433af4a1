//! Storage data model
//!
//! Objects, manifests and folders as seen by the client. Folders exist only
//! in memory; the service itself knows nothing but flat keys.

use std::collections::BTreeMap;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::path::{self, SEPARATOR};

/// Free-form object metadata
pub type Metadata = BTreeMap<String, String>;

/// Hex digest used as the content hash of stored data
pub fn content_hash(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// An object stored in a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageObject {
    /// Container holding the object
    pub container: String,

    /// Full key, including any folder-like prefix
    pub key: String,

    /// Trailing path segment of the key
    pub name: String,

    /// Size in bytes
    pub size_bytes: u64,

    /// Content hash reported by the service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Last modified timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,

    /// Content type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// User metadata
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
}

impl StorageObject {
    /// Create a new StorageObject; the friendly name is derived from the key
    pub fn new(container: impl Into<String>, key: impl Into<String>, size_bytes: u64) -> Self {
        let key = key.into();
        Self {
            container: container.into(),
            name: path::friendly_name(&key).to_string(),
            key,
            size_bytes,
            etag: None,
            last_modified: None,
            content_type: None,
            metadata: Metadata::new(),
        }
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    pub fn with_last_modified(mut self, ts: Timestamp) -> Self {
        self.last_modified = Some(ts);
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Human-readable size
    pub fn size_human(&self) -> String {
        humansize::format_size(self.size_bytes, humansize::BINARY)
    }

    /// Whether the key denotes a folder marker (`a/b/`)
    pub fn is_folder_marker(&self) -> bool {
        self.key.ends_with(SEPARATOR)
    }
}

/// Manifest listing every segment explicitly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticManifest {
    pub container: String,
    pub object_name: String,
    pub metadata: Metadata,
    pub content_type: Option<String>,
    /// Container the segments live in
    pub segment_container: String,
    segments: Vec<StorageObject>,
}

/// One entry of a static manifest index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// `/{container}/{key}` of the segment
    pub path: String,
    pub size_bytes: u64,
    pub etag: Option<String>,
}

impl StaticManifest {
    /// Create a static manifest; the segment list must not be empty
    pub fn new(
        container: impl Into<String>,
        object_name: impl Into<String>,
        metadata: Metadata,
        segment_container: impl Into<String>,
        segments: Vec<StorageObject>,
    ) -> Result<Self> {
        let object_name = object_name.into();
        if segments.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "static manifest for '{object_name}' needs at least one segment"
            )));
        }
        Ok(Self {
            container: container.into(),
            object_name,
            metadata,
            content_type: None,
            segment_container: segment_container.into(),
            segments,
        })
    }

    /// Segments in upload order
    pub fn segments(&self) -> &[StorageObject] {
        &self.segments
    }

    /// Total size of all segments
    pub fn total_size(&self) -> u64 {
        self.segments.iter().map(|s| s.size_bytes).sum()
    }

    /// Index entries referencing each segment
    pub fn entries(&self) -> Vec<ManifestEntry> {
        self.segments
            .iter()
            .map(|s| ManifestEntry {
                path: format!("/{}/{}", s.container, s.key),
                size_bytes: s.size_bytes,
                etag: s.etag.clone(),
            })
            .collect()
    }

    /// Serialized index, as sent to the service
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.entries())?)
    }
}

/// Manifest pointing at a shared segment prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicManifest {
    pub container: String,
    pub object_name: String,
    pub metadata: Metadata,
    pub content_type: Option<String>,
    /// `{segment_container}/{object_name}/`
    pub segments_path: String,
}

impl DynamicManifest {
    pub fn new(
        container: impl Into<String>,
        object_name: impl Into<String>,
        metadata: Metadata,
        segment_container: &str,
    ) -> Self {
        let object_name = object_name.into();
        let segments_path = format!(
            "{segment_container}{SEPARATOR}{}",
            path::folder_marker(&object_name)
        );
        Self {
            container: container.into(),
            object_name,
            metadata,
            content_type: None,
            segments_path,
        }
    }

    /// Value of the object-manifest pointer header
    pub fn object_manifest(&self) -> &str {
        &self.segments_path
    }

    /// Split the pointer back into (segment container, key prefix)
    pub fn segment_location(&self) -> (&str, &str) {
        match self.segments_path.split_once(SEPARATOR) {
            Some((container, prefix)) => (container, prefix),
            None => (self.segments_path.as_str(), ""),
        }
    }
}

/// A large object assembled from segments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageManifest {
    Static(StaticManifest),
    Dynamic(DynamicManifest),
}

impl StorageManifest {
    pub fn container(&self) -> &str {
        match self {
            StorageManifest::Static(m) => &m.container,
            StorageManifest::Dynamic(m) => &m.container,
        }
    }

    pub fn object_name(&self) -> &str {
        match self {
            StorageManifest::Static(m) => &m.object_name,
            StorageManifest::Dynamic(m) => &m.object_name,
        }
    }

    pub fn metadata(&self) -> &Metadata {
        match self {
            StorageManifest::Static(m) => &m.metadata,
            StorageManifest::Dynamic(m) => &m.metadata,
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        match self {
            StorageManifest::Static(m) => m.content_type.as_deref(),
            StorageManifest::Dynamic(m) => m.content_type.as_deref(),
        }
    }

    /// Set the content type reported for the assembled object
    pub fn with_content_type(mut self, content_type: Option<String>) -> Self {
        match &mut self {
            StorageManifest::Static(m) => m.content_type = content_type,
            StorageManifest::Dynamic(m) => m.content_type = content_type,
        }
        self
    }

    pub fn is_static(&self) -> bool {
        matches!(self, StorageManifest::Static(_))
    }

    /// Short label for logs and output
    pub fn kind(&self) -> &'static str {
        match self {
            StorageManifest::Static(_) => "static",
            StorageManifest::Dynamic(_) => "dynamic",
        }
    }
}

/// A folder derived from flat keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageFolder {
    /// Trailing segment of the folder path
    pub name: String,

    /// Ancestor chain joined by the separator
    pub full_path: String,

    pub folders: Vec<StorageFolder>,
    pub objects: Vec<StorageObject>,
}

impl StorageFolder {
    /// Create an empty folder
    pub fn new(name: impl Into<String>, full_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            full_path: full_path.into(),
            folders: Vec::new(),
            objects: Vec::new(),
        }
    }

    /// Direct child folder with the given name
    pub fn folder(&self, name: &str) -> Option<&StorageFolder> {
        self.folders.iter().find(|f| f.name == name)
    }

    /// Child folder with the given name, created when absent
    pub(crate) fn folder_or_insert(&mut self, name: &str) -> &mut StorageFolder {
        match self.folders.iter().position(|f| f.name == name) {
            Some(idx) => &mut self.folders[idx],
            None => {
                let full_path = format!("{}{SEPARATOR}{name}", self.full_path);
                self.folders.push(StorageFolder::new(name, full_path));
                let last = self.folders.len() - 1;
                &mut self.folders[last]
            }
        }
    }

    /// Number of objects in this folder and all descendants
    pub fn object_count(&self) -> usize {
        self.objects.len()
            + self
                .folders
                .iter()
                .map(StorageFolder::object_count)
                .sum::<usize>()
    }

    /// Total size of objects in this folder and all descendants
    pub fn total_size(&self) -> u64 {
        self.objects.iter().map(|o| o.size_bytes).sum::<u64>()
            + self
                .folders
                .iter()
                .map(StorageFolder::total_size)
                .sum::<u64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_object_name_from_key() {
        let obj = StorageObject::new("photos", "2024/may/cat.jpg", 1024);
        assert_eq!(obj.name, "cat.jpg");
        assert_eq!(obj.size_bytes, 1024);
        assert!(!obj.is_folder_marker());

        let marker = StorageObject::new("photos", "2024/may/", 0);
        assert_eq!(marker.name, "may");
        assert!(marker.is_folder_marker());
    }

    #[test]
    fn test_content_hash() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(content_hash(b"a"), content_hash(b"b"));
    }

    #[test]
    fn test_static_manifest_rejects_empty() {
        let result = StaticManifest::new("c", "o", Metadata::new(), "c_segments", vec![]);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_static_manifest_json() {
        let segments = vec![
            StorageObject::new("c_segments", "big.iso/0000000000", 10).with_etag("aa"),
            StorageObject::new("c_segments", "big.iso/0000000001", 4).with_etag("bb"),
        ];
        let manifest =
            StaticManifest::new("c", "big.iso", Metadata::new(), "c_segments", segments).unwrap();
        assert_eq!(manifest.total_size(), 14);

        let json: serde_json::Value = serde_json::from_str(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"path": "/c_segments/big.iso/0000000000", "size_bytes": 10, "etag": "aa"},
                {"path": "/c_segments/big.iso/0000000001", "size_bytes": 4, "etag": "bb"},
            ])
        );
    }

    #[test]
    fn test_dynamic_manifest_pointer() {
        let manifest = DynamicManifest::new("c", "videos/big.mp4", Metadata::new(), "c_segments");
        assert_eq!(manifest.object_manifest(), "c_segments/videos/big.mp4/");
        assert_eq!(
            manifest.segment_location(),
            ("c_segments", "videos/big.mp4/")
        );

        let manifest = StorageManifest::Dynamic(manifest);
        assert_eq!(manifest.kind(), "dynamic");
        assert_eq!(manifest.container(), "c");
        assert!(!manifest.is_static());
    }

    #[test]
    fn test_folder_or_insert_reuses_existing() {
        let mut root = StorageFolder::new("a", "a");
        root.folder_or_insert("b").objects.push(StorageObject::new("c", "a/b/x", 1));
        root.folder_or_insert("b");
        assert_eq!(root.folders.len(), 1);
        assert_eq!(root.folder("b").unwrap().full_path, "a/b");
        assert_eq!(root.object_count(), 1);
        assert_eq!(root.total_size(), 1);
    }
}
