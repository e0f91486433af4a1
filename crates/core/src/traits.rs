//! ObjectStore trait definition
//!
//! This trait defines the interface to a flat-namespace object storage service.
//! It keeps the segmenting and projection logic decoupled from any transport,
//! and is mocked in tests.

use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::folder;
use crate::object::{Metadata, StorageFolder, StorageManifest, StorageObject};

/// One entry of a delimiter listing as returned by the service
///
/// The service already splits a listing into `subdir` markers (common
/// prefixes) and plain objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListingEntry {
    /// Common prefix, e.g. `photos/2024/`
    Subdir { subdir: String },

    /// Plain object
    Object {
        name: String,
        bytes: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hash: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_modified: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
    },
}

impl ListingEntry {
    /// Listing entry describing an existing object
    pub fn from_object(object: &StorageObject) -> Self {
        ListingEntry::Object {
            name: object.key.clone(),
            bytes: object.size_bytes,
            hash: object.etag.clone(),
            last_modified: object.last_modified.map(|ts| ts.to_string()),
            content_type: object.content_type.clone(),
        }
    }
}

/// Parse a listing timestamp
///
/// Accepts RFC 3339 with an offset, or a civil datetime which is read as UTC.
pub fn parse_listing_timestamp(value: &str) -> Option<Timestamp> {
    if let Ok(ts) = value.parse::<Timestamp>() {
        return Some(ts);
    }
    value
        .parse::<jiff::civil::DateTime>()
        .ok()
        .and_then(|dt| dt.to_zoned(jiff::tz::TimeZone::UTC).ok())
        .map(|zoned| zoned.timestamp())
}

/// Trait for flat-namespace object storage operations
///
/// Keys are full path strings; folders are marker objects whose key ends
/// with the separator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Check if a container exists
    async fn container_exists(&self, container: &str) -> Result<bool>;

    /// Create a container
    async fn create_container(&self, container: &str) -> Result<()>;

    /// Check if a folder marker exists in a container
    async fn folder_exists(&self, container: &str, folder: &str) -> Result<bool>;

    /// Create an empty folder marker
    async fn create_folder(&self, container: &str, folder: &str) -> Result<()>;

    /// One level of a delimiter listing below `folder` (empty for the container root)
    async fn list_folder(&self, container: &str, folder: &str) -> Result<Vec<ListingEntry>>;

    /// Flat listing of every object whose key starts with `prefix`
    async fn list_objects(&self, container: &str, prefix: &str) -> Result<Vec<StorageObject>>;

    /// Get object metadata; manifests report their assembled size
    async fn get_object(&self, container: &str, key: &str) -> Result<StorageObject>;

    /// Upload an object, replacing any previous content
    async fn put_object(
        &self,
        container: &str,
        key: &str,
        data: Vec<u8>,
        metadata: &Metadata,
    ) -> Result<StorageObject>;

    /// Delete an object
    async fn delete_object(&self, container: &str, key: &str) -> Result<()>;

    /// Persist a manifest object
    async fn put_manifest(&self, manifest: &StorageManifest) -> Result<()>;

    /// Shallow folder view of one listing level
    async fn get_folder(&self, container: &str, folder: &str) -> Result<StorageFolder> {
        let payload = self.list_folder(container, folder).await?;
        folder::project_shallow(container, folder, &payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_entry_json() {
        let payload = r#"[
            {"subdir": "photos/2024/"},
            {"name": "photos/cover.jpg", "bytes": 2048, "hash": "abc",
             "last_modified": "2024-05-01T10:00:00.000000", "content_type": "image/jpeg"}
        ]"#;
        let entries: Vec<ListingEntry> = serde_json::from_str(payload).unwrap();
        assert_eq!(
            entries[0],
            ListingEntry::Subdir {
                subdir: "photos/2024/".into()
            }
        );
        match &entries[1] {
            ListingEntry::Object { name, bytes, .. } => {
                assert_eq!(name, "photos/cover.jpg");
                assert_eq!(*bytes, 2048);
            }
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn test_parse_listing_timestamp() {
        let civil = parse_listing_timestamp("2024-05-01T10:00:00.000000").unwrap();
        let rfc = parse_listing_timestamp("2024-05-01T10:00:00Z").unwrap();
        assert_eq!(civil, rfc);
        assert!(parse_listing_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_listing_entry_from_object() {
        let obj = StorageObject::new("c", "a/b.txt", 3).with_etag("e");
        let entry = ListingEntry::from_object(&obj);
        assert_eq!(
            entry,
            ListingEntry::Object {
                name: "a/b.txt".into(),
                bytes: 3,
                hash: Some("e".into()),
                last_modified: None,
                content_type: None,
            }
        );
    }
}
