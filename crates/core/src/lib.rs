//! largo-core: segmented large object engine
//!
//! This crate provides the storage-agnostic parts of largo:
//! - Data model for objects, manifests and folders
//! - The `ObjectStore` boundary trait and an in-memory implementation
//! - Segment planning, sequential segment upload and manifest selection
//! - Large object creation with resume
//! - Folder projection of flat key listings
//! - Configuration and profile management

pub mod config;
pub mod creator;
pub mod error;
pub mod folder;
pub mod manifest;
pub mod memory;
pub mod object;
pub mod path;
pub mod profile;
pub mod segment;
pub mod traits;
pub mod upload;

pub use config::{Config, ConfigManager, UploadDefaults};
pub use creator::{CreateRequest, CreatedObject, LargeObjectCreator};
pub use error::{Error, Result};
pub use manifest::build_manifest;
pub use memory::MemoryStore;
pub use object::{
    DynamicManifest, Metadata, StaticManifest, StorageFolder, StorageManifest, StorageObject,
};
pub use path::{parse_remote_path, ObjectPath};
pub use profile::{Profile, ProfileManager};
pub use traits::{ListingEntry, ObjectStore};
pub use upload::{Cancellation, ProgressFn, SegmentProgress};
