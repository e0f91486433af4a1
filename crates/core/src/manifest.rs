//! Manifest selection
//!
//! Static manifests list their segments explicitly, but the service caps how
//! many segments and bytes they may reference and how small non-final
//! segments may be. Dynamic manifests only name a shared prefix and have no
//! such limits. `build_manifest` picks the static form whenever the segment
//! set fits.

use crate::error::{Error, Result};
use crate::object::{DynamicManifest, Metadata, StaticManifest, StorageManifest, StorageObject};

/// Static manifests must reference fewer segments than this
pub const MAX_STATIC_SEGMENTS: usize = 1000;

/// Static manifests must total fewer bytes than this: 5 GiB
pub const MAX_STATIC_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Minimum size of every segment but the last: 1 MiB
pub const MIN_SEGMENT_SIZE: u64 = 1024 * 1024;

/// Whether a segment set can be referenced by a static manifest
///
/// A single segment is held to the minimum size as well.
pub fn fits_static(segments: &[StorageObject]) -> bool {
    if segments.is_empty() || segments.len() >= MAX_STATIC_SEGMENTS {
        return false;
    }

    let total: u64 = segments.iter().map(|s| s.size_bytes).sum();
    if total >= MAX_STATIC_SIZE {
        return false;
    }

    let checked = match segments.len() {
        1 => segments,
        n => &segments[..n - 1],
    };
    checked.iter().all(|s| s.size_bytes >= MIN_SEGMENT_SIZE)
}

/// Build the manifest for `object_name` from its uploaded segments
pub fn build_manifest(
    container: &str,
    object_name: &str,
    metadata: &Metadata,
    segments: Vec<StorageObject>,
    segment_container: &str,
) -> Result<StorageManifest> {
    if segments.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "no segments to assemble for '{object_name}'"
        )));
    }

    let manifest = if fits_static(&segments) {
        StorageManifest::Static(StaticManifest::new(
            container,
            object_name,
            metadata.clone(),
            segment_container,
            segments,
        )?)
    } else {
        StorageManifest::Dynamic(DynamicManifest::new(
            container,
            object_name,
            metadata.clone(),
            segment_container,
        ))
    };

    tracing::debug!(
        container,
        object = object_name,
        kind = manifest.kind(),
        "built manifest"
    );

    Ok(manifest)
}
