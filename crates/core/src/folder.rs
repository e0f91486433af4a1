//! Folder projection
//!
//! The storage service returns flat keys. These functions rebuild the folder
//! hierarchy implied by the `/` naming convention, either for a whole listing
//! (`project`) or for one level of a delimiter listing (`project_shallow`).
//! Both are pure and keep no state between calls.

use crate::error::{Error, Result};
use crate::object::{StorageFolder, StorageObject};
use crate::path::{self, SEPARATOR};
use crate::traits::{parse_listing_timestamp, ListingEntry};

const DOUBLE_SEPARATOR: &str = "//";

/// Project a flat object listing into root-level folder trees
///
/// Objects are visited longest key first, so a shallow folder marker such as
/// `a/` lands on the folder its deeper descendants already created. Keys with
/// an empty path segment (`a//b`) and keys without any folder prefix are
/// skipped. A key ending in the separator only creates folders.
pub fn project(mut objects: Vec<StorageObject>) -> Vec<StorageFolder> {
    objects.sort_by(|a, b| b.key.len().cmp(&a.key.len()));

    let mut roots: Vec<StorageFolder> = Vec::new();

    for object in objects {
        if object.key.contains(DOUBLE_SEPARATOR) {
            tracing::trace!(key = %object.key, "skipping key with empty path segment");
            continue;
        }

        let Some((parent, leaf)) = object.key.rsplit_once(SEPARATOR) else {
            tracing::trace!(key = %object.key, "skipping key without folder prefix");
            continue;
        };

        let chain: Vec<String> = parent.split(SEPARATOR).map(str::to_string).collect();
        let has_leaf = !leaf.is_empty();

        let Some((first, rest)) = chain.split_first() else {
            continue;
        };

        let mut folder = root_or_insert(&mut roots, first);
        for name in rest {
            folder = folder.folder_or_insert(name);
        }

        if has_leaf {
            folder.objects.push(object);
        }
    }

    roots
}

fn root_or_insert<'a>(roots: &'a mut Vec<StorageFolder>, name: &str) -> &'a mut StorageFolder {
    match roots.iter().position(|f| f.name == name) {
        Some(idx) => &mut roots[idx],
        None => {
            roots.push(StorageFolder::new(name, name));
            let last = roots.len() - 1;
            &mut roots[last]
        }
    }
}

/// Build a single shallow folder from one level of a delimiter listing
///
/// `subdir` entries become empty child folders and plain entries become
/// leaves; the folder's own marker object is not reported as a leaf. An
/// empty payload fails with [`Error::NotFound`] because the service answers
/// the same way for a missing folder and for one without any marker.
pub fn project_shallow(
    container: &str,
    folder_name: &str,
    payload: &[ListingEntry],
) -> Result<StorageFolder> {
    if payload.is_empty() {
        return Err(Error::NotFound(format!(
            "folder '{folder_name}' in container '{container}'"
        )));
    }

    let full_path = folder_name.trim_end_matches(SEPARATOR);
    let marker = (!full_path.is_empty()).then(|| path::folder_marker(full_path));
    let mut folder = StorageFolder::new(path::friendly_name(full_path), full_path);

    for entry in payload {
        match entry {
            ListingEntry::Subdir { subdir } => {
                let sub_path = subdir.trim_end_matches(SEPARATOR);
                folder
                    .folders
                    .push(StorageFolder::new(path::friendly_name(sub_path), sub_path));
            }
            ListingEntry::Object {
                name,
                bytes,
                hash,
                last_modified,
                content_type,
            } => {
                if marker.as_deref() == Some(name.as_str()) {
                    continue;
                }

                let mut object = StorageObject::new(container, name.as_str(), *bytes);
                object.etag = hash.clone();
                object.last_modified = last_modified.as_deref().and_then(parse_listing_timestamp);
                object.content_type = content_type.clone();
                folder.objects.push(object);
            }
        }
    }

    Ok(folder)
}
