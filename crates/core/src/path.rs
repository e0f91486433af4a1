//! Path parsing and object key helpers
//!
//! Handles parsing of remote paths in the format: profile/container[/key]
//!
//! Object stores handled here have no folders: a key is the full path string
//! and `/` is only a naming convention. The helpers at the bottom of this
//! module derive names and segment ids from such keys.

use crate::error::{Error, Result};

/// Separator used by the folder naming convention
pub const SEPARATOR: char = '/';

/// Width of the zero-padded segment id appended to an object key
pub const SEGMENT_ID_WIDTH: usize = 10;

/// A parsed remote path pointing to a storage location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPath {
    /// Profile name
    pub profile: String,
    /// Container name
    pub container: String,
    /// Object key (empty for container root)
    pub key: String,
    /// Whether the path ends with a slash (folder semantics)
    pub is_dir: bool,
}

impl ObjectPath {
    /// Create a new ObjectPath
    pub fn new(
        profile: impl Into<String>,
        container: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        let key = key.into();
        let is_dir = key.ends_with(SEPARATOR) || key.is_empty();
        Self {
            profile: profile.into(),
            container: container.into(),
            key,
            is_dir,
        }
    }

    /// Key with any trailing separator removed, as used for folder lookups
    pub fn folder_key(&self) -> &str {
        self.key.trim_end_matches(SEPARATOR)
    }

    /// Join a child path component
    pub fn join(&self, child: &str) -> Self {
        let base = self.key.trim_end_matches(SEPARATOR);
        let key = if base.is_empty() {
            child.to_string()
        } else {
            format!("{base}/{child}")
        };
        let is_dir = child.ends_with(SEPARATOR);
        Self {
            profile: self.profile.clone(),
            container: self.container.clone(),
            key,
            is_dir,
        }
    }
}

/// Parse a remote path of the form `profile/container[/key]`
pub fn parse_remote_path(path: &str) -> Result<ObjectPath> {
    if path.is_empty() {
        return Err(Error::InvalidPath("Path cannot be empty".into()));
    }

    let parts: Vec<&str> = path.splitn(3, SEPARATOR).collect();
    let (profile, container, key) = match parts.as_slice() {
        [profile, container] => (*profile, *container, ""),
        [profile, container, key] => (*profile, *container, *key),
        _ => {
            return Err(Error::InvalidPath(format!(
                "Path '{path}' is incomplete. Use format: profile/container[/key]"
            )));
        }
    };

    if !is_valid_profile_name(profile) {
        return Err(Error::InvalidPath(format!(
            "Invalid profile name '{profile}' in '{path}'"
        )));
    }
    if container.is_empty() {
        return Err(Error::InvalidPath("Container name cannot be empty".into()));
    }

    Ok(ObjectPath::new(profile, container, key))
}

/// Check if a string is a valid profile name
pub fn is_valid_profile_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Friendly name of a key: its trailing path segment
///
/// A single trailing separator is ignored, so a folder marker `a/b/` is named `b`.
pub fn friendly_name(key: &str) -> &str {
    let trimmed = key.strip_suffix(SEPARATOR).unwrap_or(key);
    match trimmed.rfind(SEPARATOR) {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}

/// Key of the folder marker object for `folder`
pub fn folder_marker(folder: &str) -> String {
    format!("{}{SEPARATOR}", folder.trim_end_matches(SEPARATOR))
}

/// Key under which segment `id` of `object_name` is stored
pub fn segment_key(object_name: &str, id: u64) -> String {
    format!(
        "{object_name}{SEPARATOR}{id:0width$}",
        width = SEGMENT_ID_WIDTH
    )
}

/// Parse a segment's friendly name back into its id
///
/// Only plain ASCII digits are accepted; anything else is a foreign name.
pub fn parse_segment_id(name: &str) -> Option<u64> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}
