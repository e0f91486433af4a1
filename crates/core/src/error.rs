//! Error types for largo-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use thiserror::Error;

/// Result type alias for largo-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for largo-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Structurally invalid input, detected before any remote call
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The storage service answered a create/get/delete call with an unexpected status
    #[error("Remote operation on '{target}' failed with status {status}")]
    RemoteOperationFailed { target: String, status: u16 },

    /// Uploading one segment failed; earlier segments stay in place for a resumed call
    #[error("Failed to upload segment {segment_id} of '{object}': {source}")]
    SegmentUpload {
        object: String,
        segment_id: u64,
        #[source]
        source: Box<Error>,
    },

    /// Every segment exists but persisting or fetching the manifest failed
    #[error(
        "Failed to assemble large object '{object}' in container '{container}' (segments are uploaded, retry assembly): {source}"
    )]
    AssemblyFailed {
        container: String,
        object: String,
        #[source]
        source: Box<Error>,
    },

    /// Upload stopped between segments on request
    #[error("Upload of '{object}' cancelled before segment {next_segment}")]
    Cancelled { object: String, next_segment: u64 },

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Profile not found
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Shorthand for a remote failure on a named target
    pub fn remote(target: impl Into<String>, status: u16) -> Self {
        Error::RemoteOperationFailed {
            target: target.into(),
            status,
        }
    }

    /// Whether this error happened after all segments were uploaded
    ///
    /// Retrying such a failure only re-runs manifest assembly.
    pub fn is_assembly_failure(&self) -> bool {
        matches!(self, Error::AssemblyFailed { .. })
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_) | Error::InvalidPath(_) | Error::Config(_) => 2, // UsageError
            Error::RemoteOperationFailed { status, .. } => match status {
                401 | 403 => 4, // AuthError
                404 => 5,       // NotFound
                409 | 412 => 6, // Conflict
                _ => 3,         // NetworkError
            },
            Error::SegmentUpload { source, .. } | Error::AssemblyFailed { source, .. } => {
                source.exit_code()
            }
            Error::NotFound(_) | Error::ProfileNotFound(_) => 5, // NotFound
            Error::Conflict(_) => 6,                             // Conflict
            Error::Cancelled { .. } => 130,                      // Interrupted
            _ => 1,                                              // GeneralError
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(Error::InvalidArgument("test".into()).exit_code(), 2);
        assert_eq!(Error::InvalidPath("test".into()).exit_code(), 2);
        assert_eq!(Error::Config("test".into()).exit_code(), 2);
        assert_eq!(Error::remote("c/o", 503).exit_code(), 3);
        assert_eq!(Error::remote("c/o", 401).exit_code(), 4);
        assert_eq!(Error::remote("c/o", 404).exit_code(), 5);
        assert_eq!(Error::NotFound("test".into()).exit_code(), 5);
        assert_eq!(Error::ProfileNotFound("test".into()).exit_code(), 5);
        assert_eq!(Error::Conflict("test".into()).exit_code(), 6);
        assert_eq!(
            Error::Cancelled {
                object: "o".into(),
                next_segment: 3
            }
            .exit_code(),
            130
        );
        assert_eq!(Error::General("test".into()).exit_code(), 1);
    }

    #[test]
    fn test_wrapped_errors_use_source_exit_code() {
        let err = Error::AssemblyFailed {
            container: "c".into(),
            object: "o".into(),
            source: Box::new(Error::remote("c/o", 404)),
        };
        assert_eq!(err.exit_code(), 5);
        assert!(err.is_assembly_failure());

        let err = Error::SegmentUpload {
            object: "o".into(),
            segment_id: 2,
            source: Box::new(Error::remote("c_segments/o/0000000002", 500)),
        };
        assert_eq!(err.exit_code(), 3);
        assert!(!err.is_assembly_failure());
    }

    #[test]
    fn test_error_display() {
        let err = Error::ProfileNotFound("local".into());
        assert_eq!(err.to_string(), "Profile not found: local");

        let err = Error::remote("photos/cat.jpg", 500);
        assert_eq!(
            err.to_string(),
            "Remote operation on 'photos/cat.jpg' failed with status 500"
        );

        let err = Error::SegmentUpload {
            object: "big.iso".into(),
            segment_id: 7,
            source: Box::new(Error::remote("seg/big.iso/0000000007", 503)),
        };
        assert!(err.to_string().contains("segment 7 of 'big.iso'"));
    }
}
