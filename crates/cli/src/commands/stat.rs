//! stat command - Show object metadata
//!
//! For a large object the reported size and hash cover the assembled content.

use clap::Args;
use largo_core::{Metadata, ObjectStore as _};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Show object metadata
#[derive(Args, Debug)]
pub struct StatArgs {
    /// Object path (profile/container/key)
    pub path: String,
}

#[derive(Debug, Serialize)]
struct StatOutput {
    container: String,
    key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_modified: Option<String>,
    size_bytes: u64,
    size_human: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(skip_serializing_if = "Metadata::is_empty")]
    metadata: Metadata,
}

/// Execute the stat command
pub async fn execute(args: StatArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let (path, store) = match super::open_remote(&args.path, &formatter).await {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    if path.key.is_empty() {
        formatter.error(&format!(
            "Invalid path '{}'. Expected: profile/container/key",
            args.path
        ));
        return ExitCode::UsageError;
    }

    let info = match store.get_object(&path.container, &path.key).await {
        Ok(info) => info,
        Err(e) => {
            formatter.error(&format!("Failed to get object metadata: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    if formatter.is_json() {
        formatter.json(&StatOutput {
            container: info.container.clone(),
            key: info.key.clone(),
            last_modified: info.last_modified.map(|ts| ts.to_string()),
            size_bytes: info.size_bytes,
            size_human: info.size_human(),
            etag: info.etag.clone(),
            content_type: info.content_type.clone(),
            metadata: info.metadata,
        });
        return ExitCode::Success;
    }

    formatter.println(&format!("Name      : {}", info.key));
    if let Some(modified) = info.last_modified {
        formatter.println(&format!(
            "Date      : {}",
            modified.strftime("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    formatter.println(&format!(
        "Size      : {} ({} bytes)",
        info.size_human(),
        info.size_bytes
    ));
    if let Some(etag) = &info.etag {
        formatter.println(&format!("ETag      : {etag}"));
    }
    if let Some(ct) = &info.content_type {
        formatter.println(&format!("Type      : {ct}"));
    }
    for (key, value) in &info.metadata {
        formatter.println(&format!("Meta      : {key}={value}"));
    }

    ExitCode::Success
}
