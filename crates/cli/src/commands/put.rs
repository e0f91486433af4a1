//! put command - Upload a large object
//!
//! Splits a local file into segments, uploads them and assembles the object
//! behind a manifest. Running the same command again after a failure or an
//! interrupt resumes from the last stored segment.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use serde::Serialize;

use largo_core::{
    Cancellation, ConfigManager, CreateRequest, Error, LargeObjectCreator, Metadata, ObjectPath,
    ObjectStore as _, ProgressFn, SegmentProgress,
};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, ProgressBar};

/// Upload a file as a segmented large object
#[derive(Args, Debug)]
pub struct PutArgs {
    /// Local file to upload
    pub source: PathBuf,

    /// Target path (profile/container/key, or profile/container/folder/ to keep the file name)
    pub target: String,

    /// Number of segments (defaults to the configured value)
    #[arg(short = 's', long)]
    pub segments: Option<u32>,

    /// Container receiving the segments (defaults to the container name plus the configured suffix)
    #[arg(long)]
    pub segment_container: Option<String>,

    /// Content type (guessed from the file name when omitted)
    #[arg(long)]
    pub content_type: Option<String>,

    /// Metadata entry, repeatable
    #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_meta)]
    pub metadata: Vec<(String, String)>,
}

#[derive(Debug, Serialize)]
struct PutOutput {
    status: &'static str,
    container: String,
    key: String,
    size_bytes: u64,
    size_human: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    segment_container: String,
    segments: usize,
    manifest: &'static str,
}

/// Execute the put command
pub async fn execute(args: PutArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let config = match ConfigManager::new().and_then(|manager| manager.load()) {
        Ok(config) => config,
        Err(e) => {
            formatter.error(&format!("Failed to load configuration: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    let (path, store) = match super::open_remote(&args.target, &formatter).await {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    let key = match object_key(&path, &args.source) {
        Ok(key) => key,
        Err(message) => {
            formatter.error(&message);
            return ExitCode::UsageError;
        }
    };

    let mut file = match tokio::fs::File::open(&args.source).await {
        Ok(file) => file,
        Err(e) => {
            formatter.error(&format!("Cannot open '{}': {e}", args.source.display()));
            return match e.kind() {
                std::io::ErrorKind::NotFound => ExitCode::NotFound,
                _ => ExitCode::GeneralError,
            };
        }
    };
    let total = match file.metadata().await {
        Ok(meta) => meta.len(),
        Err(e) => {
            formatter.error(&format!("Cannot read '{}': {e}", args.source.display()));
            return ExitCode::GeneralError;
        }
    };

    match store.container_exists(&path.container).await {
        Ok(true) => {}
        Ok(false) => {
            formatter.error(&format!(
                "Container '{}/{}' not found",
                path.profile, path.container
            ));
            return ExitCode::NotFound;
        }
        Err(e) => {
            formatter.error(&format!("Failed to check container: {e}"));
            return ExitCode::from_error(&e);
        }
    }

    let segment_container = args
        .segment_container
        .unwrap_or_else(|| config.upload.segment_container(&path.container));
    let segments = args.segments.unwrap_or(config.upload.segment_count);
    let content_type = args.content_type.or_else(|| {
        mime_guess::from_path(&args.source)
            .first()
            .map(|mime| mime.to_string())
    });

    let mut request = CreateRequest::new(&path.container, &key, &segment_container, segments)
        .with_metadata(args.metadata.into_iter().collect::<Metadata>());
    request.content_type = content_type;

    let progress = ProgressBar::new(formatter.config(), total);
    progress.set_message(key.clone());
    let bar = progress.clone();
    let on_segment: ProgressFn = Arc::new(move |p: SegmentProgress| bar.set_position(p.offset));

    let cancellation = Cancellation::new();
    let trigger = cancellation.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let creator = LargeObjectCreator::new(Arc::new(store))
        .with_cancellation(cancellation)
        .with_progress(on_segment);
    let result = creator.create(&request, &mut file).await;

    interrupt.abort();
    progress.finish_and_clear();

    match result {
        Ok(created) => {
            let object = created.object;
            let count = created.segment_count;

            if formatter.is_json() {
                formatter.json(&PutOutput {
                    status: "success",
                    container: object.container.clone(),
                    key: object.key.clone(),
                    size_bytes: object.size_bytes,
                    size_human: object.size_human(),
                    etag: object.etag.clone(),
                    content_type: object.content_type.clone(),
                    segment_container,
                    segments: count,
                    manifest: created.manifest_kind,
                });
            } else {
                formatter.success(&format!(
                    "Uploaded '{}' to '{}/{}/{}' ({}, {count} segments)",
                    args.source.display(),
                    path.profile,
                    object.container,
                    object.key,
                    object.size_human(),
                ));
            }
            ExitCode::Success
        }
        Err(e) => {
            match &e {
                Error::Cancelled { next_segment, .. } => formatter.error(&format!(
                    "Upload interrupted before segment {next_segment}. Run the same command again to resume."
                )),
                Error::SegmentUpload { .. } => formatter.error(&format!(
                    "{e}. Run the same command again to resume."
                )),
                _ => formatter.error(&e.to_string()),
            }
            ExitCode::from_error(&e)
        }
    }
}

/// Object key for the upload; a folder target keeps the local file name
fn object_key(path: &ObjectPath, source: &Path) -> Result<String, String> {
    if !path.is_dir {
        return Ok(path.key.clone());
    }

    let file_name = source
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("Cannot derive an object name from '{}'", source.display()))?;
    Ok(path.join(file_name).key)
}

/// Parse a `key=value` metadata argument
fn parse_meta(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), val.to_string()))
        }
        _ => Err(format!("invalid metadata '{value}', expected KEY=VALUE")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meta() {
        assert_eq!(
            parse_meta("origin=backup").unwrap(),
            ("origin".to_string(), "backup".to_string())
        );
        assert_eq!(
            parse_meta("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_meta("empty=").unwrap().1, "");
        assert!(parse_meta("novalue").is_err());
        assert!(parse_meta("=x").is_err());
    }

    #[test]
    fn test_object_key_explicit() {
        let path = ObjectPath::new("local", "media", "clips/movie.mkv");
        assert_eq!(
            object_key(&path, Path::new("/tmp/other.mkv")).unwrap(),
            "clips/movie.mkv"
        );
    }

    #[test]
    fn test_object_key_folder_target_keeps_file_name() {
        let path = ObjectPath::new("local", "media", "clips/");
        assert_eq!(
            object_key(&path, Path::new("/tmp/movie.mkv")).unwrap(),
            "clips/movie.mkv"
        );

        let root = ObjectPath::new("local", "media", "");
        assert_eq!(
            object_key(&root, Path::new("movie.mkv")).unwrap(),
            "movie.mkv"
        );
    }

    #[test]
    fn test_object_key_without_file_name() {
        let root = ObjectPath::new("local", "media", "");
        assert!(object_key(&root, Path::new("/")).is_err());
    }
}
