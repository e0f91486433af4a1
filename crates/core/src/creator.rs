//! Large object creation
//!
//! Uploads content as numbered segments and assembles them behind a manifest.
//! A create call is resumable: segments left by an interrupted attempt are
//! kept, except the last one, which may be truncated and is uploaded again.

use std::io::SeekFrom;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncSeek, AsyncSeekExt};

use crate::error::{Error, Result};
use crate::manifest::build_manifest;
use crate::object::{Metadata, StorageManifest, StorageObject};
use crate::path::{self, parse_segment_id, SEPARATOR};
use crate::segment::{find_resume_point, plan_chunk_size, segment_offset};
use crate::traits::ObjectStore;
use crate::upload::{Cancellation, ProgressFn, SegmentUploader};

/// Parameters of one create call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    /// Container receiving the manifest
    pub container: String,
    /// Key of the assembled object
    pub object_name: String,
    pub metadata: Metadata,
    /// Content type reported for the assembled object
    pub content_type: Option<String>,
    pub desired_segment_count: u32,
    /// Container receiving the segments
    pub segment_container: String,
}

impl CreateRequest {
    pub fn new(
        container: impl Into<String>,
        object_name: impl Into<String>,
        segment_container: impl Into<String>,
        desired_segment_count: u32,
    ) -> Self {
        Self {
            container: container.into(),
            object_name: object_name.into(),
            metadata: Metadata::new(),
            content_type: None,
            desired_segment_count,
            segment_container: segment_container.into(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    fn validate(&self) -> Result<()> {
        if self.container.is_empty() {
            return Err(Error::InvalidArgument("container name is empty".into()));
        }
        if self.object_name.is_empty() {
            return Err(Error::InvalidArgument("object name is empty".into()));
        }
        if self.object_name.ends_with(SEPARATOR) {
            return Err(Error::InvalidArgument(format!(
                "object name '{}' denotes a folder",
                self.object_name
            )));
        }
        if self.segment_container.is_empty() {
            return Err(Error::InvalidArgument(
                "segment container name is empty".into(),
            ));
        }
        if self.desired_segment_count == 0 {
            return Err(Error::InvalidArgument(
                "segment count must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Result of a successful create call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedObject {
    /// The assembled object as reported by the store
    pub object: StorageObject,
    /// Segments the stored manifest references
    pub segment_count: usize,
    /// `"static"` or `"dynamic"`
    pub manifest_kind: &'static str,
}

/// Creates segmented large objects through an injected store
pub struct LargeObjectCreator {
    store: Arc<dyn ObjectStore>,
    cancellation: Option<Cancellation>,
    progress: Option<ProgressFn>,
}

impl LargeObjectCreator {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            cancellation: None,
            progress: None,
        }
    }

    /// Stop between segments once `cancellation` fires
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    /// Report every stored segment
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Upload `content` as a segmented object and return the assembled object
    /// together with the number of segments its manifest references
    ///
    /// Failures before assembly propagate unchanged and a repeated call picks
    /// up where the failed one stopped. Failures while persisting or fetching
    /// the manifest are reported as [`Error::AssemblyFailed`].
    pub async fn create<R>(&self, request: &CreateRequest, content: &mut R) -> Result<CreatedObject>
    where
        R: AsyncRead + AsyncSeek + Unpin + Send,
    {
        request.validate()?;
        let total_size = content.seek(SeekFrom::End(0)).await?;
        let chunk_size = plan_chunk_size(total_size, request.desired_segment_count)?;

        let CreateRequest {
            container,
            object_name,
            segment_container,
            ..
        } = request;

        tracing::info!(
            container = %container,
            object = %object_name,
            segment_container = %segment_container,
            total_size,
            chunk_size,
            "creating large object"
        );

        let existing = self
            .resolve_segment_location(segment_container, object_name)
            .await?;

        let resume = find_resume_point(&existing);
        if resume.is_resuming() {
            let last_key = format!("{object_name}{SEPARATOR}{}", resume.last_name);
            tracing::info!(
                object = %object_name,
                last_segment = resume.last_id,
                "resuming upload, re-uploading last segment"
            );
            self.store
                .delete_object(segment_container, &last_key)
                .await?;
        }

        let mut uploader = SegmentUploader::new(
            self.store.as_ref(),
            segment_container,
            object_name,
            chunk_size,
            &request.metadata,
        );
        if let Some(cancellation) = &self.cancellation {
            uploader = uploader.with_cancellation(cancellation);
        }
        if let Some(progress) = &self.progress {
            uploader = uploader.with_progress(progress);
        }

        let offset = segment_offset(resume.last_id, chunk_size);
        let summary = uploader.upload(content, offset, resume.last_id).await?;
        tracing::info!(
            object = %object_name,
            uploaded = summary.segments_uploaded(),
            bytes = summary.bytes_uploaded,
            "segments uploaded"
        );

        let mut segments: Vec<StorageObject> = self
            .store
            .get_folder(segment_container, object_name)
            .await?
            .objects
            .into_iter()
            .filter(|s| parse_segment_id(&s.name).is_some())
            .collect();
        segments.sort_by(|a, b| a.key.cmp(&b.key));
        let segment_count = segments.len();

        let manifest = build_manifest(
            container,
            object_name,
            &request.metadata,
            segments,
            segment_container,
        )?
        .with_content_type(request.content_type.clone());

        let object = self
            .assemble(&manifest)
            .await
            .map_err(|e| Error::AssemblyFailed {
                container: container.clone(),
                object: object_name.clone(),
                source: Box::new(e),
            })?;

        Ok(CreatedObject {
            object,
            segment_count,
            manifest_kind: manifest.kind(),
        })
    }

    /// Make sure the segment folder exists and return the segments already in it
    async fn resolve_segment_location(
        &self,
        segment_container: &str,
        object_name: &str,
    ) -> Result<Vec<StorageObject>> {
        if !self.store.container_exists(segment_container).await? {
            tracing::debug!(segment_container, "creating segment container");
            self.store.create_container(segment_container).await?;
            self.store
                .create_folder(segment_container, object_name)
                .await?;
            return Ok(Vec::new());
        }

        if !self
            .store
            .folder_exists(segment_container, object_name)
            .await?
        {
            tracing::debug!(
                segment_container,
                folder = %path::folder_marker(object_name),
                "creating segment folder"
            );
            self.store
                .create_folder(segment_container, object_name)
                .await?;
            return Ok(Vec::new());
        }

        Ok(self
            .store
            .get_folder(segment_container, object_name)
            .await?
            .objects)
    }

    async fn assemble(&self, manifest: &StorageManifest) -> Result<StorageObject> {
        self.store.put_manifest(manifest).await?;
        tracing::info!(
            container = %manifest.container(),
            object = %manifest.object_name(),
            kind = manifest.kind(),
            "manifest stored"
        );
        self.store
            .get_object(manifest.container(), manifest.object_name())
            .await
    }
}
