//! Sequential segment upload
//!
//! Reads a seekable source chunk by chunk and stores each chunk as
//! `{object}/{id:010}`. One segment is in flight at a time, in ascending id
//! order, which is what makes the delete-last-then-resume recovery sound.

use std::io::SeekFrom;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

use crate::error::{Error, Result};
use crate::object::Metadata;
use crate::path::segment_key;
use crate::traits::ObjectStore;

/// Cooperative cancellation flag, checked between segments
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; the segment in flight still completes
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Reported after each stored segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentProgress {
    pub segment_id: u64,
    /// Size of this segment
    pub bytes: u64,
    /// Source offset just past this segment
    pub offset: u64,
    /// Total source length
    pub total: u64,
}

/// Progress callback shared with the caller
pub type ProgressFn = Arc<dyn Fn(SegmentProgress) + Send + Sync>;

/// Outcome of one upload run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSummary {
    pub first_id: u64,
    /// Id the next segment would get
    pub next_id: u64,
    pub bytes_uploaded: u64,
}

impl UploadSummary {
    pub fn segments_uploaded(&self) -> u64 {
        self.next_id - self.first_id
    }
}

/// Uploads the segments of one object
pub struct SegmentUploader<'a> {
    store: &'a dyn ObjectStore,
    segment_container: &'a str,
    object_name: &'a str,
    chunk_size: u64,
    metadata: &'a Metadata,
    cancellation: Option<&'a Cancellation>,
    progress: Option<&'a ProgressFn>,
}

impl<'a> SegmentUploader<'a> {
    pub fn new(
        store: &'a dyn ObjectStore,
        segment_container: &'a str,
        object_name: &'a str,
        chunk_size: u64,
        metadata: &'a Metadata,
    ) -> Self {
        Self {
            store,
            segment_container,
            object_name,
            chunk_size,
            metadata,
            cancellation: None,
            progress: None,
        }
    }

    pub fn with_cancellation(mut self, cancellation: &'a Cancellation) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    pub fn with_progress(mut self, progress: &'a ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Upload from `start_offset` as segment `start_id` onwards until the source is exhausted
    ///
    /// A failed segment aborts the run; segments stored before it are kept.
    pub async fn upload<R>(
        &self,
        source: &mut R,
        start_offset: u64,
        start_id: u64,
    ) -> Result<UploadSummary>
    where
        R: AsyncRead + AsyncSeek + Unpin + Send,
    {
        if self.chunk_size == 0 {
            return Err(Error::InvalidArgument(
                "segment size must be greater than zero".into(),
            ));
        }

        let total = source.seek(SeekFrom::End(0)).await?;
        let mut offset = source.seek(SeekFrom::Start(start_offset)).await?;
        let mut segment_id = start_id;
        let mut bytes_uploaded = 0;

        while offset < total {
            if self.cancellation.is_some_and(Cancellation::is_cancelled) {
                tracing::info!(
                    object = %self.object_name,
                    next_segment = segment_id,
                    "upload cancelled"
                );
                return Err(Error::Cancelled {
                    object: self.object_name.to_string(),
                    next_segment: segment_id,
                });
            }

            let len = self.chunk_size.min(total - offset);
            let mut payload = vec![0u8; len as usize];
            source.read_exact(&mut payload).await?;

            let key = segment_key(self.object_name, segment_id);
            tracing::debug!(
                container = %self.segment_container,
                key = %key,
                bytes = len,
                "uploading segment"
            );

            self.store
                .put_object(self.segment_container, &key, payload, self.metadata)
                .await
                .map_err(|e| Error::SegmentUpload {
                    object: self.object_name.to_string(),
                    segment_id,
                    source: Box::new(e),
                })?;

            offset += len;
            bytes_uploaded += len;

            if let Some(progress) = self.progress {
                (**progress)(SegmentProgress {
                    segment_id,
                    bytes: len,
                    offset,
                    total,
                });
            }

            segment_id += 1;
        }

        Ok(UploadSummary {
            first_id: start_id,
            next_id: segment_id,
            bytes_uploaded,
        })
    }
}
