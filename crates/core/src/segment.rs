//! Segment planning
//!
//! Chunk size calculation and resume point detection for segmented uploads.

use crate::error::{Error, Result};
use crate::object::StorageObject;
use crate::path::parse_segment_id;

/// Last segment found from an earlier upload attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumePoint {
    /// Highest segment id present
    pub last_id: u64,
    /// Friendly name of that segment (empty when starting over)
    pub last_name: String,
}

impl ResumePoint {
    /// Resume point of a fresh upload
    pub fn start() -> Self {
        Self::default()
    }

    /// Whether an earlier attempt left segments worth keeping
    ///
    /// The last segment itself may be truncated and is always re-uploaded.
    pub fn is_resuming(&self) -> bool {
        self.last_id > 0
    }
}

/// Size of each segment for `total_size` bytes split into `desired_segment_count` parts
///
/// A count of zero means a single segment holding everything.
pub fn plan_chunk_size(total_size: u64, desired_segment_count: u32) -> Result<u64> {
    if total_size == 0 {
        return Err(Error::InvalidArgument(
            "content size must be greater than zero".into(),
        ));
    }

    if desired_segment_count == 0 {
        return Ok(total_size);
    }

    Ok(total_size.div_ceil(u64::from(desired_segment_count)))
}

/// Find where a previous upload stopped
///
/// Any segment whose name is not a plain non-negative integer means the
/// location holds something else, so the upload starts over from zero.
pub fn find_resume_point(existing: &[StorageObject]) -> ResumePoint {
    let mut best: Option<(u64, &str)> = None;

    for segment in existing {
        let Some(id) = parse_segment_id(&segment.name) else {
            tracing::warn!(
                key = %segment.key,
                "unrecognised segment name, restarting upload from the first segment"
            );
            return ResumePoint::start();
        };

        if best.is_none_or(|(max, _)| id > max) {
            best = Some((id, segment.name.as_str()));
        }
    }

    match best {
        Some((last_id, last_name)) => ResumePoint {
            last_id,
            last_name: last_name.to_string(),
        },
        None => ResumePoint::start(),
    }
}

/// Byte offset at which segment `segment_id` starts
pub fn segment_offset(segment_id: u64, chunk_size: u64) -> u64 {
    segment_id.saturating_mul(chunk_size)
}
