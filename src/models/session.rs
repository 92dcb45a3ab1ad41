// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation session state.
//!
//! This module holds the per-video session: the video reference and its
//! read-only metadata, the surfer annotations in insertion order, and the
//! monotonic id counter that guarantees ids are never reused.

use chrono::{SecondsFormat, Utc};

use super::annotation::Annotation;
use crate::io::media::VideoMetadata;

/// Current time as an ISO-8601 string, the stamp format used throughout.
pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Complete annotation state for one loaded video.
///
/// Created when a video is loaded and discarded when another replaces it.
/// Invariants (unique ids, at most one active annotation, valid times and
/// boxes) are enforced by [`AnnotationManager`](crate::AnnotationManager),
/// which owns all mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Name or path of the loaded video; the video itself belongs to the
    /// `VideoSource`.
    pub video_file: String,
    /// Duration, fps, and resolution captured at load time.
    pub video: VideoMetadata,
    /// Surfer annotations in insertion order.
    pub surfers: Vec<Annotation>,
    /// Next id to hand out; monotonic, so deleted ids are never reused.
    pub next_id: u64,
    /// ISO-8601 stamp of session creation.
    pub created: String,
    /// ISO-8601 stamp of the last mutation.
    pub modified: String,
}

impl Session {
    /// Create an empty session for the given video.
    pub fn new(video_file: impl Into<String>, video: VideoMetadata) -> Self {
        let created = now_iso();
        Self {
            video_file: video_file.into(),
            video,
            surfers: Vec::new(),
            next_id: 1,
            created: created.clone(),
            modified: created,
        }
    }

    /// Look up a surfer annotation by id.
    pub fn surfer(&self, id: u64) -> Option<&Annotation> {
        self.surfers.iter().find(|s| s.id == id)
    }

    pub(crate) fn surfer_mut(&mut self, id: u64) -> Option<&mut Annotation> {
        self.surfers.iter_mut().find(|s| s.id == id)
    }

    /// The annotation currently marked active, if any.
    pub fn active_surfer(&self) -> Option<&Annotation> {
        self.surfers.iter().find(|s| s.active)
    }

    pub(crate) fn touch(&mut self) {
        self.modified = now_iso();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> VideoMetadata {
        VideoMetadata::new(120.5, 30.0, 1920, 1080)
    }

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::new("session_001.mp4", meta());
        assert!(session.surfers.is_empty());
        assert_eq!(session.next_id, 1);
        assert_eq!(session.created, session.modified);
        assert!(session.active_surfer().is_none());
    }

    #[test]
    fn test_surfer_lookup_by_id() {
        let mut session = Session::new("session_001.mp4", meta());
        session.surfers.push(Annotation::new(7, None, now_iso()));
        assert_eq!(session.surfer(7).map(|s| s.id), Some(7));
        assert!(session.surfer(8).is_none());
    }
}
