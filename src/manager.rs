// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation manager.
//!
//! This module owns the session's surfer set and is the only mutation path
//! into it. Every operation validates its input first and writes second, so
//! a rejected call leaves the session exactly as it was. Failures are
//! reported to the caller; nothing here logs or terminates.

use serde::Serialize;

use crate::error::{AnnotationError, Result};
use crate::io::media::{VideoMetadata, VideoSource};
use crate::models::annotation::{Annotation, BboxSample, BoundingBox, Quality};
use crate::models::session::{now_iso, Session};

/// Bounded snapshot stack backing undo/redo.
///
/// Mutating operations record a copy of the surfer set just before editing
/// it; undo trades the current set for the newest snapshot, redo trades it
/// back. A fresh edit makes previously undone states unreachable.
struct History<T> {
    past: Vec<T>,
    future: Vec<T>,
    limit: usize,
}

impl<T> History<T> {
    const DEFAULT_LIMIT: usize = 50;

    fn new() -> Self {
        Self {
            past: Vec::new(),
            future: Vec::new(),
            limit: Self::DEFAULT_LIMIT,
        }
    }

    /// Record the state as it was before an edit. The oldest snapshot falls
    /// off once the limit is reached.
    fn record(&mut self, snapshot: T) {
        if self.past.len() == self.limit {
            self.past.remove(0);
        }
        self.past.push(snapshot);
        self.future.clear();
    }

    fn undo(&mut self, current: T) -> Option<T> {
        let previous = self.past.pop()?;
        self.future.push(current);
        Some(previous)
    }

    fn redo(&mut self, current: T) -> Option<T> {
        let next = self.future.pop()?;
        self.past.push(current);
        Some(next)
    }

    fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }
}

/// Counts of annotations per quality bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QualityCounts {
    pub poor: usize,
    pub average: usize,
    pub good: usize,
    pub excellent: usize,
}

impl QualityCounts {
    fn record(&mut self, quality: Quality) {
        match quality {
            Quality::Poor => self.poor += 1,
            Quality::Average => self.average += 1,
            Quality::Good => self.good += 1,
            Quality::Excellent => self.excellent += 1,
        }
    }
}

/// Derived read-only session aggregates.
///
/// Duration figures cover only annotations with both start and end set, and
/// are accumulated in insertion order so repeated calls on the same session
/// are bit-identical.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatistics {
    pub total_surfers: usize,
    pub completed_surfers: usize,
    pub completion_rate: f64,
    pub mean_ride_duration: f64,
    pub min_ride_duration: f64,
    pub max_ride_duration: f64,
    pub quality_counts: QualityCounts,
}

/// Owns one session's surfer annotations, enforces the validity invariants,
/// and exposes the read/mutate operations the front end drives.
///
/// Single-editor by construction: mutation requires `&mut self`, reads take
/// `&self`, and every operation completes before returning.
pub struct AnnotationManager {
    session: Session,
    history: History<Vec<Annotation>>,
}

impl AnnotationManager {
    /// Start an empty session for a video with the given metadata.
    pub fn new(video_file: impl Into<String>, video: VideoMetadata) -> Self {
        Self::from_session(Session::new(video_file, video))
    }

    /// Start an empty session, querying metadata from a loaded video source.
    pub fn from_source<V: VideoSource>(video_file: impl Into<String>, source: &V) -> Self {
        Self::new(video_file, source.metadata())
    }

    /// Wrap an existing session, e.g. one rebuilt from an imported document.
    pub fn from_session(session: Session) -> Self {
        Self {
            session,
            history: History::new(),
        }
    }

    /// The underlying session, read-only.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// All surfer annotations in insertion order.
    pub fn surfers(&self) -> &[Annotation] {
        &self.session.surfers
    }

    /// Look up one surfer annotation.
    pub fn surfer(&self, id: u64) -> Option<&Annotation> {
        self.session.surfer(id)
    }

    /// The annotation currently being edited, if any.
    pub fn active_surfer(&self) -> Option<&Annotation> {
        self.session.active_surfer()
    }

    fn save_to_history(&mut self) {
        let snapshot = self.session.surfers.clone();
        self.history.record(snapshot);
    }

    fn surfer_mut(&mut self, id: u64) -> Result<&mut Annotation> {
        self.session
            .surfer_mut(id)
            .ok_or(AnnotationError::NotFound { id })
    }

    fn check_time(&self, field: &'static str, value: f64) -> Result<()> {
        let duration = self.session.video.duration;
        if !value.is_finite() || value < 0.0 || value > duration {
            return Err(AnnotationError::InvalidTimeRange {
                field,
                value,
                detail: format!("must lie within 0..={duration} seconds"),
            });
        }
        Ok(())
    }

    fn check_bbox(&self, bbox: BoundingBox) -> Result<()> {
        let (frame_width, frame_height) = self.session.video.resolution();
        if !bbox.is_well_formed() {
            return Err(AnnotationError::InvalidBoundingBox {
                x: bbox.x,
                y: bbox.y,
                width: bbox.width,
                height: bbox.height,
                detail: "coordinates must be finite and non-negative with positive width and height"
                    .to_string(),
            });
        }
        if !bbox.fits_frame(frame_width, frame_height) {
            return Err(AnnotationError::InvalidBoundingBox {
                x: bbox.x,
                y: bbox.y,
                width: bbox.width,
                height: bbox.height,
                detail: format!("exceeds {frame_width}x{frame_height} frame"),
            });
        }
        Ok(())
    }

    /// Add a new surfer annotation, optionally starting at the current
    /// playback position. Returns the new id; ids are never reused within a
    /// session, even after deletes. An invalid start time creates nothing
    /// and does not consume an id.
    pub fn add_surfer(&mut self, start_time: Option<f64>) -> Result<u64> {
        if let Some(t) = start_time {
            self.check_time("start_time", t)?;
        }
        self.save_to_history();
        let id = self.session.next_id;
        self.session.next_id += 1;
        self.session
            .surfers
            .push(Annotation::new(id, start_time, now_iso()));
        self.session.touch();
        Ok(id)
    }

    /// Remove a surfer annotation entirely.
    pub fn delete_surfer(&mut self, id: u64) -> Result<()> {
        let index = self
            .session
            .surfers
            .iter()
            .position(|s| s.id == id)
            .ok_or(AnnotationError::NotFound { id })?;
        self.save_to_history();
        self.session.surfers.remove(index);
        self.session.touch();
        Ok(())
    }

    /// Set a surfer's ride start. Must lie within the video and precede a
    /// stored end time; on rejection the stored start is unchanged.
    pub fn set_start_time(&mut self, id: u64, start_time: f64) -> Result<()> {
        self.surfer(id).ok_or(AnnotationError::NotFound { id })?;
        self.check_time("start_time", start_time)?;
        if let Some(end) = self.surfer(id).and_then(|s| s.end_time) {
            if start_time >= end {
                return Err(AnnotationError::InvalidTimeRange {
                    field: "start_time",
                    value: start_time,
                    detail: format!("must precede end_time {end}"),
                });
            }
        }
        self.save_to_history();
        let surfer = self.surfer_mut(id)?;
        surfer.start_time = Some(start_time);
        self.session.touch();
        Ok(())
    }

    /// Set a surfer's ride end. Must lie within the video and follow the
    /// stored start time; on rejection the stored end is unchanged.
    pub fn set_end_time(&mut self, id: u64, end_time: f64) -> Result<()> {
        self.surfer(id).ok_or(AnnotationError::NotFound { id })?;
        self.check_time("end_time", end_time)?;
        if let Some(start) = self.surfer(id).and_then(|s| s.start_time) {
            if end_time <= start {
                return Err(AnnotationError::InvalidTimeRange {
                    field: "end_time",
                    value: end_time,
                    detail: format!("must follow start_time {start}"),
                });
            }
        }
        self.save_to_history();
        let surfer = self.surfer_mut(id)?;
        surfer.end_time = Some(end_time);
        self.session.touch();
        Ok(())
    }

    /// Set a surfer's bounding box. Rejected boxes leave the prior box in
    /// place.
    pub fn set_bbox(&mut self, id: u64, bbox: BoundingBox) -> Result<()> {
        self.surfer(id).ok_or(AnnotationError::NotFound { id })?;
        self.check_bbox(bbox)?;
        self.save_to_history();
        let surfer = self.surfer_mut(id)?;
        surfer.bbox = Some(bbox);
        self.session.touch();
        Ok(())
    }

    /// Rate a surfer's ride. Textual ratings are parsed into [`Quality`] at
    /// the boundary, so an unknown value fails before reaching this call.
    pub fn set_quality(&mut self, id: u64, quality: Quality) -> Result<()> {
        self.surfer(id).ok_or(AnnotationError::NotFound { id })?;
        self.save_to_history();
        let surfer = self.surfer_mut(id)?;
        surfer.quality = Some(quality);
        self.session.touch();
        Ok(())
    }

    /// Mark one annotation as the one being edited, clearing the flag on
    /// every other. Selection is not a data edit and is not undoable.
    pub fn set_active(&mut self, id: u64) -> Result<()> {
        self.surfer(id).ok_or(AnnotationError::NotFound { id })?;
        for surfer in &mut self.session.surfers {
            surfer.active = surfer.id == id;
        }
        Ok(())
    }

    /// Clear the active flag everywhere.
    pub fn clear_active(&mut self) {
        for surfer in &mut self.session.surfers {
            surfer.active = false;
        }
    }

    /// Append a time-stamped box sample to a surfer's bbox history. Sample
    /// times must be strictly increasing; past samples are never touched.
    pub fn add_bbox_sample(&mut self, id: u64, time: f64, bbox: BoundingBox) -> Result<()> {
        self.surfer(id).ok_or(AnnotationError::NotFound { id })?;
        self.check_time("time", time)?;
        self.check_bbox(bbox)?;
        if let Some(last) = self.surfer(id).and_then(|s| s.bbox_history.last()) {
            if time <= last.time {
                return Err(AnnotationError::InvalidTimeRange {
                    field: "time",
                    value: time,
                    detail: format!("bbox history times must be strictly increasing (last {})", last.time),
                });
            }
        }
        self.save_to_history();
        let surfer = self.surfer_mut(id)?;
        surfer.bbox_history.push(BboxSample { time, bbox });
        self.session.touch();
        Ok(())
    }

    /// Annotations whose ride covers the given timestamp.
    pub fn surfers_at(&self, timestamp: f64) -> Vec<&Annotation> {
        self.session
            .surfers
            .iter()
            .filter(|s| s.covers(timestamp))
            .collect()
    }

    /// Compute session aggregates. Read-only; accumulation runs in insertion
    /// order, so results are deterministic for a fixed session.
    pub fn get_statistics(&self) -> SessionStatistics {
        let surfers = &self.session.surfers;
        let total = surfers.len();

        let mut completed = 0usize;
        let mut sum = 0.0f64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut quality_counts = QualityCounts::default();

        for surfer in surfers {
            if let Some(duration) = surfer.duration() {
                completed += 1;
                sum += duration;
                min = min.min(duration);
                max = max.max(duration);
            }
            if let Some(quality) = surfer.quality {
                quality_counts.record(quality);
            }
        }

        SessionStatistics {
            total_surfers: total,
            completed_surfers: completed,
            completion_rate: if total > 0 {
                completed as f64 / total as f64
            } else {
                0.0
            },
            mean_ride_duration: if completed > 0 {
                sum / completed as f64
            } else {
                0.0
            },
            min_ride_duration: if completed > 0 { min } else { 0.0 },
            max_ride_duration: if completed > 0 { max } else { 0.0 },
            quality_counts,
        }
    }

    /// Restore the surfer set to the state before the last edit. The id
    /// counter is not rewound, so undone adds never cause id reuse.
    pub fn undo(&mut self) -> bool {
        let current = self.session.surfers.clone();
        if let Some(previous) = self.history.undo(current) {
            self.session.surfers = previous;
            self.session.touch();
            true
        } else {
            false
        }
    }

    /// Reapply the last undone edit.
    pub fn redo(&mut self) -> bool {
        let current = self.session.surfers.clone();
        if let Some(next) = self.history.redo(current) {
            self.session.surfers = next;
            self.session.touch();
            true
        } else {
            false
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
}
