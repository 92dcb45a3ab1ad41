// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation data structures.
//!
//! This module defines the core data structures for representing a single
//! surfer's ride: the time interval, the bounding box marking the surfer in
//! the frame, and the subjective quality rating.

use std::fmt;
use std::str::FromStr;

use crate::error::AnnotationError;

/// An axis-aligned bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box from origin and extent.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Create a bounding box from two corner points, in either drag
    /// direction.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }

    /// Check shape alone: finite, non-negative origin, positive extent.
    pub fn is_well_formed(&self) -> bool {
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        finite && self.x >= 0.0 && self.y >= 0.0 && self.width > 0.0 && self.height > 0.0
    }

    /// Check the box lies entirely within a frame of the given dimensions.
    pub fn fits_frame(&self, frame_width: u32, frame_height: u32) -> bool {
        self.x + self.width <= frame_width as f64 && self.y + self.height <= frame_height as f64
    }

    /// The box as a `[x, y, w, h]` array, the wire representation.
    pub fn to_array(&self) -> [f64; 4] {
        [self.x, self.y, self.width, self.height]
    }

    /// Build a box from the wire representation.
    pub fn from_array(values: [f64; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }
}

/// Subjective rating of ride execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Quality {
    Poor,
    Average,
    Good,
    Excellent,
}

impl Quality {
    /// All ratings, in ascending order.
    pub const ALL: [Quality; 4] = [
        Quality::Poor,
        Quality::Average,
        Quality::Good,
        Quality::Excellent,
    ];

    /// The lowercase wire name of the rating.
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Poor => "poor",
            Quality::Average => "average",
            Quality::Good => "good",
            Quality::Excellent => "excellent",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = AnnotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "poor" => Ok(Quality::Poor),
            "average" => Ok(Quality::Average),
            "good" => Ok(Quality::Good),
            "excellent" => Ok(Quality::Excellent),
            other => Err(AnnotationError::InvalidQuality {
                value: other.to_string(),
            }),
        }
    }
}

/// One time-stamped bounding box sample for a ride whose box varies over its
/// duration. Samples are append-only and never mutated once recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BboxSample {
    pub time: f64,
    pub bbox: BoundingBox,
}

/// A single surfer's ride annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Unique within the session, stable for its lifetime.
    pub id: u64,
    /// Ride start in seconds from the beginning of the video.
    pub start_time: Option<f64>,
    /// Ride end in seconds; always after `start_time` when both are set.
    pub end_time: Option<f64>,
    /// Surfer location in the frame.
    pub bbox: Option<BoundingBox>,
    /// Rating, unset until explicitly rated.
    pub quality: Option<Quality>,
    /// Whether this annotation is the one currently being edited.
    /// Session-local state; never serialized.
    pub active: bool,
    /// ISO-8601 creation timestamp, immutable once set.
    pub created: String,
    /// Optional time-varying box samples, in strictly increasing time order.
    pub bbox_history: Vec<BboxSample>,
    /// Unknown fields carried by an imported document, preserved verbatim so
    /// re-export does not lose data written by other tool versions.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Annotation {
    /// Create a new annotation with the given id and optional start time.
    pub fn new(id: u64, start_time: Option<f64>, created: String) -> Self {
        Self {
            id,
            start_time,
            end_time: None,
            bbox: None,
            quality: None,
            active: false,
            created,
            bbox_history: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Ride duration in seconds, derived; `None` until both times are set.
    pub fn duration(&self) -> Option<f64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Whether both start and end times have been set.
    pub fn is_complete(&self) -> bool {
        self.start_time.is_some() && self.end_time.is_some()
    }

    /// Whether the ride covers the given timestamp. A ride with no end yet
    /// covers everything from its start onward.
    pub fn covers(&self, timestamp: f64) -> bool {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => start <= timestamp && timestamp <= end,
            (Some(start), None) => timestamp >= start,
            _ => false,
        }
    }

    /// The box in effect at `time`: the latest history sample at or before
    /// it, falling back to the static box before the first sample.
    pub fn bbox_at(&self, time: f64) -> Option<BoundingBox> {
        self.bbox_history
            .iter()
            .rev()
            .find(|sample| sample.time <= time)
            .map(|sample| sample.bbox)
            .or(self.bbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_requires_both_times() {
        let mut ann = Annotation::new(1, Some(10.0), String::new());
        assert_eq!(ann.duration(), None);

        ann.end_time = Some(25.5);
        assert_eq!(ann.duration(), Some(15.5));
    }

    #[test]
    fn test_covers_interval_and_open_end() {
        let mut ann = Annotation::new(1, Some(10.0), String::new());
        assert!(ann.covers(10.0));
        assert!(ann.covers(500.0));
        assert!(!ann.covers(9.9));

        ann.end_time = Some(20.0);
        assert!(ann.covers(20.0));
        assert!(!ann.covers(20.1));
    }

    #[test]
    fn test_bbox_from_corners_normalizes() {
        let bbox = BoundingBox::from_corners(300.0, 400.0, 100.0, 150.0);
        assert_eq!(bbox, BoundingBox::new(100.0, 150.0, 200.0, 250.0));
    }

    #[test]
    fn test_bbox_well_formed() {
        assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_well_formed());
        assert!(!BoundingBox::new(-5.0, 0.0, 50.0, 50.0).is_well_formed());
        assert!(!BoundingBox::new(0.0, 0.0, 0.0, 50.0).is_well_formed());
        assert!(!BoundingBox::new(0.0, f64::NAN, 50.0, 50.0).is_well_formed());
    }

    #[test]
    fn test_bbox_fits_frame() {
        let bbox = BoundingBox::new(100.0, 150.0, 200.0, 300.0);
        assert!(bbox.fits_frame(1920, 1080));
        assert!(!bbox.fits_frame(250, 1080));
    }

    #[test]
    fn test_quality_parse_roundtrip() {
        for quality in Quality::ALL {
            assert_eq!(quality.as_str().parse::<Quality>().unwrap(), quality);
        }
        assert!(matches!(
            "terrible".parse::<Quality>(),
            Err(AnnotationError::InvalidQuality { .. })
        ));
    }

    #[test]
    fn test_bbox_at_step_hold() {
        let mut ann = Annotation::new(1, Some(0.0), String::new());
        assert_eq!(ann.bbox_at(5.0), None);

        ann.bbox = Some(BoundingBox::new(10.0, 10.0, 50.0, 50.0));
        ann.bbox_history.push(BboxSample {
            time: 4.0,
            bbox: BoundingBox::new(20.0, 10.0, 50.0, 50.0),
        });
        ann.bbox_history.push(BboxSample {
            time: 8.0,
            bbox: BoundingBox::new(30.0, 10.0, 50.0, 50.0),
        });

        // Before the first sample the static box applies.
        assert_eq!(
            ann.bbox_at(2.0),
            Some(BoundingBox::new(10.0, 10.0, 50.0, 50.0))
        );
        // Between samples the earlier one holds.
        assert_eq!(
            ann.bbox_at(6.0),
            Some(BoundingBox::new(20.0, 10.0, 50.0, 50.0))
        );
        assert_eq!(
            ann.bbox_at(8.0),
            Some(BoundingBox::new(30.0, 10.0, 50.0, 50.0))
        );
    }
}
