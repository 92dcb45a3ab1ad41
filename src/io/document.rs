// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Wire representation of an annotation session.
//!
//! [`SessionDocument`] is the canonical export layout. Export snapshots the
//! session into an owned document before any bytes leave the process; import
//! rebuilds a session, re-validating every known field with the same rules
//! the setters apply and stopping at the first violation. Unknown fields on
//! a surfer are kept in a catch-all map so documents written by newer tool
//! versions survive a round trip.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AnnotationError, Result};
use crate::io::media::VideoMetadata;
use crate::manager::AnnotationManager;
use crate::models::annotation::{Annotation, BboxSample, BoundingBox, Quality};
use crate::models::session::{now_iso, Session};

/// One time-stamped bounding box sample on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BboxSampleRecord {
    pub time: f64,
    pub bbox: [f64; 4],
}

/// One surfer annotation on the wire. Optional fields serialize as explicit
/// nulls; a partially filled annotation is never dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurferRecord {
    pub id: u64,
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub end_time: Option<f64>,
    /// Derived `end_time - start_time`; recomputed on import, never trusted.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bbox_history: Vec<BboxSampleRecord>,
    /// Fields this version does not know about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SurferRecord {
    fn from_annotation(annotation: &Annotation) -> Self {
        Self {
            id: annotation.id,
            start_time: annotation.start_time,
            end_time: annotation.end_time,
            duration: annotation.duration(),
            bbox: annotation.bbox.map(|b| b.to_array()),
            quality: annotation.quality.map(|q| q.as_str().to_string()),
            created: Some(annotation.created.clone()),
            bbox_history: annotation
                .bbox_history
                .iter()
                .map(|sample| BboxSampleRecord {
                    time: sample.time,
                    bbox: sample.bbox.to_array(),
                })
                .collect(),
            extra: annotation.extra.clone(),
        }
    }
}

/// A complete annotation session on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    pub video_file: String,
    pub duration: f64,
    pub fps: f64,
    /// Frame dimensions; absent in documents from tools that never recorded
    /// them, in which case bbox bounds cannot be re-checked on import.
    #[serde(default)]
    pub frame_width: Option<u32>,
    #[serde(default)]
    pub frame_height: Option<u32>,
    #[serde(default)]
    pub session_created: Option<String>,
    #[serde(default)]
    pub session_modified: Option<String>,
    #[serde(default)]
    pub surfer_count: Option<usize>,
    pub surfers: Vec<SurferRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn corrupt(context: String, field: &'static str, detail: String) -> AnnotationError {
    AnnotationError::CorruptAnnotationData {
        context,
        field,
        detail,
    }
}

impl SessionDocument {
    /// Snapshot a manager's session into an owned document.
    pub fn from_manager(manager: &AnnotationManager) -> Self {
        Self::from_session(manager.session())
    }

    /// Snapshot a session into an owned document.
    pub fn from_session(session: &Session) -> Self {
        Self {
            video_file: session.video_file.clone(),
            duration: session.video.duration,
            fps: session.video.fps,
            frame_width: Some(session.video.frame_width),
            frame_height: Some(session.video.frame_height),
            session_created: Some(session.created.clone()),
            session_modified: Some(session.modified.clone()),
            surfer_count: Some(session.surfers.len()),
            surfers: session.surfers.iter().map(SurferRecord::from_annotation).collect(),
            extra: Map::new(),
        }
    }

    /// Rebuild a manager from the document, validating every known field.
    pub fn into_manager(self) -> Result<AnnotationManager> {
        Ok(AnnotationManager::from_session(self.into_session()?))
    }

    /// Rebuild a session from the document.
    ///
    /// Known fields are validated with the same rules the mutating setters
    /// apply; the first violation is reported as `CorruptAnnotationData`
    /// naming the offending record and field. Nothing is coerced and no bad
    /// record is silently skipped.
    pub fn into_session(self) -> Result<Session> {
        let session_context = || "session".to_string();

        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(corrupt(
                session_context(),
                "duration",
                format!("{} is not a valid video duration", self.duration),
            ));
        }
        if !self.fps.is_finite() || self.fps < 0.0 {
            return Err(corrupt(
                session_context(),
                "fps",
                format!("{} is not a valid frame rate", self.fps),
            ));
        }

        let duration = self.duration;
        let dims = match (self.frame_width, self.frame_height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        };

        let mut seen_ids = HashSet::new();
        let mut max_id = 0u64;
        let mut surfers = Vec::with_capacity(self.surfers.len());

        for record in self.surfers {
            let context = format!("surfer {}", record.id);

            if !seen_ids.insert(record.id) {
                return Err(corrupt(context, "id", format!("duplicate id {}", record.id)));
            }

            if let Some(t) = record.start_time {
                if !t.is_finite() || t < 0.0 || t > duration {
                    return Err(corrupt(
                        context,
                        "start_time",
                        format!("{t} outside 0..={duration}"),
                    ));
                }
            }
            if let Some(t) = record.end_time {
                if !t.is_finite() || t < 0.0 || t > duration {
                    return Err(corrupt(
                        context,
                        "end_time",
                        format!("{t} outside 0..={duration}"),
                    ));
                }
                if let Some(start) = record.start_time {
                    if t <= start {
                        return Err(corrupt(
                            context,
                            "end_time",
                            format!("{t} does not follow start_time {start}"),
                        ));
                    }
                }
            }

            let bbox = match record.bbox {
                Some(values) => {
                    let bbox = BoundingBox::from_array(values);
                    check_imported_bbox(&context, "bbox", bbox, dims)?;
                    Some(bbox)
                }
                None => None,
            };

            let quality = match record.quality {
                Some(value) => match value.parse::<Quality>() {
                    Ok(quality) => Some(quality),
                    Err(_) => {
                        return Err(corrupt(
                            context,
                            "quality",
                            format!("unknown rating {value:?}"),
                        ));
                    }
                },
                None => None,
            };

            let mut bbox_history = Vec::with_capacity(record.bbox_history.len());
            let mut last_time = f64::NEG_INFINITY;
            for sample in record.bbox_history {
                if !sample.time.is_finite()
                    || sample.time < 0.0
                    || sample.time > duration
                    || sample.time <= last_time
                {
                    return Err(corrupt(
                        context,
                        "bbox_history",
                        format!(
                            "sample time {} must lie within 0..={duration} and increase strictly",
                            sample.time
                        ),
                    ));
                }
                let sample_bbox = BoundingBox::from_array(sample.bbox);
                check_imported_bbox(&context, "bbox_history", sample_bbox, dims)?;
                last_time = sample.time;
                bbox_history.push(BboxSample {
                    time: sample.time,
                    bbox: sample_bbox,
                });
            }

            max_id = max_id.max(record.id);
            surfers.push(Annotation {
                id: record.id,
                start_time: record.start_time,
                end_time: record.end_time,
                bbox,
                quality,
                active: false,
                created: record.created.unwrap_or_else(now_iso),
                bbox_history,
                extra: record.extra,
            });
        }

        let (frame_width, frame_height) = dims.unwrap_or((0, 0));
        let created = self.session_created.unwrap_or_else(now_iso);
        let modified = self.session_modified.unwrap_or_else(|| created.clone());

        Ok(Session {
            video_file: self.video_file,
            video: VideoMetadata::new(duration, self.fps, frame_width, frame_height),
            surfers,
            next_id: max_id + 1,
            created,
            modified,
        })
    }
}

fn check_imported_bbox(
    context: &str,
    field: &'static str,
    bbox: BoundingBox,
    dims: Option<(u32, u32)>,
) -> Result<()> {
    if !bbox.is_well_formed() {
        return Err(corrupt(
            context.to_string(),
            field,
            format!("{:?} is malformed", bbox.to_array()),
        ));
    }
    // Bounds can only be checked against a known resolution.
    if let Some((width, height)) = dims {
        if !bbox.fits_frame(width, height) {
            return Err(corrupt(
                context.to_string(),
                field,
                format!("{:?} exceeds {width}x{height} frame", bbox.to_array()),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated_manager() -> AnnotationManager {
        let mut mgr = AnnotationManager::new(
            "session_001.mp4",
            VideoMetadata::new(120.5, 30.0, 1920, 1080),
        );
        let a = mgr.add_surfer(Some(10.2)).unwrap();
        mgr.set_end_time(a, 25.8).unwrap();
        mgr.set_quality(a, Quality::Good).unwrap();
        mgr.set_bbox(a, BoundingBox::new(100.0, 150.0, 200.0, 300.0))
            .unwrap();
        mgr.add_bbox_sample(a, 11.0, BoundingBox::new(110.0, 150.0, 200.0, 300.0))
            .unwrap();
        mgr.add_surfer(Some(40.0)).unwrap(); // partial, end/quality unset
        mgr
    }

    #[test]
    fn test_export_schema_shape() {
        let doc = SessionDocument::from_manager(&populated_manager());
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["video_file"], "session_001.mp4");
        assert_eq!(value["fps"], 30.0);
        assert_eq!(value["surfer_count"], 2);

        let surfer = &value["surfers"][0];
        assert_eq!(surfer["id"], 1);
        assert_eq!(surfer["quality"], "good");
        assert!((surfer["duration"].as_f64().unwrap() - 15.6).abs() < 1e-9);
        assert_eq!(surfer["bbox"][2], 200.0);

        // Partial annotations are serialized with explicit nulls, not
        // dropped.
        let partial = &value["surfers"][1];
        assert_eq!(partial["start_time"], 40.0);
        assert!(partial["end_time"].is_null());
        assert!(partial["duration"].is_null());
        assert!(partial["quality"].is_null());
        assert!(partial["bbox"].is_null());
        assert!(partial.get("bbox_history").is_none());
    }

    #[test]
    fn test_roundtrip_reproduces_session() {
        let mgr = populated_manager();
        let json = serde_json::to_string(&SessionDocument::from_manager(&mgr)).unwrap();
        let doc: SessionDocument = serde_json::from_str(&json).unwrap();
        let rebuilt = doc.into_manager().unwrap();

        assert_eq!(rebuilt.surfers().len(), mgr.surfers().len());
        for original in mgr.surfers() {
            let copy = rebuilt.surfer(original.id).unwrap();
            assert_eq!(copy.start_time, original.start_time);
            assert_eq!(copy.end_time, original.end_time);
            assert_eq!(copy.bbox, original.bbox);
            assert_eq!(copy.quality, original.quality);
            assert_eq!(copy.created, original.created);
            assert_eq!(copy.bbox_history, original.bbox_history);
        }
        assert_eq!(rebuilt.session().next_id, mgr.session().next_id);
        // Editing state does not survive the wire.
        assert!(rebuilt.active_surfer().is_none());
    }

    #[test]
    fn test_import_continues_id_sequence() {
        let json = serde_json::to_string(&SessionDocument::from_manager(&populated_manager()))
            .unwrap();
        let doc: SessionDocument = serde_json::from_str(&json).unwrap();
        let mut rebuilt = doc.into_manager().unwrap();
        assert_eq!(rebuilt.add_surfer(None).unwrap(), 3);
    }

    #[test]
    fn test_import_rejects_unknown_quality() {
        let json = r#"{
            "video_file": "clip.mp4", "duration": 60.0, "fps": 30.0,
            "surfers": [{"id": 1, "start_time": 1.0, "quality": "terrible",
                         "created": "2025-06-01T10:00:00Z"}]
        }"#;
        let doc: SessionDocument = serde_json::from_str(json).unwrap();
        let err = doc.into_session().unwrap_err();
        assert!(matches!(
            err,
            AnnotationError::CorruptAnnotationData { field: "quality", .. }
        ));
    }

    #[test]
    fn test_import_rejects_inverted_times() {
        let json = r#"{
            "video_file": "clip.mp4", "duration": 60.0, "fps": 30.0,
            "surfers": [{"id": 1, "start_time": 20.0, "end_time": 20.0}]
        }"#;
        let doc: SessionDocument = serde_json::from_str(json).unwrap();
        assert!(matches!(
            doc.into_session().unwrap_err(),
            AnnotationError::CorruptAnnotationData { field: "end_time", .. }
        ));
    }

    #[test]
    fn test_import_rejects_duplicate_ids() {
        let json = r#"{
            "video_file": "clip.mp4", "duration": 60.0, "fps": 30.0,
            "surfers": [{"id": 1}, {"id": 1}]
        }"#;
        let doc: SessionDocument = serde_json::from_str(json).unwrap();
        assert!(matches!(
            doc.into_session().unwrap_err(),
            AnnotationError::CorruptAnnotationData { field: "id", .. }
        ));
    }

    #[test]
    fn test_import_bbox_bounds_need_known_resolution() {
        // 1800 + 200 exceeds a 1920-wide frame.
        let with_dims = r#"{
            "video_file": "clip.mp4", "duration": 60.0, "fps": 30.0,
            "frame_width": 1920, "frame_height": 1080,
            "surfers": [{"id": 1, "bbox": [1800.0, 0.0, 200.0, 100.0]}]
        }"#;
        let doc: SessionDocument = serde_json::from_str(with_dims).unwrap();
        assert!(matches!(
            doc.into_session().unwrap_err(),
            AnnotationError::CorruptAnnotationData { field: "bbox", .. }
        ));

        // Without dimensions only the shape is checked.
        let without_dims = r#"{
            "video_file": "clip.mp4", "duration": 60.0, "fps": 30.0,
            "surfers": [{"id": 1, "bbox": [1800.0, 0.0, 200.0, 100.0]}]
        }"#;
        let doc: SessionDocument = serde_json::from_str(without_dims).unwrap();
        assert!(doc.into_session().is_ok());

        let malformed = r#"{
            "video_file": "clip.mp4", "duration": 60.0, "fps": 30.0,
            "surfers": [{"id": 1, "bbox": [-5.0, 0.0, 50.0, 50.0]}]
        }"#;
        let doc: SessionDocument = serde_json::from_str(malformed).unwrap();
        assert!(matches!(
            doc.into_session().unwrap_err(),
            AnnotationError::CorruptAnnotationData { field: "bbox", .. }
        ));
    }

    #[test]
    fn test_unknown_fields_survive_roundtrip() {
        let json = r#"{
            "video_file": "clip.mp4", "duration": 60.0, "fps": 30.0,
            "surfers": [{"id": 1, "start_time": 2.0, "spotted_by": "drone2",
                         "confidence": 0.87}]
        }"#;
        let doc: SessionDocument = serde_json::from_str(json).unwrap();
        let session = doc.into_session().unwrap();
        assert_eq!(
            session.surfers[0].extra.get("spotted_by"),
            Some(&Value::from("drone2"))
        );

        let reexported =
            serde_json::to_value(SessionDocument::from_session(&session)).unwrap();
        assert_eq!(reexported["surfers"][0]["spotted_by"], "drone2");
        assert_eq!(reexported["surfers"][0]["confidence"], 0.87);
    }

    #[test]
    fn test_import_rejects_unordered_bbox_history() {
        let json = r#"{
            "video_file": "clip.mp4", "duration": 60.0, "fps": 30.0,
            "surfers": [{"id": 1, "bbox_history": [
                {"time": 5.0, "bbox": [0.0, 0.0, 10.0, 10.0]},
                {"time": 5.0, "bbox": [1.0, 0.0, 10.0, 10.0]}
            ]}]
        }"#;
        let doc: SessionDocument = serde_json::from_str(json).unwrap();
        assert!(matches!(
            doc.into_session().unwrap_err(),
            AnnotationError::CorruptAnnotationData { field: "bbox_history", .. }
        ));
    }
}
