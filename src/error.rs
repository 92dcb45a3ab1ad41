// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Validation error types.
//!
//! Every error here is locally recoverable: the manager leaves prior state
//! intact and reports the failure to the caller (UI or import routine) with
//! enough context to render a corrective message. The manager itself never
//! logs and never terminates the process.

use thiserror::Error;

/// Errors reported by annotation operations and import validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnnotationError {
    /// A start or end time is non-finite, outside the video, or inverted
    /// relative to its counterpart.
    #[error("invalid {field} {value}: {detail}")]
    InvalidTimeRange {
        field: &'static str,
        value: f64,
        detail: String,
    },

    /// A bounding box is malformed or lies outside the frame.
    #[error("invalid bounding box [{x}, {y}, {width}, {height}]: {detail}")]
    InvalidBoundingBox {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        detail: String,
    },

    /// A quality rating outside the enumerated set.
    #[error("unknown quality rating {value:?} (expected poor, average, good, or excellent)")]
    InvalidQuality { value: String },

    /// No surfer with the given id exists in the session.
    #[error("surfer {id} not found")]
    NotFound { id: u64 },

    /// An imported document failed validation. Names the first offending
    /// record and field rather than coercing or skipping it.
    #[error("corrupt annotation data ({context}): field \"{field}\": {detail}")]
    CorruptAnnotationData {
        context: String,
        field: &'static str,
        detail: String,
    },
}

/// Convenience alias for annotation operation results.
pub type Result<T> = std::result::Result<T, AnnotationError>;
