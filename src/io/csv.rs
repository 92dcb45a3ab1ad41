// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! CSV export for downstream analysis.
//!
//! One row per surfer annotation with a fixed column set; fields that are
//! still unset render as empty cells, never as omitted columns.

use anyhow::Result;
use std::path::Path;

use crate::manager::AnnotationManager;
use crate::models::annotation::Annotation;

/// Fixed column order of the export.
pub const CSV_COLUMNS: [&str; 11] = [
    "video_file",
    "surfer_id",
    "start_time",
    "end_time",
    "duration",
    "bbox_x",
    "bbox_y",
    "bbox_w",
    "bbox_h",
    "quality",
    "created",
];

/// Escape a value for CSV: wrap in quotes if it contains comma, quote, or
/// newline.
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn opt_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn row(video_file: &str, surfer: &Annotation) -> String {
    let bbox = surfer.bbox.map(|b| b.to_array());
    let cells = [
        csv_escape(video_file),
        surfer.id.to_string(),
        opt_cell(surfer.start_time),
        opt_cell(surfer.end_time),
        opt_cell(surfer.duration()),
        opt_cell(bbox.map(|b| b[0])),
        opt_cell(bbox.map(|b| b[1])),
        opt_cell(bbox.map(|b| b[2])),
        opt_cell(bbox.map(|b| b[3])),
        surfer
            .quality
            .map(|q| q.as_str().to_string())
            .unwrap_or_default(),
        csv_escape(&surfer.created),
    ];
    cells.join(",")
}

/// Build the CSV document for a session, header row first.
pub fn csv_string(manager: &AnnotationManager) -> String {
    let session = manager.session();
    let mut lines = Vec::with_capacity(session.surfers.len() + 1);
    lines.push(CSV_COLUMNS.join(","));
    for surfer in &session.surfers {
        lines.push(row(&session.video_file, surfer));
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Export a session to a CSV file.
pub fn export_csv(manager: &AnnotationManager, path: &Path) -> Result<()> {
    std::fs::write(path, csv_string(manager))?;
    Ok(())
}
