// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation file serialization and deserialization.
//!
//! This module handles exporting and importing annotation sessions in JSON
//! and YAML formats, plus the annotation-filename and backup conventions
//! used alongside a video file.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

use crate::io::csv;
use crate::io::document::SessionDocument;
use crate::manager::AnnotationManager;

/// Serialize a session to the canonical JSON document.
pub fn json_string(manager: &AnnotationManager) -> Result<String> {
    let document = SessionDocument::from_manager(manager);
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Export a session to JSON format.
pub fn export_json(manager: &AnnotationManager, path: &Path) -> Result<()> {
    std::fs::write(path, json_string(manager)?)?;
    Ok(())
}

/// Export a session to YAML format.
pub fn export_yaml(manager: &AnnotationManager, path: &Path) -> Result<()> {
    let document = SessionDocument::from_manager(manager);
    let yaml = serde_yaml::to_string(&document)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Rebuild a session from a JSON document string.
pub fn from_json_str(json: &str) -> Result<AnnotationManager> {
    let document: SessionDocument = serde_json::from_str(json)?;
    Ok(document.into_manager()?)
}

/// Import a session from JSON format.
pub fn import_json(path: &Path) -> Result<AnnotationManager> {
    let json = std::fs::read_to_string(path)?;
    from_json_str(&json)
}

/// Import a session from YAML format.
pub fn import_yaml(path: &Path) -> Result<AnnotationManager> {
    let yaml = std::fs::read_to_string(path)?;
    let document: SessionDocument = serde_yaml::from_str(&yaml)?;
    Ok(document.into_manager()?)
}

/// Export a session to the format named by the path's extension
/// (json, yaml/yml, or csv).
pub fn export_annotations(manager: &AnnotationManager, path: &Path) -> Result<()> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => export_yaml(manager, path),
        Some("json") => export_json(manager, path),
        Some("csv") => csv::export_csv(manager, path),
        other => bail!("unsupported annotation file extension: {:?}", other),
    }
}

/// Import a session from the format named by the path's extension
/// (json or yaml/yml).
pub fn import_annotations(path: &Path) -> Result<AnnotationManager> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => import_yaml(path),
        Some("json") => import_json(path),
        other => bail!("unsupported annotation file extension: {:?}", other),
    }
}

/// The annotation file conventionally stored next to a video:
/// `<stem>_annotations.json`.
pub fn annotation_filename(video_path: &Path) -> PathBuf {
    let stem = video_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("annotations");
    video_path.with_file_name(format!("{stem}_annotations.json"))
}

/// Copy an existing annotation file to a timestamped backup before it is
/// overwritten. Returns the backup path, or `None` when there is nothing to
/// back up.
pub fn backup_annotations(annotation_path: &Path) -> Result<Option<PathBuf>> {
    if !annotation_path.exists() {
        return Ok(None);
    }
    let stem = annotation_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("annotations");
    let extension = annotation_path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("json");
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let backup_path =
        annotation_path.with_file_name(format!("{stem}_backup_{stamp}.{extension}"));
    std::fs::copy(annotation_path, &backup_path)?;
    Ok(Some(backup_path))
}
