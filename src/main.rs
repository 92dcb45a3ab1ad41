// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! RIDES - Ride Interval Designation and Evaluation System
//!
//! Command-line companion to the annotation library: inspect, validate, and
//! convert annotation files produced by the labeling front ends.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use rides::io::serialization;
use rides::AnnotationManager;

#[derive(Parser)]
#[command(name = "rides", version, about = "Surf ride annotation data tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print session summary and ride statistics for an annotation file
    Info {
        /// Annotation file (.json or .yaml)
        file: PathBuf,
    },
    /// Convert an annotation file to another format (json, yaml, csv)
    Convert {
        /// Input annotation file (.json or .yaml)
        input: PathBuf,
        /// Output file; format chosen by extension
        output: PathBuf,
        /// Back up the output file first if it already exists
        #[arg(long)]
        backup: bool,
    },
    /// Validate an annotation file and report the first violation, if any
    Validate {
        /// Annotation file (.json or .yaml)
        file: PathBuf,
    },
}

fn print_info(manager: &AnnotationManager) {
    let session = manager.session();
    println!("video_file: {}", session.video_file);
    println!("duration:   {:.2}s @ {:.2} fps", session.video.duration, session.video.fps);
    println!(
        "resolution: {}x{}",
        session.video.frame_width, session.video.frame_height
    );
    println!("surfers:    {}", session.surfers.len());

    for surfer in manager.surfers() {
        let times = match (surfer.start_time, surfer.end_time) {
            (Some(start), Some(end)) => format!("{start:.2}s - {end:.2}s"),
            (Some(start), None) => format!("{start:.2}s - ?"),
            _ => "unset".to_string(),
        };
        let quality = surfer
            .quality
            .map(|q| q.as_str())
            .unwrap_or("unrated");
        println!("  #{:<4} {:<22} {}", surfer.id, times, quality);
    }

    let stats = manager.get_statistics();
    println!(
        "completed:  {}/{} ({:.0}%)",
        stats.completed_surfers,
        stats.total_surfers,
        stats.completion_rate * 100.0
    );
    if stats.completed_surfers > 0 {
        println!(
            "ride time:  mean {:.2}s, min {:.2}s, max {:.2}s",
            stats.mean_ride_duration, stats.min_ride_duration, stats.max_ride_duration
        );
    }
    let q = stats.quality_counts;
    println!(
        "quality:    poor {}, average {}, good {}, excellent {}",
        q.poor, q.average, q.good, q.excellent
    );
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Info { file } => {
            let manager = serialization::import_annotations(&file)?;
            print_info(&manager);
        }
        Command::Convert {
            input,
            output,
            backup,
        } => {
            let manager = serialization::import_annotations(&input)?;
            if backup {
                if let Some(path) = serialization::backup_annotations(&output)? {
                    log::info!("Backed up existing file to {}", path.display());
                }
            }
            serialization::export_annotations(&manager, &output)?;
            log::info!(
                "Converted {} annotations to {}",
                manager.surfers().len(),
                output.display()
            );
            println!("wrote {}", output.display());
        }
        Command::Validate { file } => match serialization::import_annotations(&file) {
            Ok(manager) => {
                println!("OK: {} surfers", manager.surfers().len());
            }
            Err(e) => {
                log::error!("Validation failed for {}: {e}", file.display());
                return Err(e);
            }
        },
    }

    Ok(())
}
