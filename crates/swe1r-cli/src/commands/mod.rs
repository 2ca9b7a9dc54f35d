//! CLI command implementations.
//!
//! This module contains the implementation of each CLI command.

pub mod builds;
pub mod hex_utils;
pub mod hexdump;
pub mod info;
pub mod launch;
pub mod patch;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;
use swe1r_core::{BuildOffsets, PatchConfig, PatchReport, builtin_builds, load_builds};

/// Load the build table from `path`, or the built-in one
pub fn load_build_table(path: Option<&Path>) -> Result<Vec<BuildOffsets>> {
    match path {
        Some(path) => load_builds(path)
            .with_context(|| format!("Failed to load build table {}", path.display())),
        None => Ok(builtin_builds()),
    }
}

pub fn load_config(path: &Path) -> Result<PatchConfig> {
    PatchConfig::load_or_default(path)
        .with_context(|| format!("Failed to load config {}", path.display()))
}

/// Print what a patch run did
pub fn print_report(report: &PatchReport) {
    println!(
        "{} build {} ({}), {} target",
        "Patched".green().bold(),
        report.build,
        report.timestamp,
        report.mode
    );
    println!(
        "Region:  {}..{} ({} of {} bytes used)",
        report.region_start, report.region_end, report.bytes_used, report.capacity
    );
    for patch in &report.patches {
        println!(
            "  {:<12} {}..{} {:>8} bytes",
            patch.name, patch.start, patch.end, patch.size
        );
    }
    let guid_note = if report.rekeyed { "rekeyed" } else { "unchanged" };
    println!("Network GUID: {} ({})", report.network_guid, guid_note);
}
