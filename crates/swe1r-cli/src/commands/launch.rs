//! Launch command implementation.
//!
//! Starts the game with its main thread suspended, patches the image in
//! memory and then lets it run. The executable on disk is left untouched.

use anyhow::Result;
use std::path::Path;
use swe1r_core::{BuildOffsets, PatchConfig};

use super::{load_build_table, load_config};

/// Run the launch command
pub fn run(exe: &Path, config: &Path, builds: Option<&Path>, args: &[String]) -> Result<()> {
    let config = load_config(config)?;
    let builds = load_build_table(builds)?;
    launch(exe, &config, &builds, args)
}

#[cfg(target_os = "windows")]
fn launch(exe: &Path, config: &PatchConfig, builds: &[BuildOffsets], args: &[String]) -> Result<()> {
    use anyhow::Context;

    let report = swe1r_core::patch_process(exe, args, config, builds)
        .with_context(|| format!("Failed to launch {}", exe.display()))?;
    super::print_report(&report);
    println!("Game running.");
    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn launch(
    exe: &Path,
    _config: &PatchConfig,
    _builds: &[BuildOffsets],
    _args: &[String],
) -> Result<()> {
    anyhow::bail!(
        "Cannot launch {}: patching a running game requires Windows, use `patch` instead",
        exe.display()
    )
}
