//! `dinput.dll` stand-in that patches the game from inside its own process.
//!
//! Copied next to `swep1rcr.exe`, this library is loaded in place of the
//! system DirectInput. The first `DirectInputCreateA` call applies the
//! patches, then every call is forwarded to the system library.

use std::path::{Path, PathBuf};

use swe1r_core::{BuildOffsets, PatchConfig, Result, builtin_builds, load_builds};
use tracing::info;

#[cfg(target_os = "windows")]
mod proxy;

#[cfg(target_os = "windows")]
pub use proxy::DirectInputCreateA;

pub const CONFIG_FILE: &str = "patcher.toml";
/// Optional build table replacing the built-in one
pub const BUILDS_FILE: &str = "builds.json";
pub const LOG_FILE: &str = "patcher.log";

/// Config and build table from `dir`, with defaults for missing files
pub fn load_settings(dir: &Path) -> Result<(PatchConfig, Vec<BuildOffsets>)> {
    let config = PatchConfig::load_or_default(dir.join(CONFIG_FILE))?;
    let builds = match load_builds(dir.join(BUILDS_FILE)) {
        Err(e) if e.is_not_found() => builtin_builds(),
        other => {
            let builds = other?;
            info!("Loaded {} builds from {}", builds.len(), BUILDS_FILE);
            builds
        }
    };
    Ok((config, builds))
}

/// The real DirectInput inside the Windows system directory
pub fn system_dinput_path(system_dir: &Path) -> PathBuf {
    system_dir.join("dinput.dll")
}
