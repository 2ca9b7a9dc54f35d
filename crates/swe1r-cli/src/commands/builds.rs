//! Builds command implementation.

use anyhow::{Context, Result};
use std::path::Path;
use swe1r_core::{builtin_builds, save_builds};

/// Run the builds command
pub fn run(output: Option<&Path>) -> Result<()> {
    let builds = builtin_builds();

    match output {
        Some(path) => {
            save_builds(path, &builds)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} builds saved to: {}", builds.len(), path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&builds)?),
    }

    Ok(())
}
