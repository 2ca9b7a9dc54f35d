//! Patch command implementation.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use super::{load_build_table, load_config, print_report};

/// Run the patch command
pub fn run(exe: &Path, config: &Path, builds: Option<&Path>, report: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let builds = load_build_table(builds)?;

    info!("Patching {}", exe.display());
    let result = swe1r_core::patch_file(exe, &config, &builds).map_err(|e| {
        let category = e.category();
        anyhow::Error::new(e).context(format!("Failed to patch {} ({})", exe.display(), category))
    })?;

    print_report(&result);

    if let Some(path) = report {
        result
            .save(path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        println!("Report saved to: {}", path.display());
    }

    Ok(())
}
