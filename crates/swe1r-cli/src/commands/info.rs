//! Info command implementation.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;
use swe1r_core::{FileTarget, find_build};

use super::load_build_table;

/// Run the info command
pub fn run(exe: &Path, builds: Option<&Path>) -> Result<()> {
    let builds = load_build_table(builds)?;
    let target =
        FileTarget::open(exe).with_context(|| format!("Failed to open {}", exe.display()))?;
    let headers = target.headers()?;

    println!("{}", exe.display().bold());
    println!();
    println!("Machine:        0x{:04X}", headers.machine);
    match headers.build_date() {
        Some(date) => println!(
            "Timestamp:      0x{:08X} ({})",
            headers.timestamp,
            date.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        None => println!("Timestamp:      0x{:08X}", headers.timestamp),
    }
    println!("Image base:     0x{:08X}", headers.image_base);
    println!("Size of image:  0x{:X}", headers.size_of_image);
    println!(
        "Headers:        0x{:X} bytes, room for {} more section(s)",
        headers.size_of_headers,
        headers.spare_descriptors()
    );

    match find_build(&builds, headers.timestamp) {
        Ok(build) => println!("Build:          {}", build.name.green()),
        Err(_) => println!("Build:          {}", "unsupported".red()),
    }
    match headers.patch_section() {
        Some(section) => println!(
            "State:          {} (region 0x{:08X}, {} bytes)",
            "patched".yellow(),
            headers.image_base + section.virtual_address,
            section.virtual_size
        ),
        None => println!("State:          {}", "unmodified".green()),
    }

    println!();
    println!(
        "{:<8} {:>10} {:>10} {:>10} {:>10}  flags",
        "name", "address", "vsize", "offset", "rawsize"
    );
    for section in &headers.sections {
        let line = format!(
            "{:<8} 0x{:08X} {:>10} 0x{:08X} {:>10}  {:?}",
            section.name_str(),
            headers.image_base + section.virtual_address,
            section.virtual_size,
            section.raw_offset,
            section.raw_size,
            section.characteristics
        );
        if section.is_sentinel() {
            println!("{}", line.yellow());
        } else {
            println!("{}", line);
        }
    }

    Ok(())
}
