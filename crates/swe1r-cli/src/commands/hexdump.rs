//! Hexdump command implementation.
//!
//! Displays bytes of an executable on disk, addressed by the virtual
//! addresses they load at, useful for checking patch sites and caves.
//!
//! # Output Format
//!
//! ```text
//! 0x0044FCE0: 48 65 6C 6C 6F 20 57 6F  72 6C 64 00 00 00 00 00  |Hello World.....|
//! ```

use anyhow::{Context, Result};
use std::path::Path;
use swe1r_core::{Address, AddressSpace, FileTarget};

use super::hex_utils::parse_hex_address;

/// Run the hexdump command
pub fn run(exe: &Path, address: &str, size: usize, ascii: bool) -> Result<()> {
    let address = parse_hex_address(address)?;
    let target =
        FileTarget::open(exe).with_context(|| format!("Failed to open {}", exe.display()))?;
    let bytes = target.read_vec(address, size)?;

    println!("Hexdump at 0x{:08X} ({} bytes):", address, size);
    println!();

    for (i, chunk) in bytes.chunks(16).enumerate() {
        println!("{}", format_line(address + (i * 16) as Address, chunk, ascii));
    }

    Ok(())
}

/// One line of up to 16 bytes
fn format_line(address: Address, chunk: &[u8], ascii: bool) -> String {
    let mut line = format!("0x{:08X}: ", address);

    for j in 0..16 {
        if j == 8 {
            line.push(' ');
        }
        match chunk.get(j) {
            Some(byte) => line.push_str(&format!("{:02X} ", byte)),
            None => line.push_str("   "),
        }
    }

    if ascii {
        line.push_str(" |");
        for byte in chunk {
            if (0x20..0x7F).contains(byte) {
                line.push(*byte as char);
            } else {
                line.push('.');
            }
        }
        for _ in chunk.len()..16 {
            line.push(' ');
        }
        line.push('|');
    }

    line
}
