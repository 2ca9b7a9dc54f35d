//! Hex address parsing utilities.

use anyhow::Result;
use swe1r_core::Address;

/// Parse a hex address string (with or without 0x prefix).
///
/// # Examples
///
/// ```ignore
/// assert_eq!(parse_hex_address("0x4AF9B0").unwrap(), 0x004A_F9B0);
/// assert_eq!(parse_hex_address("4af9b0").unwrap(), 0x004A_F9B0);
/// ```
pub fn parse_hex_address(s: &str) -> Result<Address> {
    let s = s.trim_start_matches("0x").trim_start_matches("0X");
    Address::from_str_radix(s, 16).map_err(|e| anyhow::anyhow!("Invalid hex address: {}", e))
}
