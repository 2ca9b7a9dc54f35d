//! Network GUID derivation.
//!
//! Every gameplay change is mixed into an RC4 state with the key schedule.
//! The GUID is the first 16 keystream bytes of that state, so two installs
//! share a GUID only if they applied the same changes in the same order.

use crate::error::{Error, Result};
use crate::memory::{Address, AddressSpace};

/// Stored in the first two GUID bytes; bump when the derivation changes
pub const FINGERPRINT_VERSION: u16 = 0x0000;

pub const FINGERPRINT_LEN: usize = 16;

/// Longest input a single mix accepts
pub const MAX_MIX_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    state: [u8; 256],
    mixes: usize,
}

impl Default for Fingerprint {
    fn default() -> Self {
        Self::new()
    }
}

impl Fingerprint {
    /// Identity permutation, nothing mixed in
    pub fn new() -> Self {
        let mut state = [0u8; 256];
        for (i, slot) in state.iter_mut().enumerate() {
            *slot = i as u8;
        }
        Self { state, mixes: 0 }
    }

    /// Run the RC4 key schedule over the current state with `input` as key
    pub fn mix(&mut self, input: &[u8]) -> Result<()> {
        if input.is_empty() {
            return Ok(());
        }
        if input.len() > MAX_MIX_LEN {
            return Err(Error::InvalidInput(format!(
                "fingerprint input of {} bytes exceeds {}",
                input.len(),
                MAX_MIX_LEN
            )));
        }

        let mut j = 0u8;
        for i in 0..256 {
            j = j
                .wrapping_add(self.state[i])
                .wrapping_add(input[i % input.len()]);
            self.state.swap(i, usize::from(j));
        }
        self.mixes += 1;
        Ok(())
    }

    pub fn mix_count(&self) -> usize {
        self.mixes
    }

    /// 16 keystream bytes from a copy of the state, version marker first
    pub fn derive(&self) -> [u8; FINGERPRINT_LEN] {
        let mut s = self.state;
        let mut i = 0u8;
        let mut j = 0u8;
        let mut out = [0u8; FINGERPRINT_LEN];
        for byte in out.iter_mut() {
            i = i.wrapping_add(1);
            j = j.wrapping_add(s[usize::from(i)]);
            s.swap(usize::from(i), usize::from(j));
            *byte = s[usize::from(s[usize::from(i)].wrapping_add(s[usize::from(j)]))];
        }
        out[..2].copy_from_slice(&FINGERPRINT_VERSION.to_le_bytes());
        out
    }

    /// Store the derived GUID at `address`
    pub fn write(
        &self,
        space: &mut dyn AddressSpace,
        address: Address,
    ) -> Result<[u8; FINGERPRINT_LEN]> {
        let guid = self.derive();
        space.write_bytes(address, &guid)?;
        Ok(guid)
    }
}

/// Uppercase hex, the way the GUID is usually shown
pub fn format_guid(guid: &[u8]) -> String {
    guid.iter().map(|b| format!("{:02X}", b)).collect()
}
