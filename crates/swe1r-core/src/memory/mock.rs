//! In-memory address space for unit tests

use super::{Address, AddressSpace, TargetMode};
use crate::error::{Error, Result};

/// A flat byte buffer mapped at `base`
pub struct MockSpace {
    base: Address,
    bytes: Vec<u8>,
}

impl MockSpace {
    pub fn new(base: Address, size: usize) -> Self {
        Self {
            base,
            bytes: vec![0; size],
        }
    }

    pub fn filled(base: Address, size: usize, fill: u8) -> Self {
        Self {
            base,
            bytes: vec![fill; size],
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn slice(&self, address: Address, len: usize) -> &[u8] {
        let start = (address - self.base) as usize;
        &self.bytes[start..start + len]
    }

    fn range(&self, address: Address, len: usize) -> Result<std::ops::Range<usize>> {
        let start = address
            .checked_sub(self.base)
            .ok_or(Error::AddressUnmapped { address, len })? as usize;
        let end = start + len;
        if end > self.bytes.len() {
            return Err(Error::AddressUnmapped { address, len });
        }
        Ok(start..end)
    }
}

impl AddressSpace for MockSpace {
    fn mode(&self) -> TargetMode {
        TargetMode::InProcess
    }

    fn read_bytes(&self, address: Address, buf: &mut [u8]) -> Result<()> {
        let range = self.range(address, buf.len())?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write_bytes(&mut self, address: Address, data: &[u8]) -> Result<()> {
        let range = self.range(address, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }
}
