use serde::Serialize;
use strum::{Display, IntoStaticStr};

use crate::error::Result;

/// 32-bit virtual address inside the patched image
pub type Address = u32;

/// Storage model behind an [`AddressSpace`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr, Serialize)]
pub enum TargetMode {
    /// Executable on disk; addresses are translated to file offsets
    #[strum(serialize = "file")]
    FileBacked,
    /// Suspended child process reached through the debug API
    #[strum(serialize = "remote-process")]
    RemoteProcess,
    /// The current process
    #[strum(serialize = "in-process")]
    InProcess,
}

/// Raw byte access to a patch target.
///
/// All three storage models expose the same contract: addresses are virtual
/// addresses of the loaded image, and a call either transfers every byte or
/// fails. Implementations translate the address however their mode needs.
pub trait AddressSpace {
    fn mode(&self) -> TargetMode;

    /// Fill `buf` with the bytes starting at `address`
    fn read_bytes(&self, address: Address, buf: &mut [u8]) -> Result<()>;

    /// Write all of `data` starting at `address`
    fn write_bytes(&mut self, address: Address, data: &[u8]) -> Result<()>;

    fn read_vec(&self, address: Address, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_bytes(address, &mut buf)?;
        Ok(buf)
    }
}
