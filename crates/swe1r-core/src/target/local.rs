use std::ffi::c_void;

use tracing::{debug, warn};
use windows::Win32::System::Memory::{
    MEM_COMMIT, MEM_RESERVE, PAGE_EXECUTE_READWRITE, PAGE_PROTECTION_FLAGS, VirtualAlloc,
    VirtualProtect,
};

use crate::error::{Error, Result};
use crate::image::PatchRegion;
use crate::memory::{Address, AddressSpace, TargetMode};

/// The current process, for when the patcher is loaded into the game itself
///
/// Only meaningful in a 32-bit build where image addresses are pointers.
pub struct InProcess {
    _private: (),
}

impl InProcess {
    /// # Safety
    ///
    /// Every address passed to this target is dereferenced as-is. The caller
    /// guarantees the game image is mapped at the addresses being patched
    /// and that no other thread executes the code while it changes.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }

    pub fn allocate(&mut self, size: u32) -> Result<PatchRegion> {
        // SAFETY: a fresh allocation aliases nothing.
        let base = unsafe {
            VirtualAlloc(
                None,
                size as usize,
                MEM_COMMIT | MEM_RESERVE,
                PAGE_EXECUTE_READWRITE,
            )
        };
        if base.is_null() {
            return Err(Error::AllocationFailed { size });
        }
        let start = base as usize as Address;
        debug!("Allocated 0x{:X} bytes at 0x{:08X}", size, start);
        Ok(PatchRegion {
            start,
            capacity: size,
        })
    }
}

impl AddressSpace for InProcess {
    fn mode(&self) -> TargetMode {
        TargetMode::InProcess
    }

    fn read_bytes(&self, address: Address, buf: &mut [u8]) -> Result<()> {
        // SAFETY: the caller of `InProcess::new` vouched for the address range.
        unsafe {
            std::ptr::copy_nonoverlapping(
                address as usize as *const u8,
                buf.as_mut_ptr(),
                buf.len(),
            );
        }
        Ok(())
    }

    fn write_bytes(&mut self, address: Address, data: &[u8]) -> Result<()> {
        let target = address as usize as *mut c_void;
        let mut old_protect = PAGE_PROTECTION_FLAGS(0);
        unsafe { VirtualProtect(target, data.len(), PAGE_EXECUTE_READWRITE, &mut old_protect) }
            .map_err(|e| Error::MemoryWriteFailed {
                address,
                message: format!("VirtualProtect: {}", e),
            })?;

        // SAFETY: the range was made writable above.
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), target.cast::<u8>(), data.len());
        }

        let mut ignored = PAGE_PROTECTION_FLAGS(0);
        if let Err(e) = unsafe { VirtualProtect(target, data.len(), old_protect, &mut ignored) } {
            warn!("Failed to restore protection at 0x{:08X}: {}", address, e);
        }
        Ok(())
    }
}
