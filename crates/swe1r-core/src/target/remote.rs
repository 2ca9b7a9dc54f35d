use std::ffi::c_void;
use std::path::Path;

use tracing::{debug, info, warn};
use windows::Win32::Foundation::{BOOL, CloseHandle, HANDLE};
use windows::Win32::System::Diagnostics::Debug::{ReadProcessMemory, WriteProcessMemory};
use windows::Win32::System::Memory::{
    MEM_COMMIT, MEM_RESERVE, PAGE_EXECUTE_READWRITE, PAGE_PROTECTION_FLAGS, VirtualAllocEx,
    VirtualProtectEx,
};
use windows::Win32::System::Threading::{
    CREATE_SUSPENDED, CreateProcessW, PROCESS_INFORMATION, ResumeThread, STARTUPINFOW,
    TerminateProcess,
};
use windows::core::{HSTRING, PCWSTR, PWSTR};

use crate::error::{Error, Result};
use crate::image::PatchRegion;
use crate::memory::{Address, AddressSpace, TargetMode};

/// A child process started suspended so it can be patched before it runs
pub struct RemoteProcess {
    process: HANDLE,
    thread: HANDLE,
    pid: u32,
    resumed: bool,
}

impl RemoteProcess {
    /// Start `exe` with its main thread suspended.
    ///
    /// The working directory is the executable's directory so the game finds
    /// its data files.
    pub fn spawn_suspended(exe: &Path, args: &[String]) -> Result<Self> {
        let mut command_line = format!("\"{}\"", exe.display());
        for arg in args {
            command_line.push(' ');
            command_line.push_str(arg);
        }
        let mut command_line: Vec<u16> = command_line.encode_utf16().chain(Some(0)).collect();
        let application = HSTRING::from(exe.as_os_str());
        let directory = exe
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| HSTRING::from(p.as_os_str()));

        let startup = STARTUPINFOW {
            cb: std::mem::size_of::<STARTUPINFOW>() as u32,
            ..Default::default()
        };
        let mut info = PROCESS_INFORMATION::default();

        // SAFETY: every pointer refers to a buffer that outlives the call and
        // the command line buffer is mutable as CreateProcessW requires.
        unsafe {
            CreateProcessW(
                &application,
                PWSTR(command_line.as_mut_ptr()),
                None,
                None,
                BOOL::from(false),
                CREATE_SUSPENDED,
                None,
                directory
                    .as_ref()
                    .map_or(PCWSTR::null(), |d| PCWSTR(d.as_ptr())),
                &startup,
                &mut info,
            )
        }
        .map_err(|e| Error::ProcessSpawnFailed(format!("{}: {}", exe.display(), e)))?;

        info!("Started {} suspended (PID {})", exe.display(), info.dwProcessId);
        Ok(Self {
            process: info.hProcess,
            thread: info.hThread,
            pid: info.dwProcessId,
            resumed: false,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Reserve and commit executable memory anywhere in the child
    pub fn allocate(&mut self, size: u32) -> Result<PatchRegion> {
        // SAFETY: allocation in another process has no effect on our memory.
        let base = unsafe {
            VirtualAllocEx(
                self.process,
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
        debug!("Allocated 0x{:X} bytes at 0x{:08X} in PID {}", size, start, self.pid);
        Ok(PatchRegion {
            start,
            capacity: size,
        })
    }

    /// Let the patched process run
    pub fn resume(mut self) -> Result<()> {
        let previous = unsafe { ResumeThread(self.thread) };
        if previous == u32::MAX {
            return Err(Error::ProcessSpawnFailed(format!(
                "failed to resume PID {}",
                self.pid
            )));
        }
        self.resumed = true;
        info!("Resumed PID {}", self.pid);
        Ok(())
    }
}

impl AddressSpace for RemoteProcess {
    fn mode(&self) -> TargetMode {
        TargetMode::RemoteProcess
    }

    fn read_bytes(&self, address: Address, buf: &mut [u8]) -> Result<()> {
        let mut read = 0usize;
        // SAFETY: `buf` is valid for `buf.len()` bytes of writes.
        unsafe {
            ReadProcessMemory(
                self.process,
                address as usize as *const c_void,
                buf.as_mut_ptr().cast(),
                buf.len(),
                Some(&mut read),
            )
        }
        .map_err(|e| Error::MemoryReadFailed {
            address,
            message: e.to_string(),
        })?;
        if read != buf.len() {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!("read {} of {} bytes", read, buf.len()),
            });
        }
        Ok(())
    }

    fn write_bytes(&mut self, address: Address, data: &[u8]) -> Result<()> {
        let target = address as usize as *const c_void;
        let mut old_protect = PAGE_PROTECTION_FLAGS(0);
        unsafe {
            VirtualProtectEx(
                self.process,
                target,
                data.len(),
                PAGE_EXECUTE_READWRITE,
                &mut old_protect,
            )
        }
        .map_err(|e| Error::MemoryWriteFailed {
            address,
            message: format!("VirtualProtectEx: {}", e),
        })?;

        let mut written = 0usize;
        // SAFETY: `data` is valid for `data.len()` bytes of reads.
        let result = unsafe {
            WriteProcessMemory(
                self.process,
                target,
                data.as_ptr().cast(),
                data.len(),
                Some(&mut written),
            )
        };

        let mut ignored = PAGE_PROTECTION_FLAGS(0);
        if let Err(e) =
            unsafe { VirtualProtectEx(self.process, target, data.len(), old_protect, &mut ignored) }
        {
            warn!("Failed to restore protection at 0x{:08X}: {}", address, e);
        }

        result.map_err(|e| Error::MemoryWriteFailed {
            address,
            message: e.to_string(),
        })?;
        if written != data.len() {
            return Err(Error::MemoryWriteFailed {
                address,
                message: format!("wrote {} of {} bytes", written, data.len()),
            });
        }
        Ok(())
    }
}

impl Drop for RemoteProcess {
    fn drop(&mut self) {
        unsafe {
            if !self.resumed {
                warn!("Terminating PID {} which was never resumed", self.pid);
                let _ = TerminateProcess(self.process, 1);
            }
            let _ = CloseHandle(self.thread);
            let _ = CloseHandle(self.process);
        }
    }
}
