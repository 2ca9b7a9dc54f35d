use std::ffi::c_void;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once, OnceLock};

use swe1r_core::patch_in_process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use windows::Win32::Foundation::{E_FAIL, HINSTANCE, MAX_PATH};
use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};
use windows::Win32::System::SystemInformation::GetSystemDirectoryW;
use windows::core::{HRESULT, HSTRING, s};

use crate::{LOG_FILE, load_settings, system_dinput_path};

type CreateFn =
    unsafe extern "system" fn(HINSTANCE, u32, *mut *mut c_void, *mut c_void) -> HRESULT;

static PATCHED: Once = Once::new();
static SYSTEM_CREATE: OnceLock<Option<CreateFn>> = OnceLock::new();

/// The game has no console, so logs go to a file in its directory
fn init_logging() {
    let Ok(file) = File::create(LOG_FILE) else {
        return;
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("swe1r=info,dinput=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
}

fn patch_game() {
    let result = load_settings(Path::new(".")).and_then(|(config, builds)| {
        // SAFETY: this library is mapped into the game, and the game's only
        // thread is blocked in its first DirectInputCreateA call.
        unsafe { patch_in_process(&config, &builds) }
    });
    match result {
        Ok(report) => info!(
            "Patched build {} in process ({} of {} bytes used)",
            report.build, report.bytes_used, report.capacity
        ),
        Err(e) => error!("Patching failed, the game runs unpatched: {}", e),
    }
}

fn load_system_create() -> Option<CreateFn> {
    let mut buffer = [0u16; MAX_PATH as usize];
    let len = unsafe { GetSystemDirectoryW(Some(&mut buffer)) } as usize;
    if len == 0 || len >= buffer.len() {
        error!("Failed to locate the system directory");
        return None;
    }
    let path = system_dinput_path(&PathBuf::from(String::from_utf16_lossy(&buffer[..len])));

    let module = match unsafe { LoadLibraryW(&HSTRING::from(path.as_os_str())) } {
        Ok(module) => module,
        Err(e) => {
            error!("Failed to load {}: {}", path.display(), e);
            return None;
        }
    };
    let Some(export) = (unsafe { GetProcAddress(module, s!("DirectInputCreateA")) }) else {
        error!("{} has no DirectInputCreateA export", path.display());
        return None;
    };

    info!("Forwarding DirectInputCreateA to {}", path.display());
    // SAFETY: the system export has exactly this signature.
    Some(unsafe { std::mem::transmute::<unsafe extern "system" fn() -> isize, CreateFn>(export) })
}

/// Patch the game on the first call, then hand every call to the system
/// DirectInput
///
/// # Safety
///
/// Called by the game with the arguments of the real `DirectInputCreateA`.
#[allow(non_snake_case)]
#[unsafe(no_mangle)]
pub unsafe extern "system" fn DirectInputCreateA(
    instance: HINSTANCE,
    version: u32,
    interface: *mut *mut c_void,
    outer: *mut c_void,
) -> HRESULT {
    PATCHED.call_once(|| {
        init_logging();
        patch_game();
    });

    match *SYSTEM_CREATE.get_or_init(load_system_create) {
        // SAFETY: the arguments reach the export they were meant for unchanged.
        Some(create) => unsafe { create(instance, version, interface, outer) },
        None => E_FAIL,
    }
}
