//! Concrete patch targets

mod file;
#[cfg(target_os = "windows")]
mod local;
#[cfg(target_os = "windows")]
mod remote;

pub use file::FileTarget;
#[cfg(target_os = "windows")]
pub use local::InProcess;
#[cfg(target_os = "windows")]
pub use remote::RemoteProcess;
