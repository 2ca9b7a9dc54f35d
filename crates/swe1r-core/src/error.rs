use std::path::PathBuf;

use strum::Display;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported version of the game, timestamp 0x{timestamp:08X}")]
    UnsupportedBuild { timestamp: u32 },

    #[error("Malformed image: {0}")]
    MalformedImage(String),

    #[error(
        "This file had already been patched! This tool is unable to upgrade an existing patch, please find an unmodified file"
    )]
    AlreadyPatched,

    #[error("Address 0x{address:08X} (+{len} bytes) is not backed by any image region")]
    AddressUnmapped { address: u32, len: usize },

    #[error("Failed to read memory at address 0x{address:08X}: {message}")]
    MemoryReadFailed { address: u32, message: String },

    #[error("Failed to write memory at address 0x{address:08X}: {message}")]
    MemoryWriteFailed { address: u32, message: String },

    #[error("Failed to start process: {0}")]
    ProcessSpawnFailed(String),

    #[error("Failed to allocate {size} bytes for the patch region")]
    AllocationFailed { size: u32 },

    #[error("Asset not found: {}", path.display())]
    AssetMissing { path: PathBuf },

    #[error("Asset {} is truncated: expected {expected} bytes, found {actual}", path.display())]
    AssetTruncated {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("New section header needs {required} bytes of header space, only {available} reserved")]
    HeaderCapacityExceeded { required: u32, available: u32 },

    #[error("Patch site 0x{begin:08X}..0x{end:08X} is narrower than a 5 byte branch")]
    SiteTooNarrow { begin: u32, end: u32 },

    #[error("Patch region exhausted: cursor 0x{cursor:08X} is past region end 0x{end:08X}")]
    RegionExhausted { cursor: u32, end: u32 },

    #[error("Cursor moved backwards from 0x{from:08X} to 0x{to:08X}")]
    CursorRegressed { from: u32, to: u32 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure classes reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorCategory {
    UnsupportedImage,
    AlreadyPatched,
    IoFailure,
    StructuralViolation,
}

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            Error::AssetMissing { .. } => true,
            _ => false,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::UnsupportedBuild { .. } | Error::MalformedImage(_) => {
                ErrorCategory::UnsupportedImage
            }
            Error::AlreadyPatched => ErrorCategory::AlreadyPatched,
            Error::HeaderCapacityExceeded { .. }
            | Error::SiteTooNarrow { .. }
            | Error::RegionExhausted { .. }
            | Error::CursorRegressed { .. }
            | Error::AddressUnmapped { .. }
            | Error::InvalidInput(_) => ErrorCategory::StructuralViolation,
            Error::MemoryReadFailed { .. }
            | Error::MemoryWriteFailed { .. }
            | Error::ProcessSpawnFailed(_)
            | Error::AllocationFailed { .. }
            | Error::AssetMissing { .. }
            | Error::AssetTruncated { .. }
            | Error::Config(_)
            | Error::Io(_)
            | Error::Json(_) => ErrorCategory::IoFailure,
        }
    }
}
