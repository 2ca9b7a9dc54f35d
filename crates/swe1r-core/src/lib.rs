//! # swe1r-core
//!
//! Core library of the Star Wars Episode I Racer patcher.
//!
//! This crate provides:
//! - A byte-level address space over three targets (executable on disk,
//!   suspended child process, current process)
//! - A small x86-32 encoder and code cave installer
//! - PE32 header parsing and the section append used to make room for patches
//! - The game patches, their build offsets and configuration
//! - Patch sessions and JSON reports
//!
//! ## Platform
//!
//! Process targets use the Win32 debug API and are only compiled on Windows.
//! File patching works everywhere.

pub mod asm;
pub mod cave;
pub mod config;
pub mod error;
pub mod image;
pub mod memory;
pub mod offset;
pub mod patch;
pub mod report;
pub mod session;
pub mod target;

pub use asm::{Branch, Cond, Emitter, Reg, decode_branch, rel32};
pub use cave::{Cave, CaveBuilder, Redirect, Site, redirect};
pub use config::{
    AudioConfig, CollisionConfig, FontConfig, PatchConfig, PatchConfigBuilder, SpriteConfig,
    TriggerConfig, UPGRADE_CATEGORIES, UpgradeConfig,
};
pub use error::{Error, ErrorCategory, Result};
pub use image::{
    DEFAULT_CAPACITY, ExtendableImage, ImageExtender, ImageHeaders, PatchRegion,
    SectionDescriptor, SectionFlags,
};
pub use memory::{Address, AddressSpace, ScalarIo, TargetMode};
pub use offset::{BuildOffsets, builtin_builds, find_build, load_builds, save_builds, us_release};
pub use patch::{
    AssetSource, DirectoryAssets, Fingerprint, Patch, PatchContext, PatchSet, format_guid,
};
pub use report::{PatchEntry, PatchReport};
pub use session::{identify, patch_file, patch_file_with_assets};
#[cfg(target_os = "windows")]
pub use session::{patch_in_process, patch_process};
pub use target::FileTarget;
#[cfg(target_os = "windows")]
pub use target::{InProcess, RemoteProcess};
