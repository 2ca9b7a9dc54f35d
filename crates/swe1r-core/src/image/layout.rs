//! PE32 header layout constants
//!
//! Offsets are relative to the start of the structure they belong to.

/// Image base the game is linked at
pub const DEFAULT_IMAGE_BASE: u32 = 0x0040_0000;

/// Granularity used for the appended section, both on disk and in memory
pub const PAGE_SIZE: u32 = 0x1000;

/// MS-DOS stub header
pub mod dos {
    pub const SIZE: usize = 0x40;
    pub const MAGIC: u16 = 0x5A4D; // "MZ"
    pub const E_LFANEW: usize = 0x3C;
}

/// COFF file header, located after the "PE\0\0" signature
pub mod coff {
    pub const SIGNATURE: u32 = 0x0000_4550; // "PE\0\0"
    pub const SIGNATURE_SIZE: u32 = 4;
    pub const SIZE: u32 = 20;

    pub const MACHINE: u32 = 0;
    pub const NUMBER_OF_SECTIONS: u32 = 2;
    pub const TIME_DATE_STAMP: u32 = 4;
    pub const SIZE_OF_OPTIONAL_HEADER: u32 = 16;

    pub const MACHINE_I386: u16 = 0x014C;
}

/// PE32 optional header
pub mod optional {
    pub const MAGIC_PE32: u16 = 0x010B;
    /// Smallest optional header that still holds every field we touch
    pub const MIN_SIZE: u32 = 64;

    pub const MAGIC: u32 = 0;
    pub const SIZE_OF_CODE: u32 = 4;
    pub const SIZE_OF_INITIALIZED_DATA: u32 = 8;
    pub const IMAGE_BASE: u32 = 28;
    pub const SECTION_ALIGNMENT: u32 = 32;
    pub const FILE_ALIGNMENT: u32 = 36;
    pub const SIZE_OF_IMAGE: u32 = 56;
    pub const SIZE_OF_HEADERS: u32 = 60;
}

/// Section table entry
pub mod section {
    pub const SIZE: u32 = 40;

    pub const NAME: usize = 0;
    pub const VIRTUAL_SIZE: usize = 8;
    pub const VIRTUAL_ADDRESS: usize = 12;
    pub const SIZE_OF_RAW_DATA: usize = 16;
    pub const POINTER_TO_RAW_DATA: usize = 20;
    pub const CHARACTERISTICS: usize = 36;
}

/// Round `value` up to the next multiple of [`PAGE_SIZE`], or `None` past
/// the last page boundary below 4 GiB
pub fn page_align(value: u32) -> Option<u32> {
    value
        .checked_add(PAGE_SIZE - 1)
        .map(|v| v & !(PAGE_SIZE - 1))
}

/// 64-bit variant for file lengths
pub fn page_align_u64(value: u64) -> u64 {
    let page = PAGE_SIZE as u64;
    (value + (page - 1)) & !(page - 1)
}
