use bitflags::bitflags;

use super::layout::section;

bitflags! {
    /// Section characteristics we read or set
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SectionFlags: u32 {
        const CODE = 0x0000_0020;
        const INITIALIZED_DATA = 0x0000_0040;
        const EXECUTE = 0x2000_0000;
        const READ = 0x4000_0000;
        const WRITE = 0x8000_0000;
    }
}

/// Name tag of the section this tool appends; its presence marks a patched image
pub const SENTINEL_NAME: [u8; 8] = *b"hack\0\0\0\0";

/// One entry of the section table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionDescriptor {
    pub name: [u8; 8],
    pub virtual_size: u32,
    /// Relative to the image base
    pub virtual_address: u32,
    pub raw_size: u32,
    pub raw_offset: u32,
    pub characteristics: SectionFlags,
}

impl SectionDescriptor {
    pub const SIZE: usize = section::SIZE as usize;

    /// Descriptor for the patch section appended by the extender
    pub fn patch_section(virtual_address: u32, raw_offset: u32, capacity: u32) -> Self {
        Self {
            name: SENTINEL_NAME,
            virtual_size: capacity,
            virtual_address,
            raw_size: capacity,
            raw_offset,
            characteristics: SectionFlags::CODE
                | SectionFlags::INITIALIZED_DATA
                | SectionFlags::EXECUTE
                | SectionFlags::READ
                | SectionFlags::WRITE,
        }
    }

    pub fn parse(raw: &[u8; Self::SIZE]) -> Self {
        let u32_at = |offset: usize| {
            u32::from_le_bytes([
                raw[offset],
                raw[offset + 1],
                raw[offset + 2],
                raw[offset + 3],
            ])
        };
        let mut name = [0u8; 8];
        name.copy_from_slice(&raw[section::NAME..section::NAME + 8]);

        Self {
            name,
            virtual_size: u32_at(section::VIRTUAL_SIZE),
            virtual_address: u32_at(section::VIRTUAL_ADDRESS),
            raw_size: u32_at(section::SIZE_OF_RAW_DATA),
            raw_offset: u32_at(section::POINTER_TO_RAW_DATA),
            characteristics: SectionFlags::from_bits_retain(u32_at(section::CHARACTERISTICS)),
        }
    }

    /// On-disk form; relocation and line number fields are always zero
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut raw = [0u8; Self::SIZE];
        let mut put = |offset: usize, value: u32| {
            raw[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        };
        put(section::VIRTUAL_SIZE, self.virtual_size);
        put(section::VIRTUAL_ADDRESS, self.virtual_address);
        put(section::SIZE_OF_RAW_DATA, self.raw_size);
        put(section::POINTER_TO_RAW_DATA, self.raw_offset);
        put(section::CHARACTERISTICS, self.characteristics.bits());
        raw[section::NAME..section::NAME + 8].copy_from_slice(&self.name);
        raw
    }

    pub fn name_str(&self) -> String {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(8);
        String::from_utf8_lossy(&self.name[..len]).into_owned()
    }

    pub fn is_sentinel(&self) -> bool {
        self.name == SENTINEL_NAME
    }

    /// Bytes of this section that are backed by file data
    pub fn file_backed_len(&self) -> u32 {
        if self.virtual_size == 0 {
            self.raw_size
        } else {
            self.raw_size.min(self.virtual_size)
        }
    }
}
