//! Synthetic PE32 images for tests

use super::layout::{coff, dos, optional};
use super::section::{SectionDescriptor, SectionFlags};

pub const PE_OFFSET: u32 = 0x80;
pub const TEXT_RVA: u32 = 0x1000;
pub const TEXT_FILE_OFFSET: u32 = 0x400;
const OPTIONAL_HEADER_SIZE: u16 = 0xE0;

/// A minimal i386 image with a single `.text` section.
///
/// PE header at 0x80, section table at 0x178, `.text` raw data at file
/// offset 0x400 mapped at RVA 0x1000 and filled with `int3`.
pub struct SyntheticImage {
    pub timestamp: u32,
    pub image_base: u32,
    /// Descriptors that still fit in the header space
    pub spare_descriptors: u32,
    pub text_size: u32,
}

impl Default for SyntheticImage {
    fn default() -> Self {
        Self {
            timestamp: 0x3C60_692C,
            image_base: 0x0040_0000,
            spare_descriptors: 1,
            text_size: 0x1000,
        }
    }
}

fn put_u16(image: &mut [u8], at: u32, value: u16) {
    let at = at as usize;
    image[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(image: &mut [u8], at: u32, value: u32) {
    let at = at as usize;
    image[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

impl SyntheticImage {
    pub fn build(&self) -> Vec<u8> {
        let coff_at = PE_OFFSET + coff::SIGNATURE_SIZE;
        let opt_at = coff_at + coff::SIZE;
        let table_at = opt_at + u32::from(OPTIONAL_HEADER_SIZE);
        let size_of_headers = table_at + (1 + self.spare_descriptors) * SectionDescriptor::SIZE as u32;
        assert!(size_of_headers <= TEXT_FILE_OFFSET);

        let mut image = vec![0u8; (TEXT_FILE_OFFSET + self.text_size) as usize];
        put_u16(&mut image, 0, dos::MAGIC);
        put_u32(&mut image, dos::E_LFANEW as u32, PE_OFFSET);
        put_u32(&mut image, PE_OFFSET, coff::SIGNATURE);

        put_u16(&mut image, coff_at + coff::MACHINE, coff::MACHINE_I386);
        put_u16(&mut image, coff_at + coff::NUMBER_OF_SECTIONS, 1);
        put_u32(&mut image, coff_at + coff::TIME_DATE_STAMP, self.timestamp);
        put_u16(&mut image, coff_at + coff::SIZE_OF_OPTIONAL_HEADER, OPTIONAL_HEADER_SIZE);

        put_u16(&mut image, opt_at + optional::MAGIC, optional::MAGIC_PE32);
        put_u32(&mut image, opt_at + optional::SIZE_OF_CODE, self.text_size);
        put_u32(&mut image, opt_at + optional::IMAGE_BASE, self.image_base);
        put_u32(&mut image, opt_at + optional::SECTION_ALIGNMENT, 0x1000);
        put_u32(&mut image, opt_at + optional::FILE_ALIGNMENT, 0x200);
        put_u32(&mut image, opt_at + optional::SIZE_OF_IMAGE, TEXT_RVA + self.text_size);
        put_u32(&mut image, opt_at + optional::SIZE_OF_HEADERS, size_of_headers);

        let text = SectionDescriptor {
            name: *b".text\0\0\0",
            virtual_size: self.text_size,
            virtual_address: TEXT_RVA,
            raw_size: self.text_size,
            raw_offset: TEXT_FILE_OFFSET,
            characteristics: SectionFlags::CODE | SectionFlags::EXECUTE | SectionFlags::READ,
        };
        let table_at = table_at as usize;
        image[table_at..table_at + SectionDescriptor::SIZE].copy_from_slice(&text.to_bytes());

        image[TEXT_FILE_OFFSET as usize..].fill(0xCC);
        image
    }
}
