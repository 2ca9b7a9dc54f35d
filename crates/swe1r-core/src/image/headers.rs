use chrono::{DateTime, Utc};

use super::layout::{coff, dos, optional, section};
use super::section::SectionDescriptor;
use crate::error::{Error, Result};
use crate::memory::{Address, AddressSpace};

/// Upper bound for `e_lfanew`; real linkers keep the PE header close to the stub
const MAX_PE_OFFSET: u32 = 0x1000;

fn le_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn le_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

/// The header fields the patcher reads or updates, plus the section table.
///
/// Parsing guarantees that the header space and every section fit below
/// 4 GiB when mapped at `image_base`, so the address helpers cannot wrap.
#[derive(Debug, Clone)]
pub struct ImageHeaders {
    pub image_base: u32,
    pub machine: u16,
    pub timestamp: u32,
    pub section_count: u16,
    pub size_of_optional_header: u16,
    pub size_of_code: u32,
    pub size_of_initialized_data: u32,
    pub section_alignment: u32,
    pub file_alignment: u32,
    pub size_of_image: u32,
    pub size_of_headers: u32,
    pub sections: Vec<SectionDescriptor>,
    coff_offset: u32,
    optional_offset: u32,
    section_table_offset: u32,
}

impl ImageHeaders {
    /// Parse headers through `read(offset, buf)`, where `offset` is relative
    /// to the start of the image. Headers sit at the same offset on disk and
    /// in memory, so this works for both.
    pub fn parse_with<F>(mut read: F) -> Result<Self>
    where
        F: FnMut(u32, &mut [u8]) -> Result<()>,
    {
        let mut stub = [0u8; dos::SIZE];
        read(0, &mut stub)?;
        if le_u16(&stub, 0) != dos::MAGIC {
            return Err(Error::MalformedImage("missing MZ signature".to_string()));
        }

        let pe_offset = le_u32(&stub, dos::E_LFANEW);
        if pe_offset > MAX_PE_OFFSET {
            return Err(Error::MalformedImage(format!(
                "PE header offset 0x{:X} out of range",
                pe_offset
            )));
        }

        let mut file_header = [0u8; (coff::SIGNATURE_SIZE + coff::SIZE) as usize];
        read(pe_offset, &mut file_header)?;
        if le_u32(&file_header, 0) != coff::SIGNATURE {
            return Err(Error::MalformedImage("missing PE signature".to_string()));
        }

        let coff_offset = pe_offset + coff::SIGNATURE_SIZE;
        let c = &file_header[coff::SIGNATURE_SIZE as usize..];
        let machine = le_u16(c, coff::MACHINE as usize);
        let section_count = le_u16(c, coff::NUMBER_OF_SECTIONS as usize);
        let timestamp = le_u32(c, coff::TIME_DATE_STAMP as usize);
        let size_of_optional_header = le_u16(c, coff::SIZE_OF_OPTIONAL_HEADER as usize);

        if machine != coff::MACHINE_I386 {
            return Err(Error::MalformedImage(format!(
                "machine 0x{:04X} is not i386",
                machine
            )));
        }
        if u32::from(size_of_optional_header) < optional::MIN_SIZE {
            return Err(Error::MalformedImage(format!(
                "optional header too small ({} bytes)",
                size_of_optional_header
            )));
        }

        let optional_offset = coff_offset + coff::SIZE;
        let mut opt = vec![0u8; optional::MIN_SIZE as usize];
        read(optional_offset, &mut opt)?;
        if le_u16(&opt, optional::MAGIC as usize) != optional::MAGIC_PE32 {
            return Err(Error::MalformedImage("not a PE32 image".to_string()));
        }

        let section_table_offset = optional_offset + u32::from(size_of_optional_header);
        let mut table = vec![0u8; usize::from(section_count) * SectionDescriptor::SIZE];
        read(section_table_offset, &mut table)?;
        let sections: Vec<SectionDescriptor> = table
            .chunks_exact(SectionDescriptor::SIZE)
            .map(|chunk| {
                let mut raw = [0u8; SectionDescriptor::SIZE];
                raw.copy_from_slice(chunk);
                SectionDescriptor::parse(&raw)
            })
            .collect();

        let image_base = le_u32(&opt, optional::IMAGE_BASE as usize);
        let size_of_headers = le_u32(&opt, optional::SIZE_OF_HEADERS as usize);
        let table_end = section_table_offset + u32::from(section_count) * section::SIZE;
        if image_base.checked_add(size_of_headers.max(table_end)).is_none() {
            return Err(Error::MalformedImage(format!(
                "headers at 0x{:08X} run past the end of the address space",
                image_base
            )));
        }
        for s in &sections {
            let extent = s.virtual_size.max(s.file_backed_len());
            if image_base
                .checked_add(s.virtual_address)
                .and_then(|start| start.checked_add(extent))
                .is_none()
            {
                return Err(Error::MalformedImage(format!(
                    "section {} at RVA 0x{:X} runs past the end of the address space",
                    s.name_str(),
                    s.virtual_address
                )));
            }
        }

        Ok(Self {
            image_base,
            machine,
            timestamp,
            section_count,
            size_of_optional_header,
            size_of_code: le_u32(&opt, optional::SIZE_OF_CODE as usize),
            size_of_initialized_data: le_u32(&opt, optional::SIZE_OF_INITIALIZED_DATA as usize),
            section_alignment: le_u32(&opt, optional::SECTION_ALIGNMENT as usize),
            file_alignment: le_u32(&opt, optional::FILE_ALIGNMENT as usize),
            size_of_image: le_u32(&opt, optional::SIZE_OF_IMAGE as usize),
            size_of_headers,
            sections,
            coff_offset,
            optional_offset,
            section_table_offset,
        })
    }

    /// Read the headers of an image mapped at `image_base`
    pub fn read<S: AddressSpace + ?Sized>(space: &S, image_base: Address) -> Result<Self> {
        let headers = Self::parse_with(|offset, buf| {
            space.read_bytes(image_base.wrapping_add(offset), buf)
        })?;
        if headers.image_base != image_base {
            return Err(Error::MalformedImage(format!(
                "image base 0x{:08X} does not match expected 0x{:08X}",
                headers.image_base, image_base
            )));
        }
        Ok(headers)
    }

    pub fn coff_header(&self) -> Address {
        self.image_base + self.coff_offset
    }

    pub fn optional_header(&self) -> Address {
        self.image_base + self.optional_offset
    }

    pub fn section_table(&self) -> Address {
        self.image_base + self.section_table_offset
    }

    /// Where the next section descriptor would go
    pub fn next_descriptor(&self) -> Address {
        self.section_table() + u32::from(self.section_count) * section::SIZE
    }

    /// End of the header space reserved by the linker
    pub fn headers_end(&self) -> Address {
        self.image_base + self.size_of_headers
    }

    /// Number of descriptors that still fit in the reserved header space
    pub fn spare_descriptors(&self) -> u32 {
        self.headers_end().saturating_sub(self.next_descriptor()) / section::SIZE
    }

    pub fn patch_section(&self) -> Option<&SectionDescriptor> {
        self.sections.iter().find(|s| s.is_sentinel())
    }

    pub fn is_patched(&self) -> bool {
        self.patch_section().is_some()
    }

    /// Link time of the build, from the COFF timestamp
    pub fn build_date(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::from(self.timestamp), 0)
    }
}
