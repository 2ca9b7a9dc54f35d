//! Appending the patch section to an executable image.
//!
//! Everything is validated before the first write. Raw storage is appended
//! before any header field changes, so an interrupted run leaves at most
//! some unreferenced bytes at the end of the file.

use serde::Serialize;
use tracing::{debug, info};

use super::headers::ImageHeaders;
use super::layout::{PAGE_SIZE, coff, optional, page_align, page_align_u64};
use super::mapping::RegionMapping;
use super::section::SectionDescriptor;
use crate::error::{Error, Result};
use crate::memory::{Address, AddressSpace, ScalarIo};

/// Size of the patch region when nothing else is configured
pub const DEFAULT_CAPACITY: u32 = 4 * 1024 * 1024;

/// Address range reserved for injected code and data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PatchRegion {
    pub start: Address,
    pub capacity: u32,
}

impl PatchRegion {
    pub fn end(&self) -> Address {
        self.start.wrapping_add(self.capacity)
    }
}

/// An image whose backing storage can grow
pub trait ExtendableImage: AddressSpace {
    fn image_base(&self) -> Address;

    /// Current length of the raw storage
    fn raw_len(&self) -> Result<u64>;

    /// Grow the raw storage with zeros so it covers `[offset, offset + len)`
    fn append_zeroed(&mut self, offset: u64, len: u64) -> Result<()>;

    /// Make a new range of virtual addresses reachable
    fn map_region(&mut self, mapping: RegionMapping);
}

/// Where the new section goes, computed before anything is written
#[derive(Debug, Clone, Copy)]
struct ExtensionPlan {
    file_offset: u64,
    virtual_address: u32,
    descriptor_at: Address,
}

#[derive(Debug, Clone, Copy)]
pub struct ImageExtender {
    capacity: u32,
}

impl Default for ImageExtender {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl ImageExtender {
    /// `capacity` is rounded up to a whole page. Zero and sizes that do not
    /// round up within 32 bits are rejected.
    pub fn new(capacity: u32) -> Result<Self> {
        match page_align(capacity) {
            Some(aligned) if aligned > 0 => Ok(Self { capacity: aligned }),
            _ => Err(Error::Config(format!(
                "capacity 0x{:X} must be between 1 and 0x{:X} bytes",
                capacity,
                u32::MAX & !(PAGE_SIZE - 1)
            ))),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    fn plan(&self, headers: &ImageHeaders, raw_len: u64) -> Result<ExtensionPlan> {
        if headers.is_patched() {
            return Err(Error::AlreadyPatched);
        }

        let descriptor_at = headers.next_descriptor();
        let descriptor_end = u64::from(descriptor_at) + SectionDescriptor::SIZE as u64;
        if descriptor_end > u64::from(headers.headers_end()) {
            return Err(Error::HeaderCapacityExceeded {
                required: (descriptor_end - u64::from(headers.image_base)) as u32,
                available: headers.size_of_headers,
            });
        }

        let file_offset = page_align_u64(raw_len);
        if file_offset + u64::from(self.capacity) > u64::from(u32::MAX) {
            return Err(Error::MalformedImage(format!(
                "file too large to extend ({} bytes)",
                raw_len
            )));
        }

        let virtual_address = page_align(headers.size_of_image)
            .filter(|&va| {
                u64::from(headers.image_base) + u64::from(va) + u64::from(self.capacity)
                    <= u64::from(u32::MAX)
            })
            .ok_or_else(|| {
                Error::MalformedImage(format!(
                    "SizeOfImage 0x{:X} leaves no room for the patch section",
                    headers.size_of_image
                ))
            })?;

        Ok(ExtensionPlan {
            file_offset,
            virtual_address,
            descriptor_at,
        })
    }

    /// Append the patch section and return its address range
    pub fn extend<I: ExtendableImage + ?Sized>(&self, image: &mut I) -> Result<PatchRegion> {
        let image_base = image.image_base();
        let headers = ImageHeaders::read(&*image, image_base)?;
        let plan = self.plan(&headers, image.raw_len()?)?;

        debug!(
            "Extension plan: file offset 0x{:X}, RVA 0x{:X}, descriptor at 0x{:08X}",
            plan.file_offset, plan.virtual_address, plan.descriptor_at
        );

        image.append_zeroed(plan.file_offset, u64::from(self.capacity))?;

        let descriptor = SectionDescriptor::patch_section(
            plan.virtual_address,
            plan.file_offset as u32,
            self.capacity,
        );
        image.write_bytes(plan.descriptor_at, &descriptor.to_bytes())?;

        let coff_header = headers.coff_header();
        let optional_header = headers.optional_header();
        image.add_u16(coff_header + coff::NUMBER_OF_SECTIONS, 1)?;
        image.write_u32(
            optional_header + optional::SIZE_OF_IMAGE,
            plan.virtual_address + self.capacity,
        )?;
        image.add_u32(optional_header + optional::SIZE_OF_CODE, self.capacity)?;
        image.add_u32(optional_header + optional::SIZE_OF_INITIALIZED_DATA, self.capacity)?;

        let region = PatchRegion {
            start: image_base + plan.virtual_address,
            capacity: self.capacity,
        };
        image.map_region(RegionMapping {
            virtual_start: region.start,
            len: self.capacity,
            file_offset: plan.file_offset,
        });

        info!(
            "Added section {} at 0x{:08X}..0x{:08X}",
            descriptor.name_str(),
            region.start,
            region.end()
        );
        Ok(region)
    }
}
