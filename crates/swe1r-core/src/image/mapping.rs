use super::headers::ImageHeaders;
use crate::error::{Error, Result};
use crate::memory::Address;

/// A run of virtual addresses backed by contiguous file bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionMapping {
    pub virtual_start: Address,
    pub len: u32,
    pub file_offset: u64,
}

impl RegionMapping {
    pub fn contains(&self, address: Address, len: usize) -> bool {
        let start = u64::from(self.virtual_start);
        let end = start + u64::from(self.len);
        let address = u64::from(address);
        address >= start && address + len as u64 <= end
    }

    /// File offset of `address`; caller checks [`RegionMapping::contains`] first
    pub fn translate(&self, address: Address) -> u64 {
        self.file_offset + u64::from(address - self.virtual_start)
    }
}

/// Translation table mirroring the section layout of `headers`
pub fn section_layout(headers: &ImageHeaders) -> Result<Vec<RegionMapping>> {
    let mut layout = vec![RegionMapping {
        virtual_start: headers.image_base,
        len: headers.size_of_headers,
        file_offset: 0,
    }];
    for s in headers.sections.iter().filter(|s| s.raw_size > 0) {
        let virtual_start = headers
            .image_base
            .checked_add(s.virtual_address)
            .ok_or_else(|| {
                Error::MalformedImage(format!(
                    "section {} at RVA 0x{:X} is outside the address space",
                    s.name_str(),
                    s.virtual_address
                ))
            })?;
        layout.push(RegionMapping {
            virtual_start,
            len: s.file_backed_len(),
            file_offset: u64::from(s.raw_offset),
        });
    }
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::fixture::SyntheticImage;

    #[test]
    fn test_contains_and_translate() {
        let text = RegionMapping {
            virtual_start: 0x0040_1000,
            len: 0x000A_A750,
            file_offset: 0x400,
        };
        assert!(text.contains(0x0040_1000, 4));
        assert!(text.contains(0x0042_D745, 14));
        assert!(!text.contains(0x0040_0FFF, 1));
        assert!(!text.contains(0x004A_B74E, 4));
        assert_eq!(text.translate(0x0042_D745), 0x2CB45);
    }

    #[test]
    fn test_layout_of_synthetic_image() {
        let image = SyntheticImage::default().build();
        let headers = ImageHeaders::parse_with(|offset, buf| {
            let at = offset as usize;
            buf.copy_from_slice(&image[at..at + buf.len()]);
            Ok(())
        })
        .unwrap();

        let mut wrapped = headers.clone();
        wrapped.sections[0].virtual_address = 0xFFFF_0000;
        assert!(matches!(
            section_layout(&wrapped),
            Err(Error::MalformedImage(_))
        ));

        let layout = section_layout(&headers).unwrap();
        assert_eq!(layout.len(), 2);
        assert_eq!(layout[1].virtual_start, 0x0040_1000);
        assert_eq!(layout[1].file_offset, 0x400);
    }
}
