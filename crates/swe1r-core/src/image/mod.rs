//! PE32 image model: header parsing, section descriptors and the extender

mod extender;
mod headers;
pub mod layout;
mod mapping;
mod section;

#[cfg(test)]
pub mod fixture;

pub use extender::{DEFAULT_CAPACITY, ExtendableImage, ImageExtender, PatchRegion};
pub use headers::ImageHeaders;
pub use mapping::{RegionMapping, section_layout};
pub use section::{SENTINEL_NAME, SectionDescriptor, SectionFlags};
