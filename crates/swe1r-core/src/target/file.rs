use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::image::{ExtendableImage, ImageHeaders, RegionMapping, section_layout};
use crate::memory::{Address, AddressSpace, TargetMode};

fn read_at(mut file: &File, offset: u64, buf: &mut [u8]) -> Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    file.read_exact(buf)?;
    Ok(())
}

/// An executable on disk, addressed by the virtual addresses it would load at
pub struct FileTarget {
    path: PathBuf,
    file: File,
    image_base: Address,
    layout: Vec<RegionMapping>,
}

impl FileTarget {
    /// Open `path` for patching and build its address translation table
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let headers = ImageHeaders::parse_with(|offset, buf| {
            read_at(&file, u64::from(offset), buf).map_err(|e| match e {
                Error::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
                    Error::MalformedImage(format!("truncated headers at offset 0x{:X}", offset))
                }
                other => other,
            })
        })?;
        let layout = section_layout(&headers)?;

        debug!(
            "Opened {} (image base 0x{:08X}, {} regions)",
            path.display(),
            headers.image_base,
            layout.len()
        );

        Ok(Self {
            path,
            file,
            image_base: headers.image_base,
            layout,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the headers as they are now
    pub fn headers(&self) -> Result<ImageHeaders> {
        ImageHeaders::read(self, self.image_base)
    }

    pub fn layout(&self) -> &[RegionMapping] {
        &self.layout
    }

    /// File offset backing `[address, address + len)`
    pub fn translate(&self, address: Address, len: usize) -> Result<u64> {
        self.layout
            .iter()
            .find(|m| m.contains(address, len))
            .map(|m| m.translate(address))
            .ok_or(Error::AddressUnmapped { address, len })
    }

    /// Push all writes to disk
    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}

impl AddressSpace for FileTarget {
    fn mode(&self) -> TargetMode {
        TargetMode::FileBacked
    }

    fn read_bytes(&self, address: Address, buf: &mut [u8]) -> Result<()> {
        let offset = self.translate(address, buf.len())?;
        read_at(&self.file, offset, buf).map_err(|e| Error::MemoryReadFailed {
            address,
            message: e.to_string(),
        })
    }

    fn write_bytes(&mut self, address: Address, data: &[u8]) -> Result<()> {
        let offset = self.translate(address, data.len())?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file
            .write_all(data)
            .map_err(|e| Error::MemoryWriteFailed {
                address,
                message: e.to_string(),
            })
    }
}

impl ExtendableImage for FileTarget {
    fn image_base(&self) -> Address {
        self.image_base
    }

    fn raw_len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn append_zeroed(&mut self, offset: u64, len: u64) -> Result<()> {
        let end = offset + len;
        if end > self.raw_len()? {
            self.file.set_len(end)?;
        }
        Ok(())
    }

    fn map_region(&mut self, mapping: RegionMapping) {
        debug!(
            "Mapped 0x{:08X}..0x{:08X} to file offset 0x{:X}",
            mapping.virtual_start,
            mapping.virtual_start + mapping.len,
            mapping.file_offset
        );
        self.layout.push(mapping);
    }
}
