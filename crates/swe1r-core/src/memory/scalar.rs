use super::{Address, AddressSpace};
use crate::error::Result;

/// Fixed-width little-endian helpers on top of [`AddressSpace`].
///
/// The `add_*` helpers are plain read-modify-write sequences; they assume a
/// single writer, which holds for a patch session.
pub trait ScalarIo: AddressSpace {
    fn read_u8(&self, address: Address) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_bytes(address, &mut buf)?;
        Ok(buf[0])
    }

    fn read_u16(&self, address: Address) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_bytes(address, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32(&self, address: Address) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_bytes(address, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn write_u8(&mut self, address: Address, value: u8) -> Result<()> {
        self.write_bytes(address, &[value])
    }

    fn write_u16(&mut self, address: Address, value: u16) -> Result<()> {
        self.write_bytes(address, &value.to_le_bytes())
    }

    fn write_u32(&mut self, address: Address, value: u32) -> Result<()> {
        self.write_bytes(address, &value.to_le_bytes())
    }

    fn add_u16(&mut self, address: Address, delta: u16) -> Result<u16> {
        let value = self.read_u16(address)?.wrapping_add(delta);
        self.write_u16(address, value)?;
        Ok(value)
    }

    fn add_u32(&mut self, address: Address, delta: u32) -> Result<u32> {
        let value = self.read_u32(address)?.wrapping_add(delta);
        self.write_u32(address, value)?;
        Ok(value)
    }
}

impl<T: AddressSpace + ?Sized> ScalarIo for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockSpace;

    #[test]
    fn test_scalar_little_endian() {
        let mut space = MockSpace::new(0x1000, 16);
        space.write_u32(0x1000, 0x11223344).unwrap();
        assert_eq!(space.bytes()[..4], [0x44, 0x33, 0x22, 0x11]);
        assert_eq!(space.read_u16(0x1000).unwrap(), 0x3344);
        assert_eq!(space.read_u8(0x1003).unwrap(), 0x11);
    }

    #[test]
    fn test_add_wraps() {
        let mut space = MockSpace::new(0x1000, 16);
        space.write_u16(0x1002, 0xFFFF).unwrap();
        assert_eq!(space.add_u16(0x1002, 2).unwrap(), 1);
        space.write_u32(0x1004, 0x0040_0000).unwrap();
        assert_eq!(space.add_u32(0x1004, 0x0040_0000).unwrap(), 0x0080_0000);
        assert_eq!(space.read_u32(0x1004).unwrap(), 0x0080_0000);
    }

    #[test]
    fn test_scalar_through_trait_object() {
        let mut space = MockSpace::new(0x2000, 8);
        let dynamic: &mut dyn AddressSpace = &mut space;
        dynamic.write_u16(0x2000, 0xBEEF).unwrap();
        assert_eq!(dynamic.read_u16(0x2000).unwrap(), 0xBEEF);
    }
}
