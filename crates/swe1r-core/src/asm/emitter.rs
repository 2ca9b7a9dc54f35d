use super::encode::{self, Cond, Reg};
use crate::error::Result;
use crate::memory::{Address, AddressSpace};

/// Append-only instruction writer.
///
/// Bytes go straight into the target through [`AddressSpace`]; there is no
/// intermediate buffer and no backpatching. Every primitive returns the
/// advanced cursor so callers can record labels as they go.
pub struct Emitter<'a> {
    space: &'a mut dyn AddressSpace,
    position: Address,
}

impl<'a> Emitter<'a> {
    pub fn new(space: &'a mut dyn AddressSpace, position: Address) -> Self {
        Self { space, position }
    }

    /// Next free address
    pub fn position(&self) -> Address {
        self.position
    }

    /// Raw bytes, for data payloads and the odd hand-encoded instruction
    pub fn bytes(&mut self, data: &[u8]) -> Result<Address> {
        self.space.write_bytes(self.position, data)?;
        self.position = self.position.wrapping_add(data.len() as u32);
        Ok(self.position)
    }

    /// NUL-terminated string
    pub fn c_string(&mut self, text: &str) -> Result<Address> {
        self.bytes(text.as_bytes())?;
        self.bytes(&[0])
    }

    pub fn add_esp(&mut self, n: i32) -> Result<Address> {
        self.bytes(&encode::add_esp(n))
    }

    pub fn add_esp_imm8(&mut self, n: i8) -> Result<Address> {
        self.bytes(&encode::add_esp_imm8(n))
    }

    pub fn test(&mut self, reg: Reg) -> Result<Address> {
        self.bytes(&encode::test(reg))
    }

    pub fn nop(&mut self) -> Result<Address> {
        self.bytes(&encode::nop())
    }

    pub fn nops(&mut self, count: usize) -> Result<Address> {
        self.bytes(&vec![super::NOP; count])
    }

    pub fn push(&mut self, reg: Reg) -> Result<Address> {
        self.bytes(&encode::push(reg))
    }

    pub fn pop(&mut self, reg: Reg) -> Result<Address> {
        self.bytes(&encode::pop(reg))
    }

    pub fn push_imm32(&mut self, value: u32) -> Result<Address> {
        self.bytes(&encode::push_imm32(value))
    }

    pub fn call(&mut self, destination: Address) -> Result<Address> {
        self.bytes(&encode::call(self.position, destination))
    }

    pub fn jmp(&mut self, destination: Address) -> Result<Address> {
        self.bytes(&encode::jmp(self.position, destination))
    }

    pub fn jcc(&mut self, cond: Cond, destination: Address) -> Result<Address> {
        self.bytes(&encode::jcc(cond, self.position, destination))
    }

    pub fn jnz(&mut self, destination: Address) -> Result<Address> {
        self.jcc(Cond::NotEqual, destination)
    }

    pub fn jz(&mut self, destination: Address) -> Result<Address> {
        self.jcc(Cond::Equal, destination)
    }

    pub fn ret(&mut self) -> Result<Address> {
        self.bytes(&encode::ret())
    }

    pub fn mov_load_disp8(&mut self, dst: Reg, base: Reg, disp: i8) -> Result<Address> {
        self.bytes(&encode::mov_load_disp8(dst, base, disp))
    }

    pub fn mov_load_abs(&mut self, dst: Reg, address: Address) -> Result<Address> {
        self.bytes(&encode::mov_load_abs(dst, address))
    }

    pub fn mov_reg(&mut self, dst: Reg, src: Reg) -> Result<Address> {
        self.bytes(&encode::mov_reg(dst, src))
    }

    pub fn movzx_word_disp8(&mut self, dst: Reg, base: Reg, disp: i8) -> Result<Address> {
        self.bytes(&encode::movzx_word_disp8(dst, base, disp))
    }

    pub fn shr_word_disp8(&mut self, base: Reg, disp: i8, shift: u8) -> Result<Address> {
        self.bytes(&encode::shr_word_disp8(base, disp, shift))
    }
}
