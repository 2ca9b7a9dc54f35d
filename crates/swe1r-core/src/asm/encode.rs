//! Pure instruction encoders.
//!
//! Each function returns the exact bytes of one instruction. Functions that
//! take `at` need the address the instruction will be written to, because
//! their operand is relative.

use strum::{Display, FromRepr};

use crate::memory::Address;

/// General purpose 32-bit registers in encoding order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum Reg {
    Eax = 0,
    Ecx = 1,
    Edx = 2,
    Ebx = 3,
    Esp = 4,
    Ebp = 5,
    Esi = 6,
    Edi = 7,
}

impl Reg {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Condition for near conditional jumps (second opcode byte after `0F`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Cond {
    #[strum(serialize = "jz")]
    Equal,
    #[strum(serialize = "jnz")]
    NotEqual,
}

impl Cond {
    pub fn opcode(self) -> u8 {
        match self {
            Cond::Equal => 0x84,
            Cond::NotEqual => 0x85,
        }
    }

    pub fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode {
            0x84 => Some(Cond::Equal),
            0x85 => Some(Cond::NotEqual),
            _ => None,
        }
    }
}

/// Displacement for a branch whose rel32 field ends at `next`
pub fn rel32(next: Address, destination: Address) -> u32 {
    destination.wrapping_sub(next)
}

fn modrm(mode: u8, reg: u8, rm: u8) -> u8 {
    (mode << 6) | ((reg & 7) << 3) | (rm & 7)
}

/// `add esp, imm32`
pub fn add_esp(n: i32) -> [u8; 6] {
    let imm = n.to_le_bytes();
    [0x81, 0xC4, imm[0], imm[1], imm[2], imm[3]]
}

/// `add esp, imm8`
pub fn add_esp_imm8(n: i8) -> [u8; 3] {
    [0x83, 0xC4, n as u8]
}

/// `test reg, reg`
pub fn test(reg: Reg) -> [u8; 2] {
    [0x85, modrm(0b11, reg.code(), reg.code())]
}

pub fn nop() -> [u8; 1] {
    [0x90]
}

pub fn push(reg: Reg) -> [u8; 1] {
    [0x50 + reg.code()]
}

pub fn pop(reg: Reg) -> [u8; 1] {
    [0x58 + reg.code()]
}

/// `push imm32`
pub fn push_imm32(value: u32) -> [u8; 5] {
    let imm = value.to_le_bytes();
    [0x68, imm[0], imm[1], imm[2], imm[3]]
}

fn near_branch(opcode: u8, at: Address, destination: Address) -> [u8; 5] {
    let disp = rel32(at.wrapping_add(5), destination).to_le_bytes();
    [opcode, disp[0], disp[1], disp[2], disp[3]]
}

/// `call rel32`
pub fn call(at: Address, destination: Address) -> [u8; 5] {
    near_branch(0xE8, at, destination)
}

/// `jmp rel32`
pub fn jmp(at: Address, destination: Address) -> [u8; 5] {
    near_branch(0xE9, at, destination)
}

/// `jcc rel32`
pub fn jcc(cond: Cond, at: Address, destination: Address) -> [u8; 6] {
    let disp = rel32(at.wrapping_add(6), destination).to_le_bytes();
    [0x0F, cond.opcode(), disp[0], disp[1], disp[2], disp[3]]
}

pub fn ret() -> [u8; 1] {
    [0xC3]
}

/// `mov dst, [base + disp8]`
pub fn mov_load_disp8(dst: Reg, base: Reg, disp: i8) -> Vec<u8> {
    let mut out = vec![0x8B, modrm(0b01, dst.code(), base.code())];
    if base == Reg::Esp {
        // esp as a base always needs a SIB byte
        out.push(0x24);
    }
    out.push(disp as u8);
    out
}

/// `mov dst, [absolute]`
pub fn mov_load_abs(dst: Reg, address: Address) -> [u8; 6] {
    let imm = address.to_le_bytes();
    [
        0x8B,
        modrm(0b00, dst.code(), 0b101),
        imm[0],
        imm[1],
        imm[2],
        imm[3],
    ]
}

/// `mov dst, src`
pub fn mov_reg(dst: Reg, src: Reg) -> [u8; 2] {
    [0x89, modrm(0b11, src.code(), dst.code())]
}

/// `movzx dst, word [base + disp8]`
pub fn movzx_word_disp8(dst: Reg, base: Reg, disp: i8) -> Vec<u8> {
    let mut out = vec![0x0F, 0xB7, modrm(0b01, dst.code(), base.code())];
    if base == Reg::Esp {
        out.push(0x24);
    }
    out.push(disp as u8);
    out
}

/// `shr word [base + disp8], imm8`
pub fn shr_word_disp8(base: Reg, disp: i8, shift: u8) -> Vec<u8> {
    let mut out = vec![0x66, 0xC1, modrm(0b01, 5, base.code())];
    if base == Reg::Esp {
        out.push(0x24);
    }
    out.push(disp as u8);
    out.push(shift);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_encodings() {
        assert_eq!(add_esp(-0x400), [0x81, 0xC4, 0x00, 0xFC, 0xFF, 0xFF]);
        assert_eq!(add_esp_imm8(0x10), [0x83, 0xC4, 0x10]);
        assert_eq!(test(Reg::Eax), [0x85, 0xC0]);
        assert_eq!(test(Reg::Edx), [0x85, 0xD2]);
        assert_eq!(push(Reg::Eax), [0x50]);
        assert_eq!(push(Reg::Edx), [0x52]);
        assert_eq!(push(Reg::Esi), [0x56]);
        assert_eq!(push(Reg::Edi), [0x57]);
        assert_eq!(pop(Reg::Eax), [0x58]);
        assert_eq!(pop(Reg::Edx), [0x5A]);
        assert_eq!(push_imm32(0x00ED1234), [0x68, 0x34, 0x12, 0xED, 0x00]);
        assert_eq!(ret(), [0xC3]);
        assert_eq!(nop(), [0x90]);
    }

    #[test]
    fn test_memory_operands() {
        assert_eq!(mov_load_disp8(Reg::Eax, Reg::Esp, 4), [0x8B, 0x44, 0x24, 0x04]);
        assert_eq!(mov_load_disp8(Reg::Edx, Reg::Eax, 16), [0x8B, 0x50, 0x10]);
        assert_eq!(mov_load_disp8(Reg::Eax, Reg::Eax, 0x4C), [0x8B, 0x40, 0x4C]);
        assert_eq!(
            mov_load_abs(Reg::Edx, 0x004D5E00),
            [0x8B, 0x15, 0x00, 0x5E, 0x4D, 0x00]
        );
        assert_eq!(mov_reg(Reg::Edx, Reg::Esp), [0x89, 0xE2]);
        assert_eq!(
            movzx_word_disp8(Reg::Eax, Reg::Eax, 0x24),
            [0x0F, 0xB7, 0x40, 0x24]
        );
        assert_eq!(shr_word_disp8(Reg::Eax, 0, 1), [0x66, 0xC1, 0x68, 0x00, 0x01]);
        assert_eq!(shr_word_disp8(Reg::Edx, 2, 2), [0x66, 0xC1, 0x6A, 0x02, 0x02]);
    }

    #[test]
    fn test_branch_displacement_forward_and_backward() {
        // forward: 0x401000 -> 0x401010, operand ends at 0x401005
        assert_eq!(jmp(0x401000, 0x401010), [0xE9, 0x0B, 0x00, 0x00, 0x00]);
        // backward: call to itself is -5
        assert_eq!(call(0x401000, 0x401000), [0xE8, 0xFB, 0xFF, 0xFF, 0xFF]);
        // jcc is one byte longer
        assert_eq!(
            jcc(Cond::NotEqual, 0x401000, 0x401000),
            [0x0F, 0x85, 0xFA, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(
            jcc(Cond::Equal, 0x401000, 0x401106),
            [0x0F, 0x84, 0x00, 0x01, 0x00, 0x00]
        );
    }

    #[test]
    fn test_reg_display() {
        assert_eq!(Reg::Edx.to_string(), "edx");
        assert_eq!(Reg::from_repr(6), Some(Reg::Esi));
        assert_eq!(Cond::NotEqual.to_string(), "jnz");
    }
}
