//! Just enough decoding to check what was written.

use super::encode::Cond;
use crate::memory::Address;

/// A decoded near branch with its absolute destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Call(Address),
    Jmp(Address),
    Jcc(Cond, Address),
}

impl Branch {
    pub fn destination(&self) -> Address {
        match *self {
            Branch::Call(d) | Branch::Jmp(d) | Branch::Jcc(_, d) => d,
        }
    }
}

fn disp_at(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw: [u8; 4] = bytes.get(offset..offset + 4)?.try_into().ok()?;
    Some(u32::from_le_bytes(raw))
}

/// Decode a rel32 `call`, `jmp`, `jz` or `jnz` located at `at`.
///
/// Returns the branch and the instruction length.
pub fn decode_branch(bytes: &[u8], at: Address) -> Option<(Branch, u32)> {
    match *bytes.first()? {
        0xE8 => {
            let disp = disp_at(bytes, 1)?;
            Some((Branch::Call(at.wrapping_add(5).wrapping_add(disp)), 5))
        }
        0xE9 => {
            let disp = disp_at(bytes, 1)?;
            Some((Branch::Jmp(at.wrapping_add(5).wrapping_add(disp)), 5))
        }
        0x0F => {
            let cond = Cond::from_opcode(*bytes.get(1)?)?;
            let disp = disp_at(bytes, 2)?;
            Some((Branch::Jcc(cond, at.wrapping_add(6).wrapping_add(disp)), 6))
        }
        _ => None,
    }
}

pub fn is_nop_run(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == super::NOP)
}
