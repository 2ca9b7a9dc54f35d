//! Code cave installation.
//!
//! A cave is a block of new code placed in the patch region. The original
//! instruction window is overwritten with a single jump or call into the cave
//! and the rest of the window is filled with `nop`, so nothing after the
//! window moves.
//!
//! Layout is explicit: open a cave at the cursor, emit its body, finish it to
//! learn its address range, then wire the incoming edge with [`Cave::install`].

use tracing::debug;

use crate::asm::{self, Branch, Emitter, NEAR_BRANCH_LEN, decode_branch, encode};
use crate::error::{Error, Result};
use crate::memory::{Address, AddressSpace};

/// An instruction window `[begin, end)` in the original code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Site {
    begin: Address,
    end: Address,
}

impl Site {
    /// The window must hold at least one `jmp rel32`
    pub fn new(begin: Address, end: Address) -> Result<Self> {
        if end < begin || end - begin < NEAR_BRANCH_LEN {
            return Err(Error::SiteTooNarrow { begin, end });
        }
        Ok(Self { begin, end })
    }

    /// The 5-byte window of an existing `call rel32` at `at`
    pub fn call(at: Address) -> Self {
        Self {
            begin: at,
            end: at.wrapping_add(NEAR_BRANCH_LEN),
        }
    }

    pub fn begin(&self) -> Address {
        self.begin
    }

    pub fn end(&self) -> Address {
        self.end
    }

    /// Bytes in the window
    pub fn width(&self) -> u32 {
        self.end - self.begin
    }
}

/// How control enters the cave from the site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    /// `jmp`; the cave decides where execution resumes
    Jump,
    /// `call`; the cave returns to the instruction after the window
    Call,
}

/// A finished cave occupying `[start, end)` of the patch region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cave {
    pub start: Address,
    pub end: Address,
}

impl Cave {
    /// Point `site` at this cave
    pub fn install(&self, space: &mut dyn AddressSpace, site: Site, kind: Redirect) -> Result<()> {
        redirect(space, site, self.start, kind)
    }
}

/// Builder for the body of a cave
pub struct CaveBuilder<'a> {
    emitter: Emitter<'a>,
    start: Address,
}

impl<'a> CaveBuilder<'a> {
    /// Start a cave at `cursor`, preceded by `align` no-ops.
    ///
    /// The padding only makes disassembly of the region line up.
    pub fn open(space: &'a mut dyn AddressSpace, cursor: Address, align: usize) -> Result<Self> {
        let mut emitter = Emitter::new(space, cursor);
        if align > 0 {
            emitter.nops(align)?;
        }
        let start = emitter.position();
        Ok(Self { emitter, start })
    }

    pub fn start(&self) -> Address {
        self.start
    }

    pub fn emit(&mut self) -> &mut Emitter<'a> {
        &mut self.emitter
    }

    pub fn finish(self) -> Cave {
        Cave {
            start: self.start,
            end: self.emitter.position(),
        }
    }
}

/// Overwrite `site` with a branch to `destination` and pad it with `nop`
pub fn redirect(
    space: &mut dyn AddressSpace,
    site: Site,
    destination: Address,
    kind: Redirect,
) -> Result<()> {
    let branch = match kind {
        Redirect::Jump => encode::jmp(site.begin, destination),
        Redirect::Call => encode::call(site.begin, destination),
    };

    let mut window = Vec::with_capacity(site.width() as usize);
    window.extend_from_slice(&branch);
    window.resize(site.width() as usize, asm::NOP);
    space.write_bytes(site.begin, &window)?;

    let written = space.read_vec(site.begin, NEAR_BRANCH_LEN as usize)?;
    let verified = match decode_branch(&written, site.begin) {
        Some((Branch::Jmp(d), _)) => kind == Redirect::Jump && d == destination,
        Some((Branch::Call(d), _)) => kind == Redirect::Call && d == destination,
        _ => false,
    };
    if !verified {
        return Err(Error::MemoryWriteFailed {
            address: site.begin,
            message: "redirect did not read back as written".to_string(),
        });
    }

    debug!(
        "Redirected 0x{:08X}..0x{:08X} -> 0x{:08X} ({:?})",
        site.begin, site.end, destination, kind
    );
    Ok(())
}
