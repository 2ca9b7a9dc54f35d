//! No collisions between network players.
//!
//! The collision routine is only entered when the race is not a multiplayer
//! race; the original call is retargeted to a cave that checks the flag.

use tracing::info;

use super::{Patch, PatchContext};
use crate::asm::Reg;
use crate::cave::{CaveBuilder, Redirect, Site};
use crate::error::Result;
use crate::memory::Address;
use crate::offset::CollisionOffsets;

pub struct CollisionPatch {
    offsets: CollisionOffsets,
}

impl CollisionPatch {
    pub fn new(offsets: CollisionOffsets) -> Self {
        Self { offsets }
    }
}

impl Patch for CollisionPatch {
    fn name(&self) -> &'static str {
        "collisions"
    }

    fn apply(&self, ctx: &mut PatchContext<'_>, cursor: Address) -> Result<Address> {
        ctx.mix(b"Collisions")?;

        let mut cave = CaveBuilder::open(&mut *ctx.space, cursor, 0)?;
        let emit = cave.emit();
        emit.push(Reg::Edx)?;
        emit.mov_load_abs(Reg::Edx, self.offsets.multiplayer_flag)?;
        emit.test(Reg::Edx)?;
        emit.pop(Reg::Edx)?;
        // tail call keeps the original return address
        emit.jz(self.offsets.routine)?;
        emit.ret()?;
        let cave = cave.finish();
        cave.install(&mut *ctx.space, Site::call(self.offsets.call_site), Redirect::Call)?;

        info!("Collisions disabled in multiplayer");
        Ok(cave.end)
    }
}
