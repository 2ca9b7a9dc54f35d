//! Upgrade levels for network races.
//!
//! Menus read a single level and health from immediates. Network players get
//! their handling table from a routine that takes per-category arrays; the
//! call is redirected to a cave that passes our arrays instead.

use tracing::info;

use super::{Patch, PatchContext};
use crate::asm::{Emitter, Reg};
use crate::cave::{CaveBuilder, Redirect, Site};
use crate::config::UPGRADE_CATEGORIES;
use crate::error::Result;
use crate::memory::{Address, ScalarIo};
use crate::offset::UpgradeOffsets;

pub struct UpgradePatch {
    offsets: UpgradeOffsets,
    levels: [u8; UPGRADE_CATEGORIES],
    healths: [u8; UPGRADE_CATEGORIES],
}

impl UpgradePatch {
    pub fn new(
        offsets: UpgradeOffsets,
        levels: [u8; UPGRADE_CATEGORIES],
        healths: [u8; UPGRADE_CATEGORIES],
    ) -> Self {
        Self {
            offsets,
            levels,
            healths,
        }
    }
}

impl Patch for UpgradePatch {
    fn name(&self) -> &'static str {
        "upgrades"
    }

    fn apply(&self, ctx: &mut PatchContext<'_>, cursor: Address) -> Result<Address> {
        ctx.mix(b"Upgrades")?;
        ctx.mix(&self.levels)?;
        ctx.mix(&self.healths)?;

        // menus only know one value for all categories
        ctx.space.write_u8(self.offsets.menu_level, self.levels[0])?;
        ctx.space.write_u8(self.offsets.menu_health, self.healths[0])?;

        let site = Site::new(self.offsets.site_begin, self.offsets.site_end)?;

        let mut data = Emitter::new(&mut *ctx.space, cursor);
        let levels_at = data.position();
        let healths_at = data.bytes(&self.levels)?;
        let code_at = data.bytes(&self.healths)?;

        let mut cave = CaveBuilder::open(&mut *ctx.space, code_at, 0)?;
        let emit = cave.emit();
        emit.push(Reg::Edx)?;
        emit.push(Reg::Eax)?;
        emit.push_imm32(healths_at)?;
        emit.push_imm32(levels_at)?;
        emit.push(Reg::Esi)?;
        emit.push(Reg::Edi)?;
        emit.call(self.offsets.generate_handling)?;
        emit.add_esp_imm8(0x10)?;
        emit.pop(Reg::Eax)?;
        emit.pop(Reg::Edx)?;
        emit.ret()?;
        let cave = cave.finish();
        cave.install(&mut *ctx.space, site, Redirect::Call)?;

        info!(
            "Network upgrades set to levels {:?}, healths {:?}",
            self.levels, self.healths
        );
        Ok(cave.end)
    }
}
