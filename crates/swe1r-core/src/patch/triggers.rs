//! On-screen message whenever a track trigger fires.
//!
//! The call into the trigger routine is retargeted to a cave that formats
//! the trigger's action id, shows it, and then tail-jumps to the routine.

use tracing::info;

use super::{Patch, PatchContext};
use crate::asm::{Emitter, Reg};
use crate::cave::{Redirect, Site, redirect};
use super::check_int_format;
use crate::error::Result;
use crate::memory::Address;
use crate::offset::TriggerOffsets;

/// Stack reserved for the formatted message
const MESSAGE_BUFFER: i32 = 0x400;

pub struct TriggerPatch {
    offsets: TriggerOffsets,
    format: String,
    duration: f32,
}

impl TriggerPatch {
    pub fn new(offsets: TriggerOffsets, format: String, duration: f32) -> Result<Self> {
        check_int_format("trigger message", &format, MESSAGE_BUFFER as usize)?;
        Ok(Self {
            offsets,
            format,
            duration,
        })
    }
}

impl Patch for TriggerPatch {
    fn name(&self) -> &'static str {
        "triggers"
    }

    fn apply(&self, ctx: &mut PatchContext<'_>, cursor: Address) -> Result<Address> {
        let mut emit = Emitter::new(&mut *ctx.space, cursor);
        let format_at = emit.position();
        emit.c_string(&self.format)?;

        let code = emit.position();
        emit.mov_load_disp8(Reg::Eax, Reg::Esp, 4)?;
        emit.mov_load_disp8(Reg::Eax, Reg::Eax, self.offsets.section_field)?;
        emit.movzx_word_disp8(Reg::Eax, Reg::Eax, self.offsets.action_field)?;
        emit.add_esp(-MESSAGE_BUFFER)?;
        emit.mov_reg(Reg::Edx, Reg::Esp)?;

        emit.push(Reg::Eax)?;
        emit.push_imm32(format_at)?;
        emit.push(Reg::Edx)?;
        emit.call(self.offsets.sprintf)?;
        emit.pop(Reg::Edx)?;
        emit.add_esp(8)?;

        emit.push_imm32(self.duration.to_bits())?;
        emit.push(Reg::Edx)?;
        emit.call(self.offsets.display_message)?;
        emit.add_esp(8)?;

        emit.add_esp(MESSAGE_BUFFER)?;
        let end = emit.jmp(self.offsets.run_trigger)?;

        redirect(
            &mut *ctx.space,
            Site::call(self.offsets.call_site),
            code,
            Redirect::Call,
        )?;

        info!("Trigger messages shown for {}s", self.duration);
        Ok(end)
    }
}
