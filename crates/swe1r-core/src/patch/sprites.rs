//! Sprite loader that prefers TGA files.
//!
//! The new loader formats a path from the sprite index and tries the TGA
//! loader first. On success the sprite and its page are scaled down so the
//! higher resolution image keeps its on-screen size. On failure the original
//! loader runs as before.

use tracing::info;

use super::{Patch, PatchContext};
use crate::asm::{Emitter, Reg};
use crate::cave::{Redirect, Site, redirect};
use super::check_int_format;
use crate::error::Result;
use crate::memory::Address;
use crate::offset::SpriteOffsets;

/// Stack reserved for the formatted path
const PATH_BUFFER: i32 = 0x400;

/// `(field offset, shift)` of the sprite's dimensions
const SPRITE_SHIFTS: [(i8, u8); 3] = [(0, 1), (2, 2), (14, 2)];
/// Offset of the page pointer inside a sprite
const PAGE_FIELD: i8 = 16;
/// `(field offset, shift)` of the page's dimensions
const PAGE_SHIFTS: [(i8, u8); 2] = [(0, 1), (2, 2)];

pub struct SpritePatch {
    offsets: SpriteOffsets,
    path_format: String,
}

impl SpritePatch {
    /// `path_format` takes the sprite index through a single `%d`
    pub fn new(offsets: SpriteOffsets, path_format: String) -> Result<Self> {
        check_int_format("sprite path", &path_format, PATH_BUFFER as usize)?;
        Ok(Self {
            offsets,
            path_format,
        })
    }
}

impl Patch for SpritePatch {
    fn name(&self) -> &'static str {
        "sprites"
    }

    fn apply(&self, ctx: &mut PatchContext<'_>, cursor: Address) -> Result<Address> {
        let entry = Site::new(self.offsets.loader_entry, self.offsets.loader_entry + 5)?;

        let mut emit = Emitter::new(&mut *ctx.space, cursor);
        let path_at = emit.position();
        emit.c_string(&self.path_format)?;

        // eax: sprite returned by the TGA loader
        let success = emit.position();
        for (field, shift) in SPRITE_SHIFTS {
            emit.shr_word_disp8(Reg::Eax, field, shift)?;
        }
        emit.mov_load_disp8(Reg::Edx, Reg::Eax, PAGE_FIELD)?;
        for (field, shift) in PAGE_SHIFTS {
            emit.shr_word_disp8(Reg::Edx, field, shift)?;
        }

        // path buffer and the sprite index are still on the stack
        let finish = emit.position();
        emit.add_esp(PATH_BUFFER + 4)?;
        emit.ret()?;

        let loader = emit.position();
        emit.mov_load_disp8(Reg::Eax, Reg::Esp, 4)?;
        emit.add_esp(-PATH_BUFFER)?;
        emit.mov_reg(Reg::Edx, Reg::Esp)?;
        emit.push(Reg::Eax)?;
        emit.push_imm32(path_at)?;
        emit.push(Reg::Edx)?;
        emit.call(self.offsets.sprintf)?;
        emit.pop(Reg::Edx)?;
        emit.add_esp(4)?;
        emit.push(Reg::Edx)?;
        emit.call(self.offsets.load_tga)?;
        emit.add_esp(4)?;
        emit.test(Reg::Eax)?;
        emit.jnz(success)?;
        emit.call(self.offsets.load_internal)?;
        let end = emit.jmp(finish)?;

        redirect(&mut *ctx.space, entry, loader, Redirect::Jump)?;

        info!("Sprite loader tries {} first", self.path_format);
        Ok(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::{Branch, Cond, decode_branch};
    use crate::memory::ScalarIo;
    use crate::offset::us_release;
    use crate::patch::Fingerprint;
    use crate::patch::test_support::{REGION, game_space};

    const FORMAT: &str = "data\\sprites\\sprite-%d.tga";

    #[test]
    fn test_sprite_loader() {
        let mut space = game_space();
        let patch = SpritePatch::new(us_release().sprites, FORMAT.to_string()).unwrap();

        let mut fingerprint = Fingerprint::new();
        let mut ctx = PatchContext::new(&mut space, &mut fingerprint, false);
        let end = patch.apply(&mut ctx, REGION.start).unwrap();

        let start = REGION.start;
        assert_eq!(space.slice(start, FORMAT.len()), FORMAT.as_bytes());
        assert_eq!(space.read_u8(start + FORMAT.len() as u32).unwrap(), 0);

        let success = start + FORMAT.len() as u32 + 1;
        assert_eq!(
            space.slice(success, 15),
            [
                0x66, 0xC1, 0x68, 0x00, 0x01, 0x66, 0xC1, 0x68, 0x02, 0x02, 0x66, 0xC1, 0x68, 0x0E,
                0x02
            ]
        );
        assert_eq!(space.slice(success + 15, 3), [0x8B, 0x50, 0x10]);
        assert_eq!(
            space.slice(success + 18, 10),
            [0x66, 0xC1, 0x6A, 0x00, 0x01, 0x66, 0xC1, 0x6A, 0x02, 0x02]
        );

        let finish = success + 28;
        assert_eq!(
            space.slice(finish, 7),
            [0x81, 0xC4, 0x04, 0x04, 0x00, 0x00, 0xC3]
        );

        let loader = finish + 7;
        assert_eq!(
            space.slice(loader, 12),
            [0x8B, 0x44, 0x24, 0x04, 0x81, 0xC4, 0x00, 0xFC, 0xFF, 0xFF, 0x89, 0xE2]
        );

        // jnz success / call load_internal / jmp finish close the loader
        let jnz_at = end - 16;
        let tail = space.slice(jnz_at, 16).to_vec();
        assert_eq!(
            decode_branch(&tail, jnz_at),
            Some((Branch::Jcc(Cond::NotEqual, success), 6))
        );
        assert_eq!(
            decode_branch(&tail[6..], jnz_at + 6),
            Some((Branch::Call(0x0044_6CA0), 5))
        );
        assert_eq!(
            decode_branch(&tail[11..], jnz_at + 11),
            Some((Branch::Jmp(finish), 5))
        );

        let entry = space.slice(0x0044_6FB0, 5).to_vec();
        assert_eq!(
            decode_branch(&entry, 0x0044_6FB0),
            Some((Branch::Jmp(loader), 5))
        );
    }
}
