//! Higher resolution texture tables.
//!
//! The loader receives the texture size as 8-bit immediates, too narrow for
//! the new dimensions, so the pushes are moved into a cave with 32-bit
//! immediates. The textures themselves are copied into the patch region and
//! the table entries repointed at the copies.

use std::sync::Arc;

use tracing::{debug, info};

use super::{AssetSource, Patch, PatchContext};
use crate::cave::{CaveBuilder, Redirect, Site};
use crate::error::{Error, Result};
use crate::memory::{Address, ScalarIo};
use crate::offset::TextureTableOffsets;

/// No-ops before each cave, so disassemblers resync
const CAVE_ALIGN: usize = 16;

/// Upper bound on entries per table; anything larger means a bad address
const MAX_TABLE_ENTRIES: u32 = 256;

pub struct TexturePatch {
    tables: Vec<TextureTableOffsets>,
    width: u32,
    height: u32,
    texture_size: u32,
    assets: Arc<dyn AssetSource>,
}

impl TexturePatch {
    pub fn new(
        tables: Vec<TextureTableOffsets>,
        width: u32,
        height: u32,
        assets: Arc<dyn AssetSource>,
    ) -> Result<Self> {
        let pixels = width
            .checked_mul(height)
            .filter(|&pixels| pixels > 0 && pixels % 2 == 0)
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "texture size {}x{} cannot be packed at 4 bpp",
                    width, height
                ))
            })?;
        Ok(Self {
            tables,
            width,
            height,
            texture_size: pixels / 2,
            assets,
        })
    }

    /// Bytes of one 4 bpp texture
    pub fn texture_size(&self) -> u32 {
        self.texture_size
    }

    fn patch_table(
        &self,
        ctx: &mut PatchContext<'_>,
        table: &TextureTableOffsets,
        cursor: Address,
    ) -> Result<Address> {
        let site = Site::new(table.site_begin, table.site_end)?;

        let mut cave = CaveBuilder::open(&mut *ctx.space, cursor, CAVE_ALIGN)?;
        let emit = cave.emit();
        emit.push_imm32(self.height)?;
        emit.push_imm32(self.width)?;
        emit.push_imm32(self.height)?;
        emit.push_imm32(self.width)?;
        emit.jmp(site.end())?;
        let cave = cave.finish();
        cave.install(&mut *ctx.space, site, Redirect::Jump)?;

        let count = ctx.space.read_u32(table.table)?;
        if count > MAX_TABLE_ENTRIES {
            return Err(Error::MalformedImage(format!(
                "texture table {} at 0x{:08X} claims {} entries",
                table.name, table.table, count
            )));
        }

        let mut cursor = cave.end;
        for index in 0..count {
            let texture = self
                .assets
                .texture(&table.name, index, self.width, self.height)?;
            if texture.len() != self.texture_size() as usize {
                return Err(Error::InvalidInput(format!(
                    "texture {}[{}] is {} bytes, expected {}",
                    table.name,
                    index,
                    texture.len(),
                    self.texture_size()
                )));
            }
            ctx.space.write_bytes(cursor, &texture)?;

            let entry = table.table + 4 + index * 4;
            let previous = ctx.space.read_u32(entry)?;
            ctx.space.write_u32(entry, cursor)?;
            debug!(
                "{}[{}]: 0x{:08X} -> 0x{:08X}",
                table.name, index, previous, cursor
            );

            cursor = cursor
                .checked_add(self.texture_size)
                .ok_or(Error::AddressUnmapped {
                    address: cursor,
                    len: texture.len(),
                })?;
        }

        info!(
            "Replaced {} {} textures with {}x{}",
            count, table.name, self.width, self.height
        );
        Ok(cursor)
    }
}

impl Patch for TexturePatch {
    fn name(&self) -> &'static str {
        "textures"
    }

    fn apply(&self, ctx: &mut PatchContext<'_>, cursor: Address) -> Result<Address> {
        let mut cursor = cursor;
        for table in &self.tables {
            cursor = self.patch_table(ctx, table, cursor)?;
        }
        Ok(cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::{Branch, decode_branch, is_nop_run};
    use crate::memory::MockSpace;
    use crate::patch::Fingerprint;
    use crate::patch::test_support::{MemoryAssets, REGION, game_space};

    fn font0() -> TextureTableOffsets {
        TextureTableOffsets {
            name: "font0".to_string(),
            table: 0x004B_F91C,
            site_begin: 0x0042_D745,
            site_end: 0x0042_D753,
        }
    }

    fn with_table(space: &mut MockSpace, table: Address, count: u32) {
        space.write_u32(table, count).unwrap();
        for i in 0..count {
            space.write_u32(table + 4 + i * 4, 0x0050_0000 + i).unwrap();
        }
    }

    #[test]
    fn test_rejects_odd_pixel_count() {
        let assets: Arc<dyn AssetSource> = Arc::new(MemoryAssets::uniform(0));
        assert!(TexturePatch::new(vec![], 3, 3, assets.clone()).is_err());
        assert!(TexturePatch::new(vec![], 0, 8, assets.clone()).is_err());
        assert!(matches!(
            TexturePatch::new(vec![], 0x10000, 0x10000, assets.clone()),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(
            TexturePatch::new(vec![], 512, 1024, assets)
                .unwrap()
                .texture_size(),
            0x40000
        );
    }

    #[test]
    fn test_patch_table() {
        let mut space = game_space();
        with_table(&mut space, 0x004B_F91C, 2);

        let patch = TexturePatch::new(vec![font0()], 8, 16, Arc::new(MemoryAssets::uniform(0x5A)))
            .unwrap();
        let mut fingerprint = Fingerprint::new();
        let mut ctx = PatchContext::new(&mut space, &mut fingerprint, false);
        let end = patch.apply(&mut ctx, REGION.start).unwrap();

        // 16 nops, 4 pushes, jmp, then two 64-byte textures
        let cave = REGION.start + 16;
        let first = cave + 4 * 5 + 5;
        assert_eq!(end, first + 2 * 64);

        assert!(is_nop_run(space.slice(REGION.start, 16)));
        assert_eq!(
            space.slice(cave, 5),
            [0x68, 0x10, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            space.slice(cave + 5, 5),
            [0x68, 0x08, 0x00, 0x00, 0x00]
        );
        let tail = space.slice(first - 5, 5).to_vec();
        assert_eq!(
            decode_branch(&tail, first - 5),
            Some((Branch::Jmp(0x0042_D753), 5))
        );

        let window = space.slice(0x0042_D745, 14).to_vec();
        assert_eq!(
            decode_branch(&window, 0x0042_D745),
            Some((Branch::Jmp(cave), 5))
        );
        assert!(is_nop_run(&window[5..]));

        assert_eq!(space.read_u32(0x004B_F91C).unwrap(), 2);
        assert_eq!(space.read_u32(0x004B_F920).unwrap(), first);
        assert_eq!(space.read_u32(0x004B_F924).unwrap(), first + 64);
        assert!(space.slice(first, 128).iter().all(|&b| b == 0x5A));
    }

    #[test]
    fn test_missing_asset_aborts() {
        let mut space = game_space();
        with_table(&mut space, 0x004B_F91C, 1);

        let patch =
            TexturePatch::new(vec![font0()], 8, 16, Arc::new(MemoryAssets::default())).unwrap();
        let mut fingerprint = Fingerprint::new();
        let mut ctx = PatchContext::new(&mut space, &mut fingerprint, false);
        assert!(matches!(
            patch.apply(&mut ctx, REGION.start),
            Err(Error::AssetMissing { .. })
        ));
    }

    #[test]
    fn test_implausible_table() {
        let mut space = game_space();
        space.write_u32(0x004B_F91C, 0xCCCC_CCCC).unwrap();

        let patch =
            TexturePatch::new(vec![font0()], 8, 16, Arc::new(MemoryAssets::uniform(0))).unwrap();
        let mut fingerprint = Fingerprint::new();
        let mut ctx = PatchContext::new(&mut space, &mut fingerprint, false);
        assert!(matches!(
            patch.apply(&mut ctx, REGION.start),
            Err(Error::MalformedImage(_))
        ));
    }
}
