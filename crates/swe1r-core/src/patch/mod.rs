//! Game patches and the ordered set that applies them.
//!
//! Each patch receives the next free address of the patch region and returns
//! the next free address after everything it placed there. The set threads
//! that cursor through the patches in a fixed order.

mod assets;
mod audio;
mod collisions;
mod fingerprint;
mod sprites;
mod textures;
mod triggers;
mod upgrades;

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

pub use assets::{AssetSource, DirectoryAssets, pack_gray_alpha};
pub use audio::AudioPatch;
pub use collisions::CollisionPatch;
pub use fingerprint::{FINGERPRINT_LEN, FINGERPRINT_VERSION, Fingerprint, format_guid};
pub use sprites::SpritePatch;
pub use textures::TexturePatch;
pub use triggers::TriggerPatch;
pub use upgrades::UpgradePatch;

use crate::config::PatchConfig;
use crate::error::{Error, Result};
use crate::image::PatchRegion;
use crate::memory::{Address, AddressSpace};
use crate::offset::BuildOffsets;

/// Longest `%d` expansion, `-2147483648`
const MAX_INT_DIGITS: usize = 11;

/// Check that `format` is safe for the game's `sprintf` with one integer
/// argument and a `buffer`-byte destination. `%%` is the only other
/// conversion allowed.
fn check_int_format(what: &str, format: &str, buffer: usize) -> Result<()> {
    let mut conversions = 0;
    let mut expanded = 0;
    let mut bytes = format.bytes();
    while let Some(byte) = bytes.next() {
        match byte {
            0 => {
                return Err(Error::Config(format!("{} format contains a NUL byte", what)));
            }
            b'%' => match bytes.next() {
                Some(b'%') => expanded += 1,
                Some(b'd') => {
                    conversions += 1;
                    expanded += MAX_INT_DIGITS;
                }
                _ => {
                    return Err(Error::Config(format!(
                        "{} format {:?} may only use %d and %%",
                        what, format
                    )));
                }
            },
            _ => expanded += 1,
        }
    }

    if conversions != 1 {
        return Err(Error::Config(format!(
            "{} format {:?} needs exactly one %d, found {}",
            what, format, conversions
        )));
    }
    if expanded + 1 > buffer {
        return Err(Error::Config(format!(
            "{} format expands to up to {} bytes, the buffer holds {}",
            what,
            expanded + 1,
            buffer
        )));
    }
    Ok(())
}

/// State shared by all patches of one run
pub struct PatchContext<'a> {
    pub space: &'a mut dyn AddressSpace,
    pub fingerprint: &'a mut Fingerprint,
    /// Whether gameplay changes feed the network GUID
    pub rekey: bool,
}

impl<'a> PatchContext<'a> {
    pub fn new(
        space: &'a mut dyn AddressSpace,
        fingerprint: &'a mut Fingerprint,
        rekey: bool,
    ) -> Self {
        Self {
            space,
            fingerprint,
            rekey,
        }
    }

    /// Feed `input` to the fingerprint when rekeying is on
    pub fn mix(&mut self, input: &[u8]) -> Result<()> {
        if self.rekey {
            self.fingerprint.mix(input)?;
        }
        Ok(())
    }
}

pub trait Patch {
    fn name(&self) -> &'static str;

    /// Apply the patch with `cursor` as the next free address; returns the
    /// new next free address
    fn apply(&self, ctx: &mut PatchContext<'_>, cursor: Address) -> Result<Address>;
}

/// Region range used by one patch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedPatch {
    pub name: &'static str,
    pub start: Address,
    pub end: Address,
}

impl AppliedPatch {
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Default)]
pub struct PatchSet {
    patches: Vec<Box<dyn Patch>>,
}

impl PatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Patches enabled by `config`, in application order
    pub fn from_config(
        config: &PatchConfig,
        build: &BuildOffsets,
        assets: Arc<dyn AssetSource>,
    ) -> Result<Self> {
        let mut set = Self::new();

        if config.fonts.enabled {
            set.push(TexturePatch::new(
                build.fonts.clone(),
                config.fonts.width,
                config.fonts.height,
                assets,
            )?);
        }
        if config.upgrades.enabled {
            set.push(UpgradePatch::new(
                build.upgrades.clone(),
                config.upgrades.level_table()?,
                config.upgrades.health_table()?,
            ));
        }
        if config.collisions.enabled {
            set.push(CollisionPatch::new(build.collisions.clone()));
        }
        if config.audio.enabled {
            set.push(AudioPatch::new(
                build.audio.clone(),
                config.audio.samplerate,
                config.audio.bits_per_sample,
                config.audio.stereo,
            )?);
        }
        if config.sprites.enabled {
            set.push(SpritePatch::new(
                build.sprites.clone(),
                config.sprites.path.clone(),
            )?);
        }
        if config.triggers.enabled {
            set.push(TriggerPatch::new(
                build.triggers.clone(),
                config.triggers.format.clone(),
                config.triggers.duration,
            )?);
        }

        Ok(set)
    }

    pub fn push<P: Patch + 'static>(&mut self, patch: P) {
        self.patches.push(Box::new(patch));
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.patches.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Apply every patch in order, starting at the beginning of `region`
    pub fn apply(
        &self,
        ctx: &mut PatchContext<'_>,
        region: PatchRegion,
    ) -> Result<Vec<AppliedPatch>> {
        let mut cursor = region.start;
        let mut applied = Vec::with_capacity(self.patches.len());

        for patch in &self.patches {
            let start = cursor;
            let end = patch.apply(ctx, start)?;
            if end < start {
                return Err(Error::CursorRegressed {
                    from: start,
                    to: end,
                });
            }
            if end > region.end() {
                return Err(Error::RegionExhausted {
                    cursor: end,
                    end: region.end(),
                });
            }

            info!(
                "Applied {} (0x{:08X}..0x{:08X}, {} bytes)",
                patch.name(),
                start,
                end,
                end - start
            );
            applied.push(AppliedPatch {
                name: patch.name(),
                start,
                end,
            });
            cursor = end;
        }

        Ok(applied)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;

    use super::AssetSource;
    use crate::error::{Error, Result};
    use crate::image::PatchRegion;
    use crate::memory::{Address, MockSpace};

    /// Game image plus a patch region, both in one flat mock
    pub const IMAGE_BASE: Address = 0x0040_0000;
    pub const REGION: PatchRegion = PatchRegion {
        start: 0x004F_0000,
        capacity: 0x0001_0000,
    };

    pub fn game_space() -> MockSpace {
        MockSpace::filled(
            IMAGE_BASE,
            (REGION.end() - IMAGE_BASE) as usize,
            0xCC,
        )
    }

    /// Textures kept in memory, keyed by `(name, index)`
    #[derive(Default)]
    pub struct MemoryAssets {
        /// Answer every request with this byte when set
        pub fill: Option<u8>,
        pub textures: HashMap<(String, u32), Vec<u8>>,
    }

    impl MemoryAssets {
        pub fn uniform(fill: u8) -> Self {
            Self {
                fill: Some(fill),
                ..Default::default()
            }
        }
    }

    impl AssetSource for MemoryAssets {
        fn texture(&self, name: &str, index: u32, width: u32, height: u32) -> Result<Vec<u8>> {
            if let Some(fill) = self.fill {
                return Ok(vec![fill; (width * height / 2) as usize]);
            }
            self.textures
                .get(&(name.to_string(), index))
                .cloned()
                .ok_or_else(|| Error::AssetMissing {
                    path: format!("{}_{}", name, index).into(),
                })
        }
    }
}
