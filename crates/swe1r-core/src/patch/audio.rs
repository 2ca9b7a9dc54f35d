//! Audio stream quality.
//!
//! Only immediates change: the stream format and the buffer sizes derived
//! from it. Nothing is placed in the patch region.

use tracing::info;

use super::{Patch, PatchContext};
use crate::error::{Error, Result};
use crate::memory::{Address, ScalarIo};
use crate::offset::AudioOffsets;

pub struct AudioPatch {
    offsets: AudioOffsets,
    samplerate: u32,
    bits_per_sample: u8,
    stereo: bool,
    buffer_size: u32,
}

impl AudioPatch {
    pub fn new(
        offsets: AudioOffsets,
        samplerate: u32,
        bits_per_sample: u8,
        stereo: bool,
    ) -> Result<Self> {
        if bits_per_sample == 0 || bits_per_sample % 8 != 0 {
            return Err(Error::InvalidInput(format!(
                "{} bits per sample is not a whole number of bytes",
                bits_per_sample
            )));
        }
        if samplerate == 0 {
            return Err(Error::InvalidInput("sample rate must be positive".to_string()));
        }

        // two seconds of audio
        let channels = if stereo { 2 } else { 1 };
        let buffer_size = samplerate
            .checked_mul(u32::from(bits_per_sample / 8))
            .and_then(|v| v.checked_mul(2 * channels))
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "{} Hz at {} bits does not fit a 32-bit buffer size",
                    samplerate, bits_per_sample
                ))
            })?;
        Ok(Self {
            offsets,
            samplerate,
            bits_per_sample,
            stereo,
            buffer_size,
        })
    }

    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }
}

impl Patch for AudioPatch {
    fn name(&self) -> &'static str {
        "audio"
    }

    fn apply(&self, ctx: &mut PatchContext<'_>, cursor: Address) -> Result<Address> {
        let buffer_size = self.buffer_size();

        ctx.space.write_u32(self.offsets.buffer_size, buffer_size)?;
        ctx.space
            .write_u8(self.offsets.bits_per_sample, self.bits_per_sample)?;
        ctx.space.write_u32(self.offsets.samplerate, self.samplerate)?;
        for &chunk in &self.offsets.chunk_sizes {
            ctx.space.write_u32(chunk, buffer_size / 2)?;
        }

        info!(
            "Audio stream set to {} Hz, {} bit, {}",
            self.samplerate,
            self.bits_per_sample,
            if self.stereo { "stereo" } else { "mono" }
        );
        Ok(cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offset::us_release;
    use crate::patch::Fingerprint;
    use crate::patch::test_support::{REGION, game_space};

    #[test]
    fn test_buffer_size() {
        let offsets = us_release().audio;
        assert_eq!(
            AudioPatch::new(offsets.clone(), 44100, 16, true)
                .unwrap()
                .buffer_size(),
            352_800
        );
        assert_eq!(
            AudioPatch::new(offsets.clone(), 22050, 8, false)
                .unwrap()
                .buffer_size(),
            44_100
        );
        assert!(AudioPatch::new(offsets.clone(), 44100, 12, true).is_err());
        assert!(AudioPatch::new(offsets.clone(), 0, 16, true).is_err());
        assert!(matches!(
            AudioPatch::new(offsets, 0x1000_0000, 32, true),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_field_writes() {
        let mut space = game_space();
        let patch = AudioPatch::new(us_release().audio, 44100, 16, true).unwrap();

        let mut fingerprint = Fingerprint::new();
        let mut ctx = PatchContext::new(&mut space, &mut fingerprint, false);
        assert_eq!(patch.apply(&mut ctx, REGION.start).unwrap(), REGION.start);

        assert_eq!(space.read_u32(0x0042_3215).unwrap(), 352_800);
        assert_eq!(space.read_u8(0x0042_321A).unwrap(), 16);
        assert_eq!(space.read_u32(0x0042_321E).unwrap(), 44100);
        for chunk in [0x0042_3549, 0x0042_354E, 0x0042_3555] {
            assert_eq!(space.read_u32(chunk).unwrap(), 176_400);
        }
        assert_eq!(space.read_u8(REGION.start).unwrap(), 0xCC);
    }
}
