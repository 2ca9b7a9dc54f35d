use serde::{Deserialize, Serialize};

use crate::image::layout::DEFAULT_IMAGE_BASE;
use crate::memory::Address;

/// A table of texture pointers and the code that sets its dimensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureTableOffsets {
    /// Asset name prefix, e.g. `font0`
    pub name: String,
    /// `u32` count followed by `count` texture pointers
    pub table: Address,
    /// Instruction window that pushes the texture dimensions
    pub site_begin: Address,
    pub site_end: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeOffsets {
    /// Immediate operand holding the upgrade level shown in menus
    pub menu_level: Address,
    /// Immediate operand holding the upgrade health shown in menus
    pub menu_health: Address,
    /// Window around the call that builds a network player's handling table
    pub site_begin: Address,
    pub site_end: Address,
    /// Routine that applies upgrades to a handling table
    pub generate_handling: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionOffsets {
    /// Non-zero while a multiplayer race is running
    pub multiplayer_flag: Address,
    /// `call` into the collision routine
    pub call_site: Address,
    pub routine: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioOffsets {
    pub buffer_size: Address,
    pub bits_per_sample: Address,
    pub samplerate: Address,
    /// Stream buffer chunk size operands
    pub chunk_sizes: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteOffsets {
    /// Entry of the sprite loader, replaced by a jump
    pub loader_entry: Address,
    pub sprintf: Address,
    /// Loads a TGA file and registers it as a sprite; zero on failure
    pub load_tga: Address,
    /// Loads a sprite from the game archives
    pub load_internal: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerOffsets {
    /// `call` into the trigger routine
    pub call_site: Address,
    pub sprintf: Address,
    pub display_message: Address,
    pub run_trigger: Address,
    /// Offset of the section 8 pointer inside a trigger
    pub section_field: i8,
    /// Offset of the action id inside section 8
    pub action_field: i8,
}

/// Every address the patches touch in one build of the game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOffsets {
    pub name: String,
    /// COFF `TimeDateStamp` identifying the build
    pub timestamp: u32,
    pub image_base: Address,
    /// 16-byte GUID exchanged in network sessions
    pub network_guid: Address,
    pub fonts: Vec<TextureTableOffsets>,
    pub upgrades: UpgradeOffsets,
    pub collisions: CollisionOffsets,
    pub audio: AudioOffsets,
    pub sprites: SpriteOffsets,
    pub triggers: TriggerOffsets,
}

fn font(name: &str, table: Address, site_begin: Address, site_end: Address) -> TextureTableOffsets {
    TextureTableOffsets {
        name: name.to_string(),
        table,
        site_begin,
        site_end,
    }
}

/// US release, the only build with known addresses
pub fn us_release() -> BuildOffsets {
    BuildOffsets {
        name: "US".to_string(),
        timestamp: 0x3C60_692C,
        image_base: DEFAULT_IMAGE_BASE,
        network_guid: 0x004A_F9B0,
        fonts: vec![
            font("font0", 0x004B_F91C, 0x0042_D745, 0x0042_D753),
            font("font1", 0x004B_F7E4, 0x0042_D786, 0x0042_D794),
            font("font2", 0x004B_F84C, 0x0042_D7C7, 0x0042_D7D5),
            font("font3", 0x004B_F8B4, 0x0042_D808, 0x0042_D816),
            font("font4", 0x004B_F984, 0x0042_D849, 0x0042_D857),
        ],
        upgrades: UpgradeOffsets {
            menu_level: 0x0045_CFC6,
            menu_health: 0x0045_CFCB,
            site_begin: 0x0045_B765,
            site_end: 0x0045_B76C,
            generate_handling: 0x0044_9D00,
        },
        collisions: CollisionOffsets {
            multiplayer_flag: 0x004D_5E00,
            call_site: 0x0047_B5AF,
            routine: 0x0047_B0C0,
        },
        audio: AudioOffsets {
            buffer_size: 0x0042_3215,
            bits_per_sample: 0x0042_321A,
            samplerate: 0x0042_321E,
            chunk_sizes: vec![0x0042_3549, 0x0042_354E, 0x0042_3555],
        },
        sprites: SpriteOffsets {
            loader_entry: 0x0044_6FB0,
            sprintf: 0x0049_EB80,
            load_tga: 0x0041_14D0,
            load_internal: 0x0044_6CA0,
        },
        triggers: TriggerOffsets {
            call_site: 0x0047_6E80,
            sprintf: 0x0049_EB80,
            display_message: 0x0044_FCE0,
            run_trigger: 0x0047_CE60,
            section_field: 0x4C,
            action_field: 0x24,
        },
    }
}

/// Builds supported without an external table
pub fn builtin_builds() -> Vec<BuildOffsets> {
    vec![us_release()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_us_release_sites_fit_a_branch() {
        let build = us_release();
        for font in &build.fonts {
            assert_eq!(font.site_end - font.site_begin, 14, "{}", font.name);
        }
        assert_eq!(build.upgrades.site_end - build.upgrades.site_begin, 7);
        assert_eq!(build.audio.chunk_sizes.len(), 3);
    }
}
