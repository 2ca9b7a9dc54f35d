//! Patch configuration, read from TOML

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::image::DEFAULT_CAPACITY;

/// Number of vehicle upgrade categories
pub const UPGRADE_CATEGORIES: usize = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub enabled: bool,
    pub width: u32,
    pub height: u32,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: 512,
            height: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeConfig {
    pub enabled: bool,
    /// Upgrade level per category
    pub levels: Vec<u8>,
    /// Upgrade health per category
    pub healths: Vec<u8>,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            levels: vec![3, 5, 5, 5, 5, 5, 5],
            healths: vec![0xFF; UPGRADE_CATEGORIES],
        }
    }
}

impl UpgradeConfig {
    fn table(values: &[u8], field: &str) -> Result<[u8; UPGRADE_CATEGORIES]> {
        values.try_into().map_err(|_| {
            Error::Config(format!(
                "upgrades.{} needs {} entries, found {}",
                field,
                UPGRADE_CATEGORIES,
                values.len()
            ))
        })
    }

    pub fn level_table(&self) -> Result<[u8; UPGRADE_CATEGORIES]> {
        Self::table(&self.levels, "levels")
    }

    pub fn health_table(&self) -> Result<[u8; UPGRADE_CATEGORIES]> {
        Self::table(&self.healths, "healths")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub enabled: bool,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub enabled: bool,
    pub samplerate: u32,
    pub bits_per_sample: u8,
    pub stereo: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            samplerate: 44100,
            bits_per_sample: 16,
            stereo: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteConfig {
    pub enabled: bool,
    /// `sprintf` format taking the sprite index
    pub path: String,
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "data\\sprites\\sprite-%d.tga".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub enabled: bool,
    /// `sprintf` format taking the trigger action id
    pub format: String,
    /// Seconds the message stays on screen
    pub duration: f32,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            format: "Trigger %d activated".to_string(),
            duration: 3.0,
        }
    }
}

/// Everything that decides what a patch run does
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchConfig {
    /// Bytes reserved for injected code and data
    pub capacity: u32,
    /// Directory holding replacement textures
    pub asset_dir: PathBuf,
    /// Derive a new network GUID from the gameplay changes
    pub rekey_network_guid: bool,
    pub fonts: FontConfig,
    pub upgrades: UpgradeConfig,
    pub collisions: CollisionConfig,
    pub audio: AudioConfig,
    pub sprites: SpriteConfig,
    pub triggers: TriggerConfig,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            asset_dir: PathBuf::from("textures"),
            rekey_network_guid: false,
            fonts: FontConfig::default(),
            upgrades: UpgradeConfig::default(),
            collisions: CollisionConfig::default(),
            audio: AudioConfig::default(),
            sprites: SpriteConfig::default(),
            triggers: TriggerConfig::default(),
        }
    }
}

impl PatchConfig {
    /// Create a new configuration builder
    pub fn builder() -> PatchConfigBuilder {
        PatchConfigBuilder::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        Self::from_toml(&content)
    }

    /// Like [`PatchConfig::load`], but a missing file yields the defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::load(&path) {
            Err(e) if e.is_not_found() => {
                warn!(
                    "Config file {} not found, using defaults",
                    path.as_ref().display()
                );
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Builder for PatchConfig
#[derive(Debug, Clone, Default)]
pub struct PatchConfigBuilder {
    capacity: Option<u32>,
    asset_dir: Option<PathBuf>,
    rekey_network_guid: Option<bool>,
    fonts: Option<FontConfig>,
    upgrades: Option<UpgradeConfig>,
    collisions: Option<bool>,
    audio: Option<AudioConfig>,
    sprites: Option<SpriteConfig>,
    triggers: Option<TriggerConfig>,
}

impl PatchConfigBuilder {
    pub fn capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn asset_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.asset_dir = Some(path.into());
        self
    }

    pub fn rekey_network_guid(mut self, enabled: bool) -> Self {
        self.rekey_network_guid = Some(enabled);
        self
    }

    pub fn fonts(mut self, fonts: FontConfig) -> Self {
        self.fonts = Some(fonts);
        self
    }

    pub fn upgrades(mut self, upgrades: UpgradeConfig) -> Self {
        self.upgrades = Some(upgrades);
        self
    }

    pub fn collisions(mut self, enabled: bool) -> Self {
        self.collisions = Some(enabled);
        self
    }

    pub fn audio(mut self, audio: AudioConfig) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn sprites(mut self, sprites: SpriteConfig) -> Self {
        self.sprites = Some(sprites);
        self
    }

    pub fn triggers(mut self, triggers: TriggerConfig) -> Self {
        self.triggers = Some(triggers);
        self
    }

    /// Build the configuration
    pub fn build(self) -> PatchConfig {
        let default = PatchConfig::default();
        PatchConfig {
            capacity: self.capacity.unwrap_or(default.capacity),
            asset_dir: self.asset_dir.unwrap_or(default.asset_dir),
            rekey_network_guid: self
                .rekey_network_guid
                .unwrap_or(default.rekey_network_guid),
            fonts: self.fonts.unwrap_or(default.fonts),
            upgrades: self.upgrades.unwrap_or(default.upgrades),
            collisions: self
                .collisions
                .map(|enabled| CollisionConfig { enabled })
                .unwrap_or(default.collisions),
            audio: self.audio.unwrap_or(default.audio),
            sprites: self.sprites.unwrap_or(default.sprites),
            triggers: self.triggers.unwrap_or(default.triggers),
        }
    }
}
