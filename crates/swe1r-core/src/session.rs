//! Complete patch runs, one entry point per storage model.
//!
//! Every run identifies the build before touching the target, builds the
//! enabled patches from the configuration, reserves a patch region and then
//! applies the patches in order.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::config::PatchConfig;
use crate::error::{Error, Result};
use crate::image::{ExtendableImage, ImageExtender, ImageHeaders, PatchRegion};
use crate::memory::{Address, AddressSpace};
use crate::offset::{BuildOffsets, find_build};
use crate::patch::{
    AssetSource, DirectoryAssets, FINGERPRINT_LEN, Fingerprint, PatchContext, PatchSet,
    format_guid,
};
use crate::report::PatchReport;
use crate::target::FileTarget;

#[cfg(target_os = "windows")]
use crate::image::layout::DEFAULT_IMAGE_BASE;
#[cfg(target_os = "windows")]
use crate::target::{InProcess, RemoteProcess};

/// Read the headers at `image_base` and resolve the build they belong to
pub fn identify<'b, S: AddressSpace + ?Sized>(
    space: &S,
    image_base: Address,
    builds: &'b [BuildOffsets],
) -> Result<(ImageHeaders, &'b BuildOffsets)> {
    let headers = ImageHeaders::read(space, image_base)?;
    let build = find_build(builds, headers.timestamp)?;
    if build.image_base != headers.image_base {
        return Err(Error::MalformedImage(format!(
            "build {} expects image base 0x{:08X}, image uses 0x{:08X}",
            build.name, build.image_base, headers.image_base
        )));
    }

    info!(
        "Identified build {} (timestamp 0x{:08X})",
        build.name, build.timestamp
    );
    Ok((headers, build))
}

fn directory_assets(config: &PatchConfig) -> Arc<dyn AssetSource> {
    Arc::new(DirectoryAssets::new(&config.asset_dir))
}

/// Apply `patches` inside `region`, then rekey the network GUID if asked
fn apply_patches(
    space: &mut dyn AddressSpace,
    build: &BuildOffsets,
    config: &PatchConfig,
    patches: &PatchSet,
    region: PatchRegion,
) -> Result<PatchReport> {
    let rekey = config.rekey_network_guid;
    let mut fingerprint = Fingerprint::new();
    let applied = {
        let mut ctx = PatchContext::new(&mut *space, &mut fingerprint, rekey);
        patches.apply(&mut ctx, region)?
    };

    if rekey {
        let guid = fingerprint.write(&mut *space, build.network_guid)?;
        info!(
            "Network GUID rekeyed to {} ({} inputs)",
            format_guid(&guid),
            fingerprint.mix_count()
        );
    }
    let guid = space.read_vec(build.network_guid, FINGERPRINT_LEN)?;

    Ok(PatchReport::new(
        build,
        space.mode(),
        region,
        &applied,
        &guid,
        rekey,
    ))
}

/// Patch the executable at `path` in place, loading textures from
/// `config.asset_dir`
pub fn patch_file(
    path: impl AsRef<Path>,
    config: &PatchConfig,
    builds: &[BuildOffsets],
) -> Result<PatchReport> {
    patch_file_with_assets(path, config, builds, directory_assets(config))
}

pub fn patch_file_with_assets(
    path: impl AsRef<Path>,
    config: &PatchConfig,
    builds: &[BuildOffsets],
    assets: Arc<dyn AssetSource>,
) -> Result<PatchReport> {
    let extender = ImageExtender::new(config.capacity)?;
    let mut target = FileTarget::open(path)?;
    let (_, build) = identify(&target, target.image_base(), builds)?;
    let patches = PatchSet::from_config(config, build, assets)?;

    let region = extender.extend(&mut target)?;
    let report = apply_patches(&mut target, build, config, &patches, region)?;
    target.flush()?;

    info!(
        "Patched {} ({} of {} bytes used)",
        target.path().display(),
        report.bytes_used,
        report.capacity
    );
    Ok(report)
}

/// Start `exe` suspended, patch it in memory and let it run.
///
/// A failure before the resume terminates the child.
#[cfg(target_os = "windows")]
pub fn patch_process(
    exe: &Path,
    args: &[String],
    config: &PatchConfig,
    builds: &[BuildOffsets],
) -> Result<PatchReport> {
    let capacity = ImageExtender::new(config.capacity)?.capacity();
    let mut process = RemoteProcess::spawn_suspended(exe, args)?;
    let (_, build) = identify(&process, DEFAULT_IMAGE_BASE, builds)?;
    let patches = PatchSet::from_config(config, build, directory_assets(config))?;

    let region = process.allocate(capacity)?;
    let report = apply_patches(&mut process, build, config, &patches, region)?;
    process.resume()?;

    info!(
        "Patched process {} ({} of {} bytes used)",
        process.pid(),
        report.bytes_used,
        report.capacity
    );
    Ok(report)
}

/// Patch the game image this code is running inside.
///
/// # Safety
///
/// Same contract as [`InProcess::new`].
#[cfg(target_os = "windows")]
pub unsafe fn patch_in_process(
    config: &PatchConfig,
    builds: &[BuildOffsets],
) -> Result<PatchReport> {
    let capacity = ImageExtender::new(config.capacity)?.capacity();
    // SAFETY: forwarded to the caller.
    let mut target = unsafe { InProcess::new() };
    let (_, build) = identify(&target, DEFAULT_IMAGE_BASE, builds)?;
    let patches = PatchSet::from_config(config, build, directory_assets(config))?;

    let region = target.allocate(capacity)?;
    apply_patches(&mut target, build, config, &patches, region)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::config::{FontConfig, UpgradeConfig};
    use crate::image::fixture::{SyntheticImage, TEXT_FILE_OFFSET};
    use crate::memory::{MockSpace, ScalarIo};
    use crate::offset::{
        CollisionOffsets, TextureTableOffsets, UpgradeOffsets, builtin_builds, us_release,
    };

    const TEXT: Address = 0x0040_1000;
    const FONT_TABLE: Address = TEXT + 0x800;
    const GUID: Address = TEXT + 0x900;

    /// US offsets moved into the synthetic `.text`
    fn synthetic_build() -> BuildOffsets {
        BuildOffsets {
            name: "synthetic".to_string(),
            network_guid: GUID,
            fonts: vec![TextureTableOffsets {
                name: "font0".to_string(),
                table: FONT_TABLE,
                site_begin: TEXT + 0x100,
                site_end: TEXT + 0x10E,
            }],
            upgrades: UpgradeOffsets {
                menu_level: TEXT + 0x200,
                menu_health: TEXT + 0x201,
                site_begin: TEXT + 0x210,
                site_end: TEXT + 0x217,
                generate_handling: TEXT + 0x300,
            },
            collisions: CollisionOffsets {
                multiplayer_flag: TEXT + 0x400,
                call_site: TEXT + 0x410,
                routine: TEXT + 0x420,
            },
            ..us_release()
        }
    }

    /// Synthetic executable with a one-entry font table and its texture
    fn setup(dir: &Path) -> PathBuf {
        let mut image = SyntheticImage::default().build();
        let table = (TEXT_FILE_OFFSET + (FONT_TABLE - TEXT)) as usize;
        image[table..table + 4].copy_from_slice(&1u32.to_le_bytes());
        image[table + 4..table + 8].copy_from_slice(&(TEXT + 0xA00).to_le_bytes());

        let exe = dir.join("swep1rcr.exe");
        fs::write(&exe, &image).unwrap();
        fs::write(dir.join("font0_0_test.data"), vec![0xF0u8; 8 * 16 * 2]).unwrap();
        exe
    }

    fn config(dir: &Path, rekey: bool) -> PatchConfig {
        PatchConfig::builder()
            .capacity(0x10000)
            .asset_dir(dir)
            .rekey_network_guid(rekey)
            .fonts(FontConfig {
                enabled: true,
                width: 8,
                height: 16,
            })
            .build()
    }

    #[test]
    fn test_identify() {
        let image = SyntheticImage::default().build();
        let mut space = MockSpace::new(0x0040_0000, image.len());
        space.write_bytes(0x0040_0000, &image).unwrap();

        let builds = builtin_builds();
        let (headers, build) = identify(&space, 0x0040_0000, &builds).unwrap();
        assert_eq!(headers.section_count, 1);
        assert_eq!(build.name, "US");

        assert!(matches!(
            identify(&space, 0x0040_0000, &[]),
            Err(Error::UnsupportedBuild {
                timestamp: 0x3C60_692C
            })
        ));

        let mut moved = synthetic_build();
        moved.image_base = 0x1000_0000;
        assert!(matches!(
            identify(&space, 0x0040_0000, &[moved]),
            Err(Error::MalformedImage(_))
        ));
    }

    #[test]
    fn test_patch_synthetic_image() {
        let dir = tempfile::tempdir().unwrap();
        let exe = setup(dir.path());

        let report = patch_file(&exe, &config(dir.path(), true), &[synthetic_build()]).unwrap();
        assert_eq!(report.build, "synthetic");
        assert_eq!(report.mode, "file");
        assert_eq!(report.region_start, "0x00402000");
        assert_eq!(report.region_end, "0x00412000");
        let names: Vec<_> = report.patches.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["textures", "upgrades", "collisions"]);
        assert!(report.rekeyed);
        assert_eq!(report.network_guid, "0000E8F4762A58858AA4679DB5E8AEAC");

        let target = FileTarget::open(&exe).unwrap();
        let headers = target.headers().unwrap();
        assert_eq!(headers.section_count, 2);
        assert!(headers.is_patched());
        assert_eq!(headers.size_of_image, 0x2000 + 0x10000);

        assert_eq!(target.read_u8(TEXT + 0x200).unwrap(), 3);
        assert_eq!(target.read_u8(TEXT + 0x201).unwrap(), 0xFF);

        let texture = target.read_u32(FONT_TABLE + 4).unwrap();
        assert!((0x0040_2000..0x0041_2000).contains(&texture));
        assert_eq!(target.read_vec(texture, 64).unwrap(), vec![0xFF; 64]);

        assert_eq!(target.read_vec(GUID, 2).unwrap(), vec![0, 0]);
    }

    #[test]
    fn test_patched_file_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let exe = setup(dir.path());
        let builds = [synthetic_build()];
        patch_file(&exe, &config(dir.path(), false), &builds).unwrap();

        let before = fs::read(&exe).unwrap();
        let err = patch_file(&exe, &config(dir.path(), false), &builds).unwrap_err();
        assert!(matches!(err, Error::AlreadyPatched));
        assert_eq!(fs::read(&exe).unwrap(), before);
    }

    #[test]
    fn test_nothing_written_before_identification() {
        let dir = tempfile::tempdir().unwrap();
        let exe = setup(dir.path());
        let before = fs::read(&exe).unwrap();

        let err = patch_file(&exe, &config(dir.path(), false), &[]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedBuild { .. }));
        assert_eq!(fs::read(&exe).unwrap(), before);

        let mut bad = config(dir.path(), false);
        bad.upgrades = UpgradeConfig {
            levels: vec![1, 2, 3],
            ..UpgradeConfig::default()
        };
        let err = patch_file(&exe, &bad, &[synthetic_build()]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(fs::read(&exe).unwrap(), before);
    }

    #[test]
    fn test_invalid_capacity_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let exe = setup(dir.path());
        let before = fs::read(&exe).unwrap();
        let builds = [synthetic_build()];

        for capacity in [0, 0xFFFF_F001] {
            let mut bad = config(dir.path(), false);
            bad.capacity = capacity;
            let err = patch_file(&exe, &bad, &builds).unwrap_err();
            assert!(matches!(err, Error::Config(_)));
            assert_eq!(fs::read(&exe).unwrap(), before);
        }

        // a later run with a sane capacity still goes through
        let report = patch_file(&exe, &config(dir.path(), false), &builds).unwrap();
        assert_eq!(report.capacity, 0x10000);
    }

    #[test]
    fn test_guid_untouched_without_rekey() {
        let dir = tempfile::tempdir().unwrap();
        let exe = setup(dir.path());

        let report = patch_file(&exe, &config(dir.path(), false), &[synthetic_build()]).unwrap();
        assert!(!report.rekeyed);
        assert_eq!(report.network_guid, "CC".repeat(16));
    }
}
