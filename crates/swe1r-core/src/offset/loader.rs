use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

use super::build::BuildOffsets;

pub fn load_builds<P: AsRef<Path>>(path: P) -> Result<Vec<BuildOffsets>> {
    let content = fs::read_to_string(&path)?;
    let data = serde_json::from_str(&content)?;
    Ok(data)
}

pub fn save_builds<P: AsRef<Path>>(path: P, builds: &[BuildOffsets]) -> Result<()> {
    let content = serde_json::to_string_pretty(builds)?;
    fs::write(path, content)?;
    Ok(())
}

/// Pick the build whose COFF timestamp matches
pub fn find_build(builds: &[BuildOffsets], timestamp: u32) -> Result<&BuildOffsets> {
    builds
        .iter()
        .find(|build| build.timestamp == timestamp)
        .ok_or(Error::UnsupportedBuild { timestamp })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offset::builtin_builds;

    #[test]
    fn test_find_build() {
        let builds = builtin_builds();
        assert_eq!(find_build(&builds, 0x3C60_692C).unwrap().name, "US");
        assert!(matches!(
            find_build(&builds, 0x1234_5678),
            Err(Error::UnsupportedBuild {
                timestamp: 0x1234_5678
            })
        ));
    }

    #[test]
    fn test_builds_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("builds.json");

        let mut builds = builtin_builds();
        builds[0].name = "US (custom)".to_string();
        save_builds(&path, &builds).unwrap();

        let loaded = load_builds(&path).unwrap();
        assert_eq!(loaded, builds);
    }

    #[test]
    fn test_load_builds_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_builds(dir.path().join("missing.json")).unwrap_err().is_not_found());

        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_builds(&path), Err(Error::Json(_))));
    }
}
