use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::image::PatchRegion;
use crate::memory::{Address, TargetMode};
use crate::offset::BuildOffsets;
use crate::patch::{AppliedPatch, format_guid};

/// One applied patch with addresses in hex
#[derive(Debug, Clone, Serialize)]
pub struct PatchEntry {
    pub name: String,
    pub start: String,
    pub end: String,
    pub size: u32,
}

impl From<&AppliedPatch> for PatchEntry {
    fn from(patch: &AppliedPatch) -> Self {
        Self {
            name: patch.name.to_string(),
            start: format!("0x{:08X}", patch.start),
            end: format!("0x{:08X}", patch.end),
            size: patch.len(),
        }
    }
}

/// Summary of a patch run
#[derive(Debug, Clone, Serialize)]
pub struct PatchReport {
    pub build: String,
    pub timestamp: String,
    pub mode: String,
    pub region_start: String,
    pub region_end: String,
    pub capacity: u32,
    /// First address left unused
    pub cursor: String,
    pub bytes_used: u32,
    pub patches: Vec<PatchEntry>,
    pub network_guid: String,
    pub rekeyed: bool,
    pub patched_at: DateTime<Utc>,
}

impl PatchReport {
    pub fn new(
        build: &BuildOffsets,
        mode: TargetMode,
        region: PatchRegion,
        applied: &[AppliedPatch],
        network_guid: &[u8],
        rekeyed: bool,
    ) -> Self {
        let cursor: Address = applied.last().map_or(region.start, |p| p.end);
        Self {
            build: build.name.clone(),
            timestamp: format!("0x{:08X}", build.timestamp),
            mode: mode.to_string(),
            region_start: format!("0x{:08X}", region.start),
            region_end: format!("0x{:08X}", region.end()),
            capacity: region.capacity,
            cursor: format!("0x{:08X}", cursor),
            bytes_used: cursor - region.start,
            patches: applied.iter().map(PatchEntry::from).collect(),
            network_guid: format_guid(network_guid),
            rekeyed,
            patched_at: Utc::now(),
        }
    }

    /// Save report to JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offset::us_release;

    #[test]
    fn test_report_fields() {
        let region = PatchRegion {
            start: 0x00AD_1000,
            capacity: 0x40_0000,
        };
        let applied = vec![
            AppliedPatch {
                name: "textures",
                start: 0x00AD_1000,
                end: 0x00B5_1000,
            },
            AppliedPatch {
                name: "collisions",
                start: 0x00B5_1000,
                end: 0x00B5_1011,
            },
        ];
        let report = PatchReport::new(
            &us_release(),
            TargetMode::FileBacked,
            region,
            &applied,
            &[0u8; 16],
            false,
        );

        assert_eq!(report.build, "US");
        assert_eq!(report.timestamp, "0x3C60692C");
        assert_eq!(report.mode, "file");
        assert_eq!(report.region_end, "0x00ED1000");
        assert_eq!(report.cursor, "0x00B51011");
        assert_eq!(report.bytes_used, 0x80011);
        assert_eq!(report.patches[1].size, 0x11);
        assert_eq!(report.network_guid, "0".repeat(32));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report.save(&path).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["patches"][0]["name"], "textures");
        assert_eq!(json["region_start"], "0x00AD1000");
    }
}
