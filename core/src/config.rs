use crate::FatResult;
use serde::{Deserialize, Serialize};

/// Mount-time options applied uniformly to every file on the volume
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MountOptions {
    pub uid: u32,
    pub gid: u32,
    pub umask: u32,
}

impl Default for MountOptions {
    fn default() -> Self {
        let (uid, gid) = current_ids();
        Self { uid, gid, umask: 0o022 }
    }
}

impl MountOptions {
    pub fn from_json(json: &str) -> FatResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Permission bits for an entry; read-only entries lose every write bit
    pub fn mode_bits(&self, read_only: bool) -> u32 {
        let base = if read_only { 0o555 } else { 0o777 };
        base & !self.umask
    }
}

#[cfg(target_os = "linux")]
fn current_ids() -> (u32, u32) {
    (nix::unistd::getuid().as_raw(), nix::unistd::getgid().as_raw())
}

#[cfg(not(target_os = "linux"))]
fn current_ids() -> (u32, u32) {
    (0, 0)
}

/// Geometry used when writing a fresh FAT16 volume
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FormatOptions {
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub fat_count: u8,
    pub root_entries: u16,
    pub label: Option<String>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            bytes_per_sector: 512,
            sectors_per_cluster: 4,
            reserved_sectors: 1,
            fat_count: 2,
            root_entries: 512,
            label: None,
        }
    }
}

impl FormatOptions {
    pub fn from_json(json: &str) -> FatResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn cluster_size(&self) -> u32 {
        self.bytes_per_sector as u32 * self.sectors_per_cluster as u32
    }
}
