// FAT16 volume geometry and cluster/sector address translation

use crate::fat_common::{
    BootSector, CLUSTER_END_BOUND, CLUSTER_MAX, CLUSTER_MIN, DIR_ENTRY_SIZE, FAT16_ENTRY_SIZE,
    FAT16_MAX_CLUSTERS, FAT16_MIN_CLUSTERS,
};
use log::warn;
use serde::Serialize;
use sfat_core::{FatError, FatResult};

/// Geometry derived once from the boot sector; never changes while mounted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeMetadata {
    pub sector_size: u32,
    pub sectors_per_cluster: u32,
    pub reserved_sectors: u32,
    pub fat_count: u32,
    pub root_entries: u32,
    pub total_sectors: u32,
    pub sectors_per_fat: u32,

    pub fat_start: u64,
    pub root_start: u64,
    pub root_sectors: u64,
    pub data_start: u64,
    pub cluster_count: u32,
    pub cluster_size: u32,
}

impl VolumeMetadata {
    pub fn from_boot_sector(bs: &BootSector) -> FatResult<Self> {
        let sector_size = bs.bytes_per_sector as u32;
        let sectors_per_cluster = bs.sectors_per_cluster as u32;
        let reserved_sectors = bs.reserved_sectors as u32;
        let fat_count = bs.num_fats as u32;
        let root_entries = bs.root_entries as u32;
        let total_sectors = bs.total_sectors();
        let sectors_per_fat = bs.sectors_per_fat_16 as u32;

        if ![512, 1024, 2048, 4096].contains(&sector_size) {
            return Err(FatError::Corrupted(format!("Invalid bytes per sector: {}", sector_size)));
        }
        if sectors_per_cluster == 0 || !sectors_per_cluster.is_power_of_two() {
            return Err(FatError::Corrupted(format!(
                "Sectors per cluster not a power of 2: {}",
                sectors_per_cluster
            )));
        }
        if fat_count == 0 {
            return Err(FatError::Corrupted("Number of FATs cannot be 0".into()));
        }
        if sectors_per_fat == 0 {
            return Err(FatError::Corrupted("Sectors per FAT is 0 (not a FAT16 volume)".into()));
        }

        let fat_start = reserved_sectors as u64;
        let root_start = fat_start + fat_count as u64 * sectors_per_fat as u64;
        let root_sectors =
            (root_entries as u64 * DIR_ENTRY_SIZE as u64 + sector_size as u64 - 1) / sector_size as u64;
        let data_start = root_start + root_sectors;

        if total_sectors as u64 <= data_start {
            return Err(FatError::Corrupted(format!(
                "Volume of {} sectors has no data region (data starts at sector {})",
                total_sectors, data_start
            )));
        }

        let cluster_count = ((total_sectors as u64 - data_start) / sectors_per_cluster as u64) as u32;
        if cluster_count == 0 {
            return Err(FatError::Corrupted("Data region holds no complete cluster".into()));
        }
        if cluster_count > FAT16_MAX_CLUSTERS {
            return Err(FatError::Corrupted(format!(
                "Not a FAT16 filesystem ({} clusters)",
                cluster_count
            )));
        }
        let fat_capacity = sectors_per_fat as u64 * sector_size as u64 / FAT16_ENTRY_SIZE as u64;
        if fat_capacity < cluster_count as u64 + 2 {
            return Err(FatError::Corrupted(format!(
                "FAT holds {} entries but the volume has {} clusters",
                fat_capacity, cluster_count
            )));
        }
        if cluster_count < FAT16_MIN_CLUSTERS {
            warn!(
                "Volume has only {} clusters; other implementations may read it as FAT12",
                cluster_count
            );
        }

        Ok(Self {
            sector_size,
            sectors_per_cluster,
            reserved_sectors,
            fat_count,
            root_entries,
            total_sectors,
            sectors_per_fat,
            fat_start,
            root_start,
            root_sectors,
            data_start,
            cluster_count,
            cluster_size: sector_size * sectors_per_cluster,
        })
    }

    /// FAT entries stored in one sector
    pub fn fat_entries_per_sector(&self) -> u32 {
        self.sector_size / FAT16_ENTRY_SIZE as u32
    }

    /// Directory entries stored in one sector
    pub fn dir_entries_per_sector(&self) -> usize {
        self.sector_size as usize / DIR_ENTRY_SIZE
    }

    /// Highest cluster number backed by the data region
    pub fn max_cluster(&self) -> u16 {
        (self.cluster_count + 1).min(CLUSTER_MAX as u32) as u16
    }

    /// Cluster numbers a chain may legitimately contain
    pub fn is_cluster_inuse(&self, cluster: u16) -> bool {
        (CLUSTER_MIN..=self.max_cluster()).contains(&cluster)
    }

    /// First sector of a data cluster
    pub fn cluster_first_sector(&self, cluster: u16) -> FatResult<u64> {
        if !self.is_cluster_inuse(cluster) {
            return Err(FatError::Corrupted(format!(
                "Cluster {} outside the data region (2..={})",
                cluster,
                self.max_cluster()
            )));
        }
        Ok(self.data_start + (cluster as u64 - 2) * self.sectors_per_cluster as u64)
    }

    /// Cluster containing a sector, or 0 for sectors before the data region
    pub fn sector_to_cluster(&self, sector: u64) -> u16 {
        if sector < self.data_start {
            return 0;
        }
        (2 + (sector - self.data_start) / self.sectors_per_cluster as u64) as u16
    }

    /// Sector and byte offset of a cluster's entry inside FAT copy `copy`
    pub fn fat_entry_location(&self, cluster: u16, copy: u32) -> (u64, usize) {
        let byte_offset = cluster as u64 * FAT16_ENTRY_SIZE as u64;
        let sector = self.fat_start
            + copy as u64 * self.sectors_per_fat as u64
            + byte_offset / self.sector_size as u64;
        (sector, (byte_offset % self.sector_size as u64) as usize)
    }

    pub fn total_data_bytes(&self) -> u64 {
        self.cluster_count as u64 * self.cluster_size as u64
    }
}

/// Whether a FAT value terminates a chain
pub fn is_cluster_end(value: u16) -> bool {
    value >= CLUSTER_END_BOUND
}
