// FAT16 engine - a mounted volume handle plus the operations layered on it
//
// Every operation goes through `Fat16Fs`, which owns the block device and the
// geometry read from the boot sector. Operations take `&mut self`; callers that
// share a volume across threads wrap it (see `Fat16Ops`).

pub mod attributes;
pub mod dir_entry;
pub mod fat_table;
pub mod file_ops;
pub mod formatter;
pub mod ops;
pub mod path_resolver;
pub mod volume;

pub use attributes::{DirectoryListing, FileAttributes, FilesystemInfo};
pub use formatter::Fat16Formatter;
pub use ops::Fat16Ops;
pub use path_resolver::{path_is_root, DirSlot, FindResult, Lookup, PathComponents};
pub use volume::{is_cluster_end, VolumeMetadata};

use crate::fat_common::{BootSector, BOOT_SECTOR_SIZE};
use log::info;
use sfat_core::{BlockDevice, FatError, FatResult, MountOptions};
use std::time::SystemTime;

pub struct Fat16Fs<D: BlockDevice> {
    device: D,
    boot_sector: BootSector,
    meta: VolumeMetadata,
    options: MountOptions,
    mounted_at: SystemTime,
}

impl<D: BlockDevice> Fat16Fs<D> {
    /// Mount with default ownership and permissions
    pub fn mount(device: D) -> FatResult<Self> {
        Self::mount_with_options(device, MountOptions::default())
    }

    /// Read and validate the boot sector, then derive the volume geometry
    pub fn mount_with_options(mut device: D, options: MountOptions) -> FatResult<Self> {
        let sector_size = device.sector_size();
        if sector_size < BOOT_SECTOR_SIZE {
            return Err(FatError::InvalidArgument(format!(
                "Device sector size {} is smaller than a boot sector",
                sector_size
            )));
        }

        let mut buffer = vec![0u8; sector_size];
        device.read_sector(0, &mut buffer)?;
        let boot_sector = BootSector::parse(&buffer)?;
        let meta = VolumeMetadata::from_boot_sector(&boot_sector)?;

        if meta.sector_size as usize != sector_size {
            return Err(FatError::InvalidArgument(format!(
                "Volume uses {}-byte sectors but the device reads {}-byte sectors",
                meta.sector_size, sector_size
            )));
        }
        let last_sector = meta.data_start
            + meta.cluster_count as u64 * meta.sectors_per_cluster as u64;
        if last_sector > device.sector_count() {
            return Err(FatError::Corrupted(format!(
                "Volume spans {} sectors but the device has only {}",
                last_sector,
                device.sector_count()
            )));
        }

        info!("Mounted FAT16 volume '{}'", boot_sector.label());
        info!("  Bytes per sector: {}", meta.sector_size);
        info!("  Sectors per cluster: {}", meta.sectors_per_cluster);
        info!("  FAT copies: {} x {} sectors", meta.fat_count, meta.sectors_per_fat);
        info!("  Root directory: {} entries at sector {}", meta.root_entries, meta.root_start);
        info!("  Data region: sector {}, {} clusters", meta.data_start, meta.cluster_count);

        Ok(Self {
            device,
            boot_sector,
            meta,
            options,
            mounted_at: SystemTime::now(),
        })
    }

    pub fn metadata(&self) -> &VolumeMetadata {
        &self.meta
    }

    pub fn boot_sector(&self) -> &BootSector {
        &self.boot_sector
    }

    pub fn options(&self) -> &MountOptions {
        &self.options
    }

    pub fn mounted_at(&self) -> SystemTime {
        self.mounted_at
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Unmount, handing the device back
    pub fn into_device(self) -> D {
        self.device
    }

    pub(crate) fn sector_buffer(&self) -> Vec<u8> {
        vec![0u8; self.meta.sector_size as usize]
    }

    pub(crate) fn read_sector(&mut self, sector: u64, buf: &mut [u8]) -> FatResult<()> {
        self.device.read_sector(sector, buf)
    }

    pub(crate) fn write_sector(&mut self, sector: u64, buf: &[u8]) -> FatResult<()> {
        self.device.write_sector(sector, buf)
    }
}
