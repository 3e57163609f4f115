// FAT16 formatter
// Lays down an empty volume: boot sector, zeroed FAT copies with the two
// reserved entries set, and an empty root directory region.

use super::volume::VolumeMetadata;
use crate::fat_common::{
    format_volume_label, generate_volume_serial, BootSector, CLUSTER_END, DIR_ENTRY_SIZE,
    EXTENDED_BOOT_SIGNATURE, FAT16_ENTRY_SIZE, FAT16_MAX_CLUSTERS, FAT16_MIN_CLUSTERS, MEDIA_FIXED,
};
use byteorder::{ByteOrder, LittleEndian};
use log::{debug, info, warn};
use sfat_core::{BlockDevice, FatError, FatResult, FormatOptions};

pub struct Fat16Formatter;

impl Fat16Formatter {
    fn validate_options(options: &FormatOptions, device_sector_size: usize) -> FatResult<()> {
        if ![512u16, 1024, 2048, 4096].contains(&options.bytes_per_sector) {
            return Err(FatError::InvalidArgument(format!(
                "Bytes per sector must be 512, 1024, 2048 or 4096, got {}",
                options.bytes_per_sector
            )));
        }
        if options.bytes_per_sector as usize != device_sector_size {
            return Err(FatError::InvalidArgument(format!(
                "Bytes per sector {} does not match the device's {}-byte sectors",
                options.bytes_per_sector, device_sector_size
            )));
        }
        if options.sectors_per_cluster == 0 || !options.sectors_per_cluster.is_power_of_two() {
            return Err(FatError::InvalidArgument(format!(
                "Sectors per cluster must be a power of 2, got {}",
                options.sectors_per_cluster
            )));
        }
        if options.reserved_sectors == 0 {
            return Err(FatError::InvalidArgument("At least one reserved sector is required".into()));
        }
        if options.fat_count == 0 {
            return Err(FatError::InvalidArgument("At least one FAT is required".into()));
        }
        if options.root_entries == 0 {
            return Err(FatError::InvalidArgument("Root directory needs at least one entry".into()));
        }
        Ok(())
    }

    /// Work out the boot sector for a device of `total_sectors` sectors.
    /// The FAT size and the cluster count depend on each other, so iterate
    /// until the FAT is large enough for the clusters that remain.
    pub fn calculate_layout(total_sectors: u64, options: &FormatOptions) -> FatResult<BootSector> {
        if total_sectors > u32::MAX as u64 {
            return Err(FatError::InvalidArgument(format!(
                "Device of {} sectors is too large for FAT16",
                total_sectors
            )));
        }

        let bytes_per_sector = options.bytes_per_sector as u64;
        let sectors_per_cluster = options.sectors_per_cluster as u64;
        let root_sectors =
            (options.root_entries as u64 * DIR_ENTRY_SIZE as u64 + bytes_per_sector - 1) / bytes_per_sector;

        let mut sectors_per_fat = 1u64;
        let cluster_count = loop {
            let metadata_sectors =
                options.reserved_sectors as u64 + options.fat_count as u64 * sectors_per_fat + root_sectors;
            if metadata_sectors >= total_sectors {
                return Err(FatError::NoSpace(format!(
                    "Device of {} sectors cannot hold the FAT16 metadata ({} sectors)",
                    total_sectors, metadata_sectors
                )));
            }
            let clusters = (total_sectors - metadata_sectors) / sectors_per_cluster;
            let needed = ((clusters + 2) * FAT16_ENTRY_SIZE as u64 + bytes_per_sector - 1) / bytes_per_sector;
            if needed <= sectors_per_fat {
                break clusters;
            }
            sectors_per_fat = needed;
        };

        if cluster_count == 0 {
            return Err(FatError::NoSpace("Device too small for a single cluster".into()));
        }
        if cluster_count > FAT16_MAX_CLUSTERS as u64 || sectors_per_fat > u16::MAX as u64 {
            return Err(FatError::InvalidArgument(format!(
                "{} clusters exceed FAT16 limits; use larger clusters",
                cluster_count
            )));
        }
        if cluster_count < FAT16_MIN_CLUSTERS as u64 {
            warn!(
                "Only {} clusters; other implementations may read this volume as FAT12",
                cluster_count
            );
        }
        debug!(
            "FAT16 layout: {} sectors/FAT, {} root sectors, {} clusters",
            sectors_per_fat, root_sectors, cluster_count
        );

        let total = total_sectors as u32;
        Ok(BootSector {
            jump_boot: [0xEB, 0x3C, 0x90],
            oem_name: *b"MSWIN4.1",
            bytes_per_sector: options.bytes_per_sector,
            sectors_per_cluster: options.sectors_per_cluster,
            reserved_sectors: options.reserved_sectors,
            num_fats: options.fat_count,
            root_entries: options.root_entries,
            total_sectors_16: if total < 0x10000 { total as u16 } else { 0 },
            media_descriptor: MEDIA_FIXED,
            sectors_per_fat_16: sectors_per_fat as u16,
            sectors_per_track: 63,
            num_heads: 255,
            hidden_sectors: 0,
            total_sectors_32: if total < 0x10000 { 0 } else { total },
            drive_number: 0x80,
            boot_signature: EXTENDED_BOOT_SIGNATURE,
            volume_id: generate_volume_serial(),
            volume_label: format_volume_label(options.label.as_deref()),
            fs_type: *b"FAT16   ",
        })
    }

    /// Format the whole device. Only the metadata regions are written; the
    /// data region is left as is, since clusters are zeroed on allocation.
    pub fn format<D: BlockDevice>(device: &mut D, options: &FormatOptions) -> FatResult<VolumeMetadata> {
        Self::validate_options(options, device.sector_size())?;
        let boot_sector = Self::calculate_layout(device.sector_count(), options)?;
        let meta = VolumeMetadata::from_boot_sector(&boot_sector)?;

        info!("Formatting FAT16 volume '{}'", boot_sector.label());
        info!(
            "FAT16 parameters: {} sectors, {} sectors/cluster, {} sectors/FAT, {} root entries",
            meta.total_sectors, meta.sectors_per_cluster, meta.sectors_per_fat, meta.root_entries
        );

        let mut buffer = vec![0u8; meta.sector_size as usize];
        boot_sector.write_to(&mut buffer);
        device.write_sector(0, &buffer)?;

        let zeros = vec![0u8; meta.sector_size as usize];
        for sector in 1..meta.data_start {
            device.write_sector(sector, &zeros)?;
        }

        // Entry 0 carries the media byte, entry 1 the end-of-chain mark
        let mut first_fat_sector = vec![0u8; meta.sector_size as usize];
        LittleEndian::write_u16(&mut first_fat_sector[0..2], 0xFF00 | boot_sector.media_descriptor as u16);
        LittleEndian::write_u16(&mut first_fat_sector[2..4], CLUSTER_END);
        for copy in 0..meta.fat_count as u64 {
            device.write_sector(meta.fat_start + copy * meta.sectors_per_fat as u64, &first_fat_sector)?;
        }

        info!("FAT16 format completed: {} clusters of {} bytes", meta.cluster_count, meta.cluster_size);
        Ok(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fat16::Fat16Fs;
    use sfat_core::MemoryDevice;

    #[test]
    fn test_layout_fat_covers_clusters() {
        let options = FormatOptions::default();
        for total in [20_000u64, 32_768, 65_535, 65_536, 200_000] {
            let bs = Fat16Formatter::calculate_layout(total, &options).unwrap();
            let meta = VolumeMetadata::from_boot_sector(&bs).unwrap();
            assert_eq!(meta.total_sectors as u64, total);
            let capacity = meta.sectors_per_fat as u64 * 512 / 2;
            assert!(capacity >= meta.cluster_count as u64 + 2);
        }
    }

    #[test]
    fn test_total_sector_field_selection() {
        let options = FormatOptions::default();
        let small = Fat16Formatter::calculate_layout(65_535, &options).unwrap();
        assert_eq!((small.total_sectors_16, small.total_sectors_32), (65_535, 0));
        let large = Fat16Formatter::calculate_layout(65_536, &options).unwrap();
        assert_eq!((large.total_sectors_16, large.total_sectors_32), (0, 65_536));
    }

    #[test]
    fn test_format_writes_reserved_fat_entries() {
        let options = FormatOptions { label: Some("scratch".into()), ..FormatOptions::default() };
        let mut device = MemoryDevice::new(512, 32_768);
        let meta = Fat16Formatter::format(&mut device, &options).unwrap();

        let mut fs = Fat16Fs::mount(device).unwrap();
        assert_eq!(fs.metadata(), &meta);
        assert_eq!(fs.boot_sector().label(), "SCRATCH");
        assert_eq!(fs.read_fat_entry(0).unwrap(), 0xFFF8);
        assert_eq!(fs.read_fat_entry(1).unwrap(), 0xFFFF);
        assert!(fs.verify_fat_copies().unwrap().is_empty());
        assert_eq!(fs.free_cluster_count().unwrap(), meta.cluster_count);
        assert!(fs.readdir("/").unwrap().is_empty());
    }

    #[test]
    fn test_format_rejects_bad_options() {
        let mut device = MemoryDevice::new(512, 32_768);
        let odd = FormatOptions { sectors_per_cluster: 3, ..FormatOptions::default() };
        assert!(matches!(Fat16Formatter::format(&mut device, &odd), Err(FatError::InvalidArgument(_))));
        let mismatched = FormatOptions { bytes_per_sector: 1024, ..FormatOptions::default() };
        assert!(matches!(
            Fat16Formatter::format(&mut device, &mismatched),
            Err(FatError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_format_rejects_tiny_device() {
        let mut device = MemoryDevice::new(512, 30);
        let err = Fat16Formatter::format(&mut device, &FormatOptions::default()).unwrap_err();
        assert!(matches!(err, FatError::NoSpace(_)));
    }

    #[test]
    fn test_too_many_clusters_rejected() {
        let options = FormatOptions { sectors_per_cluster: 1, ..FormatOptions::default() };
        let err = Fat16Formatter::calculate_layout(200_000, &options).unwrap_err();
        assert!(matches!(err, FatError::InvalidArgument(_)));
    }
}
