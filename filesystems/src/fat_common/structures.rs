// FAT16 boot sector and directory entry structures
// Fields are decoded with explicit little-endian offsets rather than packed structs

use super::constants::*;
use byteorder::{ByteOrder, LittleEndian};
use sfat_core::{FatError, FatResult};
use std::fmt;

// ============================================================================
// Boot sector
// ============================================================================

/// FAT16 boot sector (BPB plus extended BPB)
#[derive(Clone, PartialEq, Eq)]
pub struct BootSector {
    pub jump_boot: [u8; 3],
    pub oem_name: [u8; 8],
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub num_fats: u8,
    pub root_entries: u16,
    pub total_sectors_16: u16,
    pub media_descriptor: u8,
    pub sectors_per_fat_16: u16,
    pub sectors_per_track: u16,
    pub num_heads: u16,
    pub hidden_sectors: u32,
    pub total_sectors_32: u32,
    pub drive_number: u8,
    pub boot_signature: u8,
    pub volume_id: u32,
    pub volume_label: [u8; 11],
    pub fs_type: [u8; 8],
}

impl BootSector {
    /// Decode the first 512 bytes of a volume
    pub fn parse(bytes: &[u8]) -> FatResult<Self> {
        if bytes.len() < BOOT_SECTOR_SIZE {
            return Err(FatError::Corrupted(format!(
                "Boot sector needs {} bytes, got {}",
                BOOT_SECTOR_SIZE,
                bytes.len()
            )));
        }
        if bytes[BOOT_SIGNATURE_OFFSET..BOOT_SIGNATURE_OFFSET + 2] != BOOT_SIGNATURE {
            return Err(FatError::Corrupted("Invalid FAT16 boot signature".into()));
        }

        let mut jump_boot = [0u8; 3];
        jump_boot.copy_from_slice(&bytes[BS_JMP_BOOT..BS_JMP_BOOT + 3]);
        let mut oem_name = [0u8; 8];
        oem_name.copy_from_slice(&bytes[BS_OEM_NAME..BS_OEM_NAME + 8]);
        let mut volume_label = [0u8; 11];
        volume_label.copy_from_slice(&bytes[BS16_VOL_LAB..BS16_VOL_LAB + 11]);
        let mut fs_type = [0u8; 8];
        fs_type.copy_from_slice(&bytes[BS16_FIL_SYS_TYPE..BS16_FIL_SYS_TYPE + 8]);

        Ok(Self {
            jump_boot,
            oem_name,
            bytes_per_sector: LittleEndian::read_u16(&bytes[BPB_BYTES_PER_SEC..]),
            sectors_per_cluster: bytes[BPB_SEC_PER_CLUS],
            reserved_sectors: LittleEndian::read_u16(&bytes[BPB_RSVD_SEC_CNT..]),
            num_fats: bytes[BPB_NUM_FATS],
            root_entries: LittleEndian::read_u16(&bytes[BPB_ROOT_ENT_CNT..]),
            total_sectors_16: LittleEndian::read_u16(&bytes[BPB_TOT_SEC16..]),
            media_descriptor: bytes[BPB_MEDIA],
            sectors_per_fat_16: LittleEndian::read_u16(&bytes[BPB_FAT_SZ16..]),
            sectors_per_track: LittleEndian::read_u16(&bytes[BPB_SEC_PER_TRK..]),
            num_heads: LittleEndian::read_u16(&bytes[BPB_NUM_HEADS..]),
            hidden_sectors: LittleEndian::read_u32(&bytes[BPB_HIDD_SEC..]),
            total_sectors_32: LittleEndian::read_u32(&bytes[BPB_TOT_SEC32..]),
            drive_number: bytes[BS16_DRV_NUM],
            boot_signature: bytes[BS16_BOOT_SIG],
            volume_id: LittleEndian::read_u32(&bytes[BS16_VOL_ID..]),
            volume_label,
            fs_type,
        })
    }

    /// Encode into a sector-sized buffer (boot code left zeroed)
    pub fn write_to(&self, sector: &mut [u8]) {
        sector[BS_JMP_BOOT..BS_JMP_BOOT + 3].copy_from_slice(&self.jump_boot);
        sector[BS_OEM_NAME..BS_OEM_NAME + 8].copy_from_slice(&self.oem_name);
        LittleEndian::write_u16(&mut sector[BPB_BYTES_PER_SEC..], self.bytes_per_sector);
        sector[BPB_SEC_PER_CLUS] = self.sectors_per_cluster;
        LittleEndian::write_u16(&mut sector[BPB_RSVD_SEC_CNT..], self.reserved_sectors);
        sector[BPB_NUM_FATS] = self.num_fats;
        LittleEndian::write_u16(&mut sector[BPB_ROOT_ENT_CNT..], self.root_entries);
        LittleEndian::write_u16(&mut sector[BPB_TOT_SEC16..], self.total_sectors_16);
        sector[BPB_MEDIA] = self.media_descriptor;
        LittleEndian::write_u16(&mut sector[BPB_FAT_SZ16..], self.sectors_per_fat_16);
        LittleEndian::write_u16(&mut sector[BPB_SEC_PER_TRK..], self.sectors_per_track);
        LittleEndian::write_u16(&mut sector[BPB_NUM_HEADS..], self.num_heads);
        LittleEndian::write_u32(&mut sector[BPB_HIDD_SEC..], self.hidden_sectors);
        LittleEndian::write_u32(&mut sector[BPB_TOT_SEC32..], self.total_sectors_32);
        sector[BS16_DRV_NUM] = self.drive_number;
        sector[BS16_BOOT_SIG] = self.boot_signature;
        LittleEndian::write_u32(&mut sector[BS16_VOL_ID..], self.volume_id);
        sector[BS16_VOL_LAB..BS16_VOL_LAB + 11].copy_from_slice(&self.volume_label);
        sector[BS16_FIL_SYS_TYPE..BS16_FIL_SYS_TYPE + 8].copy_from_slice(&self.fs_type);
        sector[BOOT_SIGNATURE_OFFSET..BOOT_SIGNATURE_OFFSET + 2].copy_from_slice(&BOOT_SIGNATURE);
    }

    /// Total sectors from whichever of the 16/32-bit fields is in use
    pub fn total_sectors(&self) -> u32 {
        if self.total_sectors_16 != 0 {
            self.total_sectors_16 as u32
        } else {
            self.total_sectors_32
        }
    }

    pub fn label(&self) -> String {
        String::from_utf8_lossy(&self.volume_label).trim_end().to_string()
    }
}

impl fmt::Debug for BootSector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootSector")
            .field("oem_name", &String::from_utf8_lossy(&self.oem_name))
            .field("bytes_per_sector", &self.bytes_per_sector)
            .field("sectors_per_cluster", &self.sectors_per_cluster)
            .field("reserved_sectors", &self.reserved_sectors)
            .field("num_fats", &self.num_fats)
            .field("root_entries", &self.root_entries)
            .field("total_sectors", &self.total_sectors())
            .field("sectors_per_fat", &self.sectors_per_fat_16)
            .field("volume_label", &self.label())
            .finish()
    }
}

// ============================================================================
// Directory entries
// ============================================================================

/// FAT directory entry attribute bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatAttributes(pub u8);

impl FatAttributes {
    pub const READ_ONLY: u8 = 0x01;
    pub const HIDDEN: u8 = 0x02;
    pub const SYSTEM: u8 = 0x04;
    pub const VOLUME_ID: u8 = 0x08;
    pub const DIRECTORY: u8 = 0x10;
    pub const ARCHIVE: u8 = 0x20;
    pub const LFN: u8 = 0x0F;
    /// Attribute given to newly created regular files
    pub const REGULAR: u8 = Self::ARCHIVE;

    pub fn is_read_only(&self) -> bool { self.0 & Self::READ_ONLY != 0 }
    pub fn is_volume_id(&self) -> bool { self.0 & Self::VOLUME_ID != 0 }
    pub fn is_directory(&self) -> bool { self.0 & Self::DIRECTORY != 0 }
    pub fn is_lfn(&self) -> bool { self.0 == Self::LFN }
}

/// FAT directory entry (32 bytes on disk)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirEntry {
    pub name: [u8; FAT_NAME_LEN],
    pub attributes: u8,
    pub nt_reserved: u8,
    pub creation_time_tenth: u8,
    pub creation_time: u16,
    pub creation_date: u16,
    pub last_access_date: u16,
    pub first_cluster_high: u16, // always 0 on FAT16
    pub write_time: u16,
    pub write_date: u16,
    pub first_cluster_low: u16,
    pub file_size: u32,
}

impl DirEntry {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut name = [0u8; FAT_NAME_LEN];
        name.copy_from_slice(&bytes[0..FAT_NAME_LEN]);
        Self {
            name,
            attributes: bytes[11],
            nt_reserved: bytes[12],
            creation_time_tenth: bytes[13],
            creation_time: LittleEndian::read_u16(&bytes[14..]),
            creation_date: LittleEndian::read_u16(&bytes[16..]),
            last_access_date: LittleEndian::read_u16(&bytes[18..]),
            first_cluster_high: LittleEndian::read_u16(&bytes[20..]),
            write_time: LittleEndian::read_u16(&bytes[22..]),
            write_date: LittleEndian::read_u16(&bytes[24..]),
            first_cluster_low: LittleEndian::read_u16(&bytes[26..]),
            file_size: LittleEndian::read_u32(&bytes[28..]),
        }
    }

    pub fn to_bytes(&self) -> [u8; DIR_ENTRY_SIZE] {
        let mut bytes = [0u8; DIR_ENTRY_SIZE];
        bytes[0..FAT_NAME_LEN].copy_from_slice(&self.name);
        bytes[11] = self.attributes;
        bytes[12] = self.nt_reserved;
        bytes[13] = self.creation_time_tenth;
        LittleEndian::write_u16(&mut bytes[14..], self.creation_time);
        LittleEndian::write_u16(&mut bytes[16..], self.creation_date);
        LittleEndian::write_u16(&mut bytes[18..], self.last_access_date);
        LittleEndian::write_u16(&mut bytes[20..], self.first_cluster_high);
        LittleEndian::write_u16(&mut bytes[22..], self.write_time);
        LittleEndian::write_u16(&mut bytes[24..], self.write_date);
        LittleEndian::write_u16(&mut bytes[26..], self.first_cluster_low);
        LittleEndian::write_u32(&mut bytes[28..], self.file_size);
        bytes
    }

    pub fn attributes(&self) -> FatAttributes {
        FatAttributes(self.attributes)
    }

    pub fn first_cluster(&self) -> u16 {
        self.first_cluster_low
    }

    pub fn set_first_cluster(&mut self, cluster: u16) {
        self.first_cluster_low = cluster;
        self.first_cluster_high = 0;
    }

    pub fn is_directory(&self) -> bool {
        self.attributes().is_directory()
    }

    pub fn is_lfn(&self) -> bool {
        self.attributes().is_lfn()
    }

    /// Never used; also marks the end of the used part of a directory
    pub fn is_free(&self) -> bool {
        self.name[0] == NAME_FREE
    }

    pub fn is_deleted(&self) -> bool {
        self.name[0] == NAME_DELETED
    }

    /// A live short-name entry (not free, not tombstoned, not LFN)
    pub fn is_valid(&self) -> bool {
        !self.is_lfn() && !self.is_free() && !self.is_deleted()
    }

    pub fn is_dot(&self) -> bool {
        !self.is_lfn() && (self.name == DOT_NAME || self.name == DOTDOT_NAME)
    }

    pub fn is_volume_label(&self) -> bool {
        !self.is_lfn() && self.attributes().is_volume_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_boot_sector() -> BootSector {
        BootSector {
            jump_boot: [0xEB, 0x3C, 0x90],
            oem_name: *b"SFAT    ",
            bytes_per_sector: 512,
            sectors_per_cluster: 4,
            reserved_sectors: 1,
            num_fats: 2,
            root_entries: 512,
            total_sectors_16: 20480,
            media_descriptor: MEDIA_FIXED,
            sectors_per_fat_16: 20,
            sectors_per_track: 63,
            num_heads: 255,
            hidden_sectors: 0,
            total_sectors_32: 0,
            drive_number: 0x80,
            boot_signature: EXTENDED_BOOT_SIGNATURE,
            volume_id: 0x1234_5678,
            volume_label: *b"TESTVOL    ",
            fs_type: *b"FAT16   ",
        }
    }

    #[test]
    fn test_boot_sector_field_offsets() {
        let mut sector = [0u8; 512];
        sample_boot_sector().write_to(&mut sector);

        assert_eq!(&sector[0x0B..0x0D], &512u16.to_le_bytes());
        assert_eq!(sector[0x0D], 4);
        assert_eq!(&sector[0x11..0x13], &512u16.to_le_bytes());
        assert_eq!(&sector[0x16..0x18], &20u16.to_le_bytes());
        assert_eq!(&sector[0x36..0x3E], b"FAT16   ");
        assert_eq!(&sector[510..512], &[0x55, 0xAA]);

        let parsed = BootSector::parse(&sector).unwrap();
        assert_eq!(parsed, sample_boot_sector());
        assert_eq!(parsed.total_sectors(), 20480);
        assert_eq!(parsed.label(), "TESTVOL");
    }

    #[test]
    fn test_boot_sector_32bit_total() {
        let mut bs = sample_boot_sector();
        bs.total_sectors_16 = 0;
        bs.total_sectors_32 = 200_000;
        assert_eq!(bs.total_sectors(), 200_000);
    }

    #[test]
    fn test_missing_signature_rejected() {
        let sector = [0u8; 512];
        assert!(matches!(BootSector::parse(&sector), Err(FatError::Corrupted(_))));
    }

    #[test]
    fn test_dir_entry_layout() {
        let entry = DirEntry {
            name: *b"README  TXT",
            attributes: FatAttributes::ARCHIVE,
            creation_time_tenth: 150,
            creation_time: 0x1111,
            creation_date: 0x2222,
            last_access_date: 0x3333,
            write_time: 0x4444,
            write_date: 0x5555,
            first_cluster_low: 0x0102,
            file_size: 5000,
            ..Default::default()
        };
        let bytes = entry.to_bytes();
        assert_eq!(&bytes[0..11], b"README  TXT");
        assert_eq!(bytes[11], 0x20);
        assert_eq!(bytes[13], 150);
        assert_eq!(&bytes[18..20], &[0x33, 0x33]);
        assert_eq!(&bytes[20..22], &[0, 0]);
        assert_eq!(&bytes[26..28], &[0x02, 0x01]);
        assert_eq!(&bytes[28..32], &5000u32.to_le_bytes());
        assert_eq!(DirEntry::from_bytes(&bytes), entry);
    }

    #[test]
    fn test_entry_classification() {
        let mut entry = DirEntry { name: *b"FILE       ", ..Default::default() };
        assert!(entry.is_valid());

        entry.name[0] = NAME_DELETED;
        assert!(entry.is_deleted() && !entry.is_valid());

        let free = DirEntry::default();
        assert!(free.is_free());

        let lfn = DirEntry { name: [0x41; 11], attributes: FatAttributes::LFN, ..Default::default() };
        assert!(lfn.is_lfn() && !lfn.is_valid() && !lfn.is_volume_label());

        let dot = DirEntry { name: DOTDOT_NAME, attributes: FatAttributes::DIRECTORY, ..Default::default() };
        assert!(dot.is_dot() && dot.is_directory());
    }
}
