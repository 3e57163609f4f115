// FAT16 on-disk constants

// Boot sector offsets
pub const BS_JMP_BOOT: usize = 0x00;
pub const BS_OEM_NAME: usize = 0x03;
pub const BPB_BYTES_PER_SEC: usize = 0x0B;
pub const BPB_SEC_PER_CLUS: usize = 0x0D;
pub const BPB_RSVD_SEC_CNT: usize = 0x0E;
pub const BPB_NUM_FATS: usize = 0x10;
pub const BPB_ROOT_ENT_CNT: usize = 0x11;
pub const BPB_TOT_SEC16: usize = 0x13;
pub const BPB_MEDIA: usize = 0x15;
pub const BPB_FAT_SZ16: usize = 0x16;
pub const BPB_SEC_PER_TRK: usize = 0x18;
pub const BPB_NUM_HEADS: usize = 0x1A;
pub const BPB_HIDD_SEC: usize = 0x1C;
pub const BPB_TOT_SEC32: usize = 0x20;

// FAT16 extended BPB (starts at 36)
pub const BS16_DRV_NUM: usize = 0x24;
pub const BS16_BOOT_SIG: usize = 0x26;
pub const BS16_VOL_ID: usize = 0x27;
pub const BS16_VOL_LAB: usize = 0x2B;
pub const BS16_FIL_SYS_TYPE: usize = 0x36;

// Boot sector signature
pub const BOOT_SIGNATURE: [u8; 2] = [0x55, 0xAA];
pub const BOOT_SIGNATURE_OFFSET: usize = 0x1FE;
pub const EXTENDED_BOOT_SIGNATURE: u8 = 0x29;
pub const BOOT_SECTOR_SIZE: usize = 512;

// FAT entry values
pub const CLUSTER_FREE: u16 = 0x0000;
pub const CLUSTER_MIN: u16 = 0x0002;
pub const CLUSTER_MAX: u16 = 0xFFEF;
pub const CLUSTER_BAD: u16 = 0xFFF7;
pub const CLUSTER_END_BOUND: u16 = 0xFFF8; // anything at or above ends a chain
pub const CLUSTER_END: u16 = 0xFFFF; // value written when terminating a chain
pub const FAT16_ENTRY_SIZE: usize = 2;

/// First-cluster value stored in `..` when the parent is the root directory
pub const ROOT_CLUSTER: u16 = 0;

// Cluster count thresholds
pub const FAT16_MIN_CLUSTERS: u32 = 4085;
pub const FAT16_MAX_CLUSTERS: u32 = 65524;

// Directory entries
pub const DIR_ENTRY_SIZE: usize = 32;
pub const FAT_NAME_LEN: usize = 11;
pub const FAT_NAME_BASE_LEN: usize = 8;
pub const FAT_NAME_EXT_LEN: usize = 3;
/// Longest name `to_longname` can produce: 8 + '.' + 3
pub const MAX_SHORT_NAME_LEN: usize = 12;

pub const NAME_FREE: u8 = 0x00;
pub const NAME_DELETED: u8 = 0xE5;
pub const NAME_ESCAPED_E5: u8 = 0x05;

pub const DOT_NAME: [u8; FAT_NAME_LEN] = *b".          ";
pub const DOTDOT_NAME: [u8; FAT_NAME_LEN] = *b"..         ";

// Media descriptors
pub const MEDIA_FIXED: u8 = 0xF8;
pub const MEDIA_REMOVABLE: u8 = 0xF0;

static_assertions::const_assert_eq!(FAT_NAME_BASE_LEN + FAT_NAME_EXT_LEN, FAT_NAME_LEN);
static_assertions::const_assert_eq!(BOOT_SECTOR_SIZE % DIR_ENTRY_SIZE, 0);
