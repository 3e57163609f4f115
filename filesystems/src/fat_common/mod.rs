// On-disk building blocks shared by the FAT16 engine and its formatter

pub mod constants;
pub mod short_names;
pub mod structures;
pub mod timestamps;

pub use constants::*;
pub use short_names::{display_name, to_longname, to_shortname};
pub use structures::{BootSector, DirEntry, FatAttributes};
pub use timestamps::{FatDate, FatTime, FatTimestamp};

use std::time::SystemTime;

/// Generate a volume serial number from the current time
pub fn generate_volume_serial() -> u32 {
    match SystemTime::now().duration_since(SystemTime::UNIX_EPOCH) {
        Ok(duration) => (duration.as_secs() as u32).wrapping_add(duration.subsec_nanos()),
        Err(_) => 0x1234_5678,
    }
}

/// Convert a label to the 11-byte, space-padded boot sector form
pub fn format_volume_label(label: Option<&str>) -> [u8; 11] {
    let mut result = [0x20u8; 11];
    if let Some(label) = label {
        let label = label.to_ascii_uppercase();
        let bytes = label.as_bytes();
        let len = bytes.len().min(11);
        result[..len].copy_from_slice(&bytes[..len]);
    } else {
        result.copy_from_slice(b"NO NAME    ");
    }
    result
}
