// On-disk FAT structures and the FAT16 engine built on them
pub mod fat_common;
pub mod fat16;

#[cfg(test)]
pub mod test_helpers;

pub use fat16::{
    DirectoryListing, Fat16Formatter, Fat16Fs, Fat16Ops, FileAttributes, FilesystemInfo,
    VolumeMetadata,
};
pub use sfat_core::{BlockDevice, FatError, FatResult, FileDevice, FormatOptions, MemoryDevice, MountOptions};
