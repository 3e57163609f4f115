pub mod config;
pub mod device;
pub mod error;

pub use config::{FormatOptions, MountOptions};
pub use device::{BlockDevice, FileDevice, MemoryDevice, SECTOR_SIZE};
pub use error::{FatError, FatResult};
