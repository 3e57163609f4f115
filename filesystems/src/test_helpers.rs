// Test helpers for filesystem testing

use crate::fat16::{Fat16Formatter, Fat16Fs};
use sfat_core::{FormatOptions, MemoryDevice, MountOptions};

/// Route `log` output through the test harness; safe to call from every test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One sector per cluster keeps cluster-boundary cases cheap to reach
pub fn small_format_options() -> FormatOptions {
    FormatOptions {
        sectors_per_cluster: 1,
        ..FormatOptions::default()
    }
}

/// An in-memory device of `sectors` 512-byte sectors, freshly formatted
pub fn formatted_device(sectors: u64, options: &FormatOptions) -> MemoryDevice {
    init_logging();
    let mut device = MemoryDevice::new(512, sectors);
    Fat16Formatter::format(&mut device, options).expect("format test volume");
    device
}

/// A mounted 4 MiB volume with 512-byte clusters
pub fn mounted_volume() -> Fat16Fs<MemoryDevice> {
    mounted_volume_with_options(MountOptions::default())
}

pub fn mounted_volume_with_options(options: MountOptions) -> Fat16Fs<MemoryDevice> {
    let device = formatted_device(8192, &small_format_options());
    Fat16Fs::mount_with_options(device, options).expect("mount test volume")
}
