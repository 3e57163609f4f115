// FAT16 entry points for a mount adapter
//
// Each call locks the volume, runs one engine operation, and reports success
// as zero (or a byte count) and failure as a negative errno.

use super::attributes::FileAttributes;
use super::Fat16Fs;
use log::{debug, info, warn};
use sfat_core::{BlockDevice, FatResult, MountOptions};
use std::sync::Mutex;
use std::time::SystemTime;

pub struct Fat16Ops<D: BlockDevice> {
    volume: Mutex<Option<Fat16Fs<D>>>,
    options: MountOptions,
}

impl<D: BlockDevice> Fat16Ops<D> {
    pub fn new(options: MountOptions) -> Self {
        Fat16Ops {
            volume: Mutex::new(None),
            options,
        }
    }

    /// Run one operation under the volume lock
    fn with_volume<T>(&self, op: &str, f: impl FnOnce(&mut Fat16Fs<D>) -> FatResult<T>) -> Result<T, i32> {
        let mut guard = self.volume.lock().unwrap_or_else(|e| e.into_inner());
        let fs = match guard.as_mut() {
            Some(fs) => fs,
            None => {
                warn!("{} called before init", op);
                return Err(-libc::EIO);
            }
        };
        f(fs).map_err(|e| {
            debug!("{} failed: {}", op, e);
            e.to_negative_errno()
        })
    }

    fn status(result: Result<(), i32>) -> i32 {
        match result {
            Ok(()) => 0,
            Err(code) => code,
        }
    }

    fn count(result: Result<usize, i32>) -> isize {
        match result {
            Ok(n) => n as isize,
            Err(code) => code as isize,
        }
    }

    /// Mount the device. A previously mounted volume is dropped.
    pub fn init(&self, device: D) -> i32 {
        match Fat16Fs::mount_with_options(device, self.options.clone()) {
            Ok(fs) => {
                info!("FAT16 volume ready");
                *self.volume.lock().unwrap_or_else(|e| e.into_inner()) = Some(fs);
                0
            }
            Err(e) => {
                warn!("FAT16 mount failed: {}", e);
                e.to_negative_errno()
            }
        }
    }

    /// Unmount, handing the device back
    pub fn destroy(&self) -> Option<D> {
        let fs = self.volume.lock().unwrap_or_else(|e| e.into_inner()).take();
        fs.map(Fat16Fs::into_device)
    }

    pub fn getattr(&self, path: &str, attributes: &mut FileAttributes) -> i32 {
        Self::status(self.with_volume("getattr", |fs| {
            *attributes = fs.getattr(path)?;
            Ok(())
        }))
    }

    /// Feed every name in a directory to `filler`; stops early when it returns true
    pub fn readdir(&self, path: &str, filler: &mut dyn FnMut(&str, &FileAttributes) -> bool) -> i32 {
        Self::status(self.with_volume("readdir", |fs| {
            for listing in fs.readdir(path)? {
                if filler(&listing.name, &listing.attributes) {
                    break;
                }
            }
            Ok(())
        }))
    }

    pub fn read(&self, path: &str, buf: &mut [u8], offset: u64) -> isize {
        Self::count(self.with_volume("read", |fs| fs.read(path, offset, buf)))
    }

    pub fn write(&self, path: &str, data: &[u8], offset: u64) -> isize {
        Self::count(self.with_volume("write", |fs| fs.write(path, offset, data)))
    }

    pub fn mknod(&self, path: &str) -> i32 {
        Self::status(self.with_volume("mknod", |fs| fs.mknod(path)))
    }

    pub fn unlink(&self, path: &str) -> i32 {
        Self::status(self.with_volume("unlink", |fs| fs.unlink(path)))
    }

    pub fn utimens(&self, path: &str, accessed: SystemTime, modified: SystemTime) -> i32 {
        Self::status(self.with_volume("utimens", |fs| fs.utimens(path, accessed, modified)))
    }

    pub fn mkdir(&self, path: &str) -> i32 {
        Self::status(self.with_volume("mkdir", |fs| fs.mkdir(path)))
    }

    pub fn rmdir(&self, path: &str) -> i32 {
        Self::status(self.with_volume("rmdir", |fs| fs.rmdir(path)))
    }

    pub fn truncate(&self, path: &str, size: u64) -> i32 {
        Self::status(self.with_volume("truncate", |fs| fs.truncate(path, size)))
    }
}
