// Block device collaborator: whole-sector reads and writes only.
// Every multi-sector operation in the engine is built from these two calls.

use crate::{FatError, FatResult};
use log::trace;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

pub const SECTOR_SIZE: usize = 512;

pub trait BlockDevice {
    /// Size of one physical sector in bytes
    fn sector_size(&self) -> usize {
        SECTOR_SIZE
    }

    /// Number of addressable sectors
    fn sector_count(&self) -> u64;

    /// Read exactly one sector into `buf` (`buf.len() == sector_size()`)
    fn read_sector(&mut self, sector: u64, buf: &mut [u8]) -> FatResult<()>;

    /// Write exactly one sector from `buf` (`buf.len() == sector_size()`)
    fn write_sector(&mut self, sector: u64, buf: &[u8]) -> FatResult<()>;
}

impl<T: BlockDevice + ?Sized> BlockDevice for &mut T {
    fn sector_size(&self) -> usize {
        (**self).sector_size()
    }

    fn sector_count(&self) -> u64 {
        (**self).sector_count()
    }

    fn read_sector(&mut self, sector: u64, buf: &mut [u8]) -> FatResult<()> {
        (**self).read_sector(sector, buf)
    }

    fn write_sector(&mut self, sector: u64, buf: &[u8]) -> FatResult<()> {
        (**self).write_sector(sector, buf)
    }
}

impl<T: BlockDevice + ?Sized> BlockDevice for Box<T> {
    fn sector_size(&self) -> usize {
        (**self).sector_size()
    }

    fn sector_count(&self) -> u64 {
        (**self).sector_count()
    }

    fn read_sector(&mut self, sector: u64, buf: &mut [u8]) -> FatResult<()> {
        (**self).read_sector(sector, buf)
    }

    fn write_sector(&mut self, sector: u64, buf: &[u8]) -> FatResult<()> {
        (**self).write_sector(sector, buf)
    }
}

fn check_request(sector: u64, len: usize, sector_size: usize, sector_count: u64) -> FatResult<()> {
    if len != sector_size {
        return Err(FatError::InvalidArgument(format!(
            "Sector buffer is {} bytes, device sector is {} bytes",
            len, sector_size
        )));
    }
    if sector >= sector_count {
        return Err(FatError::IoError(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("Sector {} beyond end of device ({} sectors)", sector, sector_count),
        )));
    }
    Ok(())
}

/// Block device backed by an image file (or a raw device node)
pub struct FileDevice {
    file: File,
    sector_size: usize,
    sector_count: u64,
}

impl FileDevice {
    /// Open an existing image for read/write with 512-byte sectors
    pub fn open<P: AsRef<Path>>(path: P) -> FatResult<Self> {
        Self::open_with_sector_size(path, SECTOR_SIZE)
    }

    pub fn open_with_sector_size<P: AsRef<Path>>(path: P, sector_size: usize) -> FatResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;
        let len = file.metadata()?.len();
        Ok(Self {
            file,
            sector_size,
            sector_count: len / sector_size as u64,
        })
    }

    /// Create (or resize) an image file of `sector_count` zeroed sectors
    pub fn create<P: AsRef<Path>>(path: P, sector_size: usize, sector_count: u64) -> FatResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;
        file.set_len(sector_count * sector_size as u64)?;
        Ok(Self {
            file,
            sector_size,
            sector_count,
        })
    }

    /// Flush pending writes to the underlying file
    pub fn sync(&mut self) -> FatResult<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }
}

impl BlockDevice for FileDevice {
    fn sector_size(&self) -> usize {
        self.sector_size
    }

    fn sector_count(&self) -> u64 {
        self.sector_count
    }

    fn read_sector(&mut self, sector: u64, buf: &mut [u8]) -> FatResult<()> {
        check_request(sector, buf.len(), self.sector_size, self.sector_count)?;
        trace!("read sector {}", sector);
        self.file.seek(SeekFrom::Start(sector * self.sector_size as u64))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_sector(&mut self, sector: u64, buf: &[u8]) -> FatResult<()> {
        check_request(sector, buf.len(), self.sector_size, self.sector_count)?;
        trace!("write sector {}", sector);
        self.file.seek(SeekFrom::Start(sector * self.sector_size as u64))?;
        self.file.write_all(buf)?;
        Ok(())
    }
}

/// In-memory block device, used for hermetic tests and scratch volumes
#[derive(Debug, Clone)]
pub struct MemoryDevice {
    data: Vec<u8>,
    sector_size: usize,
}

impl MemoryDevice {
    pub fn new(sector_size: usize, sector_count: u64) -> Self {
        Self {
            data: vec![0u8; sector_size * sector_count as usize],
            sector_size,
        }
    }

    /// Wrap an existing image; trailing bytes that do not fill a sector are ignored
    pub fn from_bytes(data: Vec<u8>, sector_size: usize) -> Self {
        Self { data, sector_size }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl BlockDevice for MemoryDevice {
    fn sector_size(&self) -> usize {
        self.sector_size
    }

    fn sector_count(&self) -> u64 {
        (self.data.len() / self.sector_size) as u64
    }

    fn read_sector(&mut self, sector: u64, buf: &mut [u8]) -> FatResult<()> {
        check_request(sector, buf.len(), self.sector_size, self.sector_count())?;
        let start = sector as usize * self.sector_size;
        buf.copy_from_slice(&self.data[start..start + self.sector_size]);
        Ok(())
    }

    fn write_sector(&mut self, sector: u64, buf: &[u8]) -> FatResult<()> {
        check_request(sector, buf.len(), self.sector_size, self.sector_count())?;
        let start = sector as usize * self.sector_size;
        self.data[start..start + self.sector_size].copy_from_slice(buf);
        Ok(())
    }
}
