// File data operations: read, write, and truncate through a file's cluster chain
//
// Bytes past a file's size but inside its last cluster are always zero. Growing
// a file therefore never exposes stale data, and shrinking re-zeroes the tail.

use super::path_resolver::{path_is_root, DirSlot};
use super::Fat16Fs;
use crate::fat_common::{DirEntry, FatTimestamp, CLUSTER_END, CLUSTER_FREE};
use log::{debug, trace};
use sfat_core::{BlockDevice, FatError, FatResult};

impl<D: BlockDevice> Fat16Fs<D> {
    /// Look up a path that must name a regular file
    fn find_regular_file(&mut self, path: &str) -> FatResult<DirSlot> {
        if path_is_root(path) {
            return Err(FatError::IsADirectory("/".into()));
        }
        let slot = self.find_entry(path)?;
        if slot.entry.is_directory() {
            return Err(FatError::IsADirectory(path.to_string()));
        }
        Ok(slot)
    }

    /// Cluster holding byte `offset` of a chain, and the file offset where that cluster begins
    fn cluster_for_offset(&mut self, first_cluster: u16, offset: u64) -> FatResult<(u16, u64)> {
        if !self.meta.is_cluster_inuse(first_cluster) {
            return Err(FatError::Corrupted(format!(
                "File data starts at invalid cluster {}",
                first_cluster
            )));
        }
        let cluster_size = self.meta.cluster_size as u64;
        let mut cluster = first_cluster;
        let mut start = 0u64;
        while offset >= start + cluster_size {
            cluster = self.next_in_file(cluster)?;
            start += cluster_size;
        }
        Ok((cluster, start))
    }

    /// Next cluster of a chain that must continue
    fn next_in_file(&mut self, cluster: u16) -> FatResult<u16> {
        self.next_cluster(cluster)?.ok_or_else(|| {
            FatError::Corrupted(format!("Cluster chain ends at {} before the file does", cluster))
        })
    }

    /// Read `buf.len()` bytes starting `offset` bytes into a cluster
    pub fn read_from_cluster_at_offset(&mut self, cluster: u16, offset: usize, buf: &mut [u8]) -> FatResult<usize> {
        let sector_size = self.meta.sector_size as usize;
        let first_sector = self.meta.cluster_first_sector(cluster)?;
        let mut sector_buffer = self.sector_buffer();
        let mut done = 0;

        while done < buf.len() {
            let position = offset + done;
            let in_sector = position % sector_size;
            let len = (sector_size - in_sector).min(buf.len() - done);
            self.read_sector(first_sector + (position / sector_size) as u64, &mut sector_buffer)?;
            buf[done..done + len].copy_from_slice(&sector_buffer[in_sector..in_sector + len]);
            done += len;
        }
        Ok(done)
    }

    /// Write `data` starting `offset` bytes into a cluster. Whole sectors are
    /// written directly; partial sectors are read, patched, and written back.
    pub fn write_to_cluster_at_offset(&mut self, cluster: u16, offset: usize, data: &[u8]) -> FatResult<usize> {
        let sector_size = self.meta.sector_size as usize;
        let first_sector = self.meta.cluster_first_sector(cluster)?;
        let mut sector_buffer = self.sector_buffer();
        let mut done = 0;

        while done < data.len() {
            let position = offset + done;
            let sector = first_sector + (position / sector_size) as u64;
            let in_sector = position % sector_size;
            let len = (sector_size - in_sector).min(data.len() - done);

            if len == sector_size {
                self.write_sector(sector, &data[done..done + len])?;
            } else {
                self.read_sector(sector, &mut sector_buffer)?;
                sector_buffer[in_sector..in_sector + len].copy_from_slice(&data[done..done + len]);
                self.write_sector(sector, &sector_buffer)?;
            }
            done += len;
        }
        Ok(done)
    }

    /// Make the entry's chain long enough to hold `new_size` bytes. New clusters
    /// arrive zeroed. The entry is updated in memory only.
    pub fn reserve_clusters(&mut self, entry: &mut DirEntry, new_size: u64) -> FatResult<()> {
        let cluster_size = self.meta.cluster_size as u64;
        let needed = ((new_size + cluster_size - 1) / cluster_size) as usize;
        let first_cluster = entry.first_cluster();

        if first_cluster == CLUSTER_FREE {
            if needed > 0 {
                let head = self.alloc_clusters(needed)?;
                entry.set_first_cluster(head);
            }
            return Ok(());
        }

        let (tail, have) = self.chain_tail(first_cluster)?;
        if needed > have {
            trace!("Extending chain at {} from {} to {} clusters", first_cluster, have, needed);
            let head = self.alloc_clusters(needed - have)?;
            self.write_fat_entry(tail, head)?;
        }
        Ok(())
    }

    /// Read up to `buf.len()` bytes at `offset`; short at end of file
    pub fn read(&mut self, path: &str, offset: u64, buf: &mut [u8]) -> FatResult<usize> {
        debug!("read(path='{}', offset={}, size={})", path, offset, buf.len());
        let slot = self.find_regular_file(path)?;
        let file_size = slot.entry.file_size as u64;
        if offset > file_size {
            return Err(FatError::InvalidArgument(format!(
                "Offset {} beyond end of {} ({} bytes)",
                offset, path, file_size
            )));
        }

        let size = (buf.len() as u64).min(file_size - offset) as usize;
        if size == 0 {
            return Ok(0);
        }

        let cluster_size = self.meta.cluster_size as usize;
        let (mut cluster, start) = self.cluster_for_offset(slot.entry.first_cluster(), offset)?;
        let mut in_cluster = (offset - start) as usize;
        let mut done = 0;
        loop {
            let len = (cluster_size - in_cluster).min(size - done);
            self.read_from_cluster_at_offset(cluster, in_cluster, &mut buf[done..done + len])?;
            done += len;
            if done == size {
                break;
            }
            in_cluster = 0;
            cluster = self.next_in_file(cluster)?;
        }
        Ok(done)
    }

    /// Write `data` at `offset`, growing the file as needed. A gap between the
    /// old end of file and `offset` reads back as zeros.
    pub fn write(&mut self, path: &str, offset: u64, data: &[u8]) -> FatResult<usize> {
        debug!("write(path='{}', offset={}, size={})", path, offset, data.len());
        let mut slot = self.find_regular_file(path)?;
        if data.is_empty() {
            return Ok(0);
        }

        let end = match offset.checked_add(data.len() as u64) {
            Some(end) if end <= u32::MAX as u64 => end,
            _ => {
                return Err(FatError::FileTooLarge(format!(
                    "Write of {} bytes at offset {} to {}",
                    data.len(),
                    offset,
                    path
                )))
            }
        };
        let old_size = slot.entry.file_size as u64;
        if end > old_size {
            self.reserve_clusters(&mut slot.entry, end)?;
        }

        let cluster_size = self.meta.cluster_size as usize;
        let (mut cluster, start) = self.cluster_for_offset(slot.entry.first_cluster(), offset)?;
        let mut in_cluster = (offset - start) as usize;
        let mut done = 0;
        loop {
            let len = (cluster_size - in_cluster).min(data.len() - done);
            self.write_to_cluster_at_offset(cluster, in_cluster, &data[done..done + len])?;
            done += len;
            if done == data.len() {
                break;
            }
            in_cluster = 0;
            cluster = self.next_in_file(cluster)?;
        }

        slot.entry.file_size = old_size.max(end) as u32;
        stamp_modified(&mut slot.entry);
        self.dir_entry_write(&slot)?;
        Ok(done)
    }

    /// Set a file's size. Growing reserves zeroed clusters; shrinking zeroes the
    /// bytes past the new end in the last kept cluster and frees the rest.
    pub fn truncate(&mut self, path: &str, size: u64) -> FatResult<()> {
        debug!("truncate(path='{}', size={})", path, size);
        let mut slot = self.find_regular_file(path)?;
        if size > u32::MAX as u64 {
            return Err(FatError::FileTooLarge(format!(
                "Cannot truncate {} to {} bytes",
                path, size
            )));
        }

        let old_size = slot.entry.file_size as u64;
        if size == old_size {
            return Ok(());
        }
        if size > old_size {
            self.reserve_clusters(&mut slot.entry, size)?;
        } else {
            self.release_tail(&mut slot.entry, size)?;
        }

        slot.entry.file_size = size as u32;
        stamp_modified(&mut slot.entry);
        self.dir_entry_write(&slot)
    }

    /// Cut the entry's chain down to what `size` bytes need
    fn release_tail(&mut self, entry: &mut DirEntry, size: u64) -> FatResult<()> {
        let first_cluster = entry.first_cluster();
        if first_cluster == CLUSTER_FREE {
            return Ok(());
        }
        if size == 0 {
            self.free_clusters(first_cluster)?;
            entry.set_first_cluster(CLUSTER_FREE);
            return Ok(());
        }

        // The last kept cluster holds byte `size - 1`
        let (cluster, start) = self.cluster_for_offset(first_cluster, size - 1)?;
        let keep = (size - start) as usize;
        let cluster_size = self.meta.cluster_size as usize;
        if keep < cluster_size {
            let zeros = vec![0u8; cluster_size - keep];
            self.write_to_cluster_at_offset(cluster, keep, &zeros)?;
        }

        let next = self.read_fat_entry(cluster)?;
        self.write_fat_entry(cluster, CLUSTER_END)?;
        if self.meta.is_cluster_inuse(next) {
            self.free_clusters(next)?;
        }
        Ok(())
    }
}

fn stamp_modified(entry: &mut DirEntry) {
    let now = FatTimestamp::now();
    entry.write_date = now.date.0;
    entry.write_time = now.time.0;
}
