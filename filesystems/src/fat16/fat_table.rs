// FAT table access: entry reads, replicated entry writes, and cluster chains
//
// Writes go to every FAT copy in turn. A device failure between copies leaves
// them disagreeing; `verify_fat_copies` reports which sectors diverged.

use super::volume::is_cluster_end;
use super::Fat16Fs;
use crate::fat_common::{CLUSTER_END, CLUSTER_FREE, CLUSTER_MIN};
use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace};
use sfat_core::{BlockDevice, FatError, FatResult};

impl<D: BlockDevice> Fat16Fs<D> {
    /// Read a cluster's entry from the first FAT copy
    pub fn read_fat_entry(&mut self, cluster: u16) -> FatResult<u16> {
        let (sector, offset) = self.meta.fat_entry_location(cluster, 0);
        let mut buffer = self.sector_buffer();
        self.read_sector(sector, &mut buffer)?;
        let value = LittleEndian::read_u16(&buffer[offset..offset + 2]);
        trace!("FAT[{}] = {:#06x}", cluster, value);
        Ok(value)
    }

    /// Write a cluster's entry into every FAT copy
    pub fn write_fat_entry(&mut self, cluster: u16, value: u16) -> FatResult<()> {
        trace!("FAT[{}] <- {:#06x}", cluster, value);
        let mut buffer = self.sector_buffer();
        for copy in 0..self.meta.fat_count {
            let (sector, offset) = self.meta.fat_entry_location(cluster, copy);
            self.read_sector(sector, &mut buffer)?;
            LittleEndian::write_u16(&mut buffer[offset..offset + 2], value);
            self.write_sector(sector, &buffer)?;
        }
        Ok(())
    }

    /// Follow one link. `None` at the end of the chain; a link to a free,
    /// bad, or out-of-range cluster means the chain is damaged.
    pub fn next_cluster(&mut self, cluster: u16) -> FatResult<Option<u16>> {
        let value = self.read_fat_entry(cluster)?;
        if is_cluster_end(value) {
            Ok(None)
        } else if self.meta.is_cluster_inuse(value) {
            Ok(Some(value))
        } else {
            Err(FatError::Corrupted(format!(
                "Cluster {} links to invalid value {:#06x}",
                cluster, value
            )))
        }
    }

    /// Every cluster of the chain starting at `head`, in order
    pub fn cluster_chain(&mut self, head: u16) -> FatResult<Vec<u16>> {
        if head == CLUSTER_FREE {
            return Ok(Vec::new());
        }
        if !self.meta.is_cluster_inuse(head) {
            return Err(FatError::Corrupted(format!("Chain starts at invalid cluster {}", head)));
        }

        let mut chain = vec![head];
        let mut current = head;
        while let Some(next) = self.next_cluster(current)? {
            if chain.len() > self.meta.cluster_count as usize {
                return Err(FatError::Corrupted(format!("Cluster chain from {} loops", head)));
            }
            chain.push(next);
            current = next;
        }
        Ok(chain)
    }

    /// Last cluster of a chain and the chain's length
    pub fn chain_tail(&mut self, head: u16) -> FatResult<(u16, usize)> {
        let chain = self.cluster_chain(head)?;
        match chain.last() {
            Some(&tail) => Ok((tail, chain.len())),
            None => Err(FatError::Corrupted("Empty cluster chain has no tail".into())),
        }
    }

    /// Zero every sector of a data cluster
    pub fn cluster_clear(&mut self, cluster: u16) -> FatResult<()> {
        let first = self.meta.cluster_first_sector(cluster)?;
        let zeros = self.sector_buffer();
        for sector in first..first + self.meta.sectors_per_cluster as u64 {
            self.write_sector(sector, &zeros)?;
        }
        Ok(())
    }

    /// Allocate `count` free clusters (lowest numbers first), zero them, and
    /// link them into one terminated chain. Returns the head.
    pub fn alloc_clusters(&mut self, count: usize) -> FatResult<u16> {
        if count == 0 {
            return Err(FatError::InvalidArgument("Cannot allocate zero clusters".into()));
        }

        let mut found = Vec::with_capacity(count);
        for cluster in CLUSTER_MIN..=self.meta.max_cluster() {
            if self.read_fat_entry(cluster)? == CLUSTER_FREE {
                found.push(cluster);
                if found.len() == count {
                    break;
                }
            }
        }
        if found.len() < count {
            return Err(FatError::NoSpace(format!(
                "Need {} clusters but only {} are free",
                count,
                found.len()
            )));
        }

        for &cluster in &found {
            self.cluster_clear(cluster)?;
        }
        for (i, &cluster) in found.iter().enumerate() {
            let next = found.get(i + 1).copied().unwrap_or(CLUSTER_END);
            self.write_fat_entry(cluster, next)?;
        }

        debug!("Allocated {} cluster(s) starting at {}", count, found[0]);
        Ok(found[0])
    }

    /// Return every cluster of the chain to the free pool. Returns the number freed.
    /// A damaged chain is reported before any entry is cleared.
    pub fn free_clusters(&mut self, head: u16) -> FatResult<u32> {
        if !self.meta.is_cluster_inuse(head) {
            return Ok(0);
        }
        let chain = self.cluster_chain(head)?;
        for &cluster in &chain {
            self.write_fat_entry(cluster, CLUSTER_FREE)?;
        }
        debug!("Freed {} cluster(s) starting at {}", chain.len(), head);
        Ok(chain.len() as u32)
    }

    /// Count free entries in the first FAT copy
    pub fn free_cluster_count(&mut self) -> FatResult<u32> {
        let max_cluster = self.meta.max_cluster() as u64;
        let per_sector = self.meta.fat_entries_per_sector() as u64;
        let mut buffer = self.sector_buffer();
        let mut free = 0u32;

        for fat_sector in 0..self.meta.sectors_per_fat as u64 {
            let first_cluster = fat_sector * per_sector;
            if first_cluster > max_cluster {
                break;
            }
            self.read_sector(self.meta.fat_start + fat_sector, &mut buffer)?;
            for index in 0..per_sector {
                let cluster = first_cluster + index;
                if cluster < CLUSTER_MIN as u64 || cluster > max_cluster {
                    continue;
                }
                let offset = index as usize * 2;
                if LittleEndian::read_u16(&buffer[offset..offset + 2]) == CLUSTER_FREE {
                    free += 1;
                }
            }
        }
        Ok(free)
    }

    /// Compare every FAT copy against the first. Returns the FAT-relative
    /// sector indices where any copy differs.
    pub fn verify_fat_copies(&mut self) -> FatResult<Vec<u64>> {
        let spf = self.meta.sectors_per_fat as u64;
        let mut primary = self.sector_buffer();
        let mut mirror = self.sector_buffer();
        let mut mismatched = Vec::new();

        for index in 0..spf {
            self.read_sector(self.meta.fat_start + index, &mut primary)?;
            for copy in 1..self.meta.fat_count as u64 {
                self.read_sector(self.meta.fat_start + copy * spf + index, &mut mirror)?;
                if primary != mirror {
                    mismatched.push(index);
                    break;
                }
            }
        }
        if !mismatched.is_empty() {
            debug!("FAT copies differ in {} sector(s)", mismatched.len());
        }
        Ok(mismatched)
    }
}
