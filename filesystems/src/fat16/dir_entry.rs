// Directory entry mutation: create, remove, and restamp entries

use super::path_resolver::{path_is_root, DirSlot};
use super::Fat16Fs;
use crate::fat_common::{
    to_shortname, DirEntry, FatAttributes, FatTimestamp, DIR_ENTRY_SIZE, DOTDOT_NAME, DOT_NAME,
    FAT_NAME_LEN, NAME_DELETED, ROOT_CLUSTER,
};
use log::debug;
use sfat_core::{BlockDevice, FatError, FatResult};
use std::time::SystemTime;

impl<D: BlockDevice> Fat16Fs<D> {
    /// Write one slot back into its sector
    pub fn dir_entry_write(&mut self, slot: &DirSlot) -> FatResult<()> {
        let mut buffer = self.sector_buffer();
        self.read_sector(slot.sector, &mut buffer)?;
        buffer[slot.offset..slot.offset + DIR_ENTRY_SIZE].copy_from_slice(&slot.entry.to_bytes());
        self.write_sector(slot.sector, &buffer)
    }

    /// Fill a free slot with a new entry stamped with the current time
    pub fn dir_entry_create(
        &mut self,
        slot: DirSlot,
        name: [u8; FAT_NAME_LEN],
        attributes: u8,
        first_cluster: u16,
        size: u32,
    ) -> FatResult<DirSlot> {
        let now = FatTimestamp::now();
        let mut entry = DirEntry {
            name,
            attributes,
            creation_time_tenth: now.tenths,
            creation_time: now.time.0,
            creation_date: now.date.0,
            last_access_date: now.date.0,
            write_time: now.time.0,
            write_date: now.date.0,
            file_size: size,
            ..DirEntry::default()
        };
        entry.set_first_cluster(first_cluster);

        let created = DirSlot::new(slot.sector, slot.offset, entry);
        self.dir_entry_write(&created)?;
        Ok(created)
    }

    /// Live entries of a directory in on-disk order, dot entries included.
    /// Long-name fragments, tombstones, and volume labels are skipped.
    pub(crate) fn directory_entries(&mut self, dir_cluster: u16) -> FatResult<Vec<DirSlot>> {
        let mut entries = Vec::new();
        for extent in self.directory_extents(dir_cluster)? {
            let ended = self.scan_extent(extent, |slot| {
                if slot.entry.is_free() {
                    return Some(());
                }
                if slot.entry.is_valid() && !slot.entry.is_volume_label() {
                    entries.push(slot);
                }
                None
            })?;
            if ended.is_some() {
                break;
            }
        }
        Ok(entries)
    }

    /// Append one zeroed cluster to a subdirectory; returns its first slot
    pub(crate) fn extend_directory(&mut self, dir_cluster: u16) -> FatResult<DirSlot> {
        let (tail, _) = self.chain_tail(dir_cluster)?;
        let cluster = self.alloc_clusters(1)?;
        self.write_fat_entry(tail, cluster)?;
        debug!("Directory at cluster {} grew by cluster {}", dir_cluster, cluster);
        Ok(DirSlot::vacant(self.meta.cluster_first_sector(cluster)?, 0))
    }

    /// Free slot, encoded name, and parent cluster for a path about to be created
    fn creation_slot(&mut self, path: &str) -> FatResult<(DirSlot, [u8; FAT_NAME_LEN], u16)> {
        let (slot, component, parent) = self.find_empty_slot(path)?;
        let name = to_shortname(component)?;
        if name == DOT_NAME || name == DOTDOT_NAME {
            return Err(FatError::AlreadyExists(path.to_string()));
        }
        Ok((slot, name, parent))
    }

    /// Create an empty regular file
    pub fn mknod(&mut self, path: &str) -> FatResult<()> {
        debug!("mknod(path='{}')", path);
        let (slot, name, _) = self.creation_slot(path)?;
        self.dir_entry_create(slot, name, FatAttributes::REGULAR, 0, 0)?;
        Ok(())
    }

    /// Remove a regular file and release its clusters
    pub fn unlink(&mut self, path: &str) -> FatResult<()> {
        debug!("unlink(path='{}')", path);
        if path_is_root(path) {
            return Err(FatError::IsADirectory("/".into()));
        }
        let mut slot = self.find_entry(path)?;
        if slot.entry.is_directory() {
            return Err(FatError::IsADirectory(path.to_string()));
        }

        let first_cluster = slot.entry.first_cluster();
        if self.meta.is_cluster_inuse(first_cluster) {
            self.free_clusters(first_cluster)?;
        }
        slot.entry.name[0] = NAME_DELETED;
        self.dir_entry_write(&slot)
    }

    /// Set access and modification times. The root directory has no entry to
    /// stamp, so this is a no-op there.
    pub fn utimens(&mut self, path: &str, accessed: SystemTime, modified: SystemTime) -> FatResult<()> {
        debug!("utimens(path='{}')", path);
        if path_is_root(path) {
            return Ok(());
        }
        let mut slot = self.find_entry(path)?;
        let accessed = FatTimestamp::from_system_time(accessed);
        let modified = FatTimestamp::from_system_time(modified);
        slot.entry.last_access_date = accessed.date.0;
        slot.entry.write_date = modified.date.0;
        slot.entry.write_time = modified.time.0;
        self.dir_entry_write(&slot)
    }

    /// Create a directory holding only its "." and ".." entries
    pub fn mkdir(&mut self, path: &str) -> FatResult<()> {
        debug!("mkdir(path='{}')", path);
        let (slot, name, parent) = self.creation_slot(path)?;

        let cluster = self.alloc_clusters(1)?;
        let created = match self.dir_entry_create(slot, name, FatAttributes::DIRECTORY, cluster, 0) {
            Ok(created) => created,
            Err(e) => {
                self.free_clusters(cluster)?;
                return Err(e);
            }
        };

        let first_sector = self.meta.cluster_first_sector(cluster)?;
        let mut dot = created.entry;
        dot.name = DOT_NAME;
        let mut dotdot = created.entry;
        dotdot.name = DOTDOT_NAME;
        dotdot.set_first_cluster(parent);

        self.dir_entry_write(&DirSlot::new(first_sector, 0, dot))?;
        self.dir_entry_write(&DirSlot::new(first_sector, DIR_ENTRY_SIZE, dotdot))
    }

    /// Remove an empty directory
    pub fn rmdir(&mut self, path: &str) -> FatResult<()> {
        debug!("rmdir(path='{}')", path);
        if path_is_root(path) {
            return Err(FatError::Busy("Cannot remove the root directory".into()));
        }
        let mut slot = self.find_entry(path)?;
        if !slot.entry.is_directory() {
            return Err(FatError::NotADirectory(path.to_string()));
        }
        if slot.entry.is_dot() {
            return Err(FatError::InvalidArgument(format!("Cannot remove {}", path)));
        }

        let cluster = slot.entry.first_cluster();
        if cluster == ROOT_CLUSTER {
            return Err(FatError::Corrupted(format!("Directory {} has no cluster", path)));
        }
        if self.directory_entries(cluster)?.iter().any(|s| !s.entry.is_dot()) {
            return Err(FatError::DirectoryNotEmpty(path.to_string()));
        }

        self.free_clusters(cluster)?;
        slot.entry.name[0] = NAME_DELETED;
        self.dir_entry_write(&slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fat_common::{CLUSTER_END, CLUSTER_FREE};
    use crate::test_helpers::mounted_volume;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_mknod_creates_empty_archive_entry() {
        let mut fs = mounted_volume();
        fs.mknod("/notes.txt").unwrap();
        let slot = fs.find_entry("/notes.txt").unwrap();
        assert_eq!(slot.entry.attributes, FatAttributes::ARCHIVE);
        assert_eq!(slot.entry.first_cluster(), 0);
        assert_eq!(slot.entry.file_size, 0);
        assert!(matches!(fs.mknod("/NOTES.TXT"), Err(FatError::AlreadyExists(_))));
    }

    #[test]
    fn test_mknod_rejects_dot_names() {
        let mut fs = mounted_volume();
        assert!(matches!(fs.mknod("/."), Err(FatError::AlreadyExists(_))));
        assert!(matches!(fs.mknod("/.."), Err(FatError::AlreadyExists(_))));
    }

    #[test]
    fn test_mkdir_writes_dot_entries() {
        let mut fs = mounted_volume();
        fs.mkdir("/outer").unwrap();
        fs.mkdir("/outer/inner").unwrap();

        let outer = fs.find_entry("/outer").unwrap().entry.first_cluster();
        let inner = fs.find_entry("/outer/inner").unwrap().entry.first_cluster();
        assert_eq!(fs.read_fat_entry(inner).unwrap(), CLUSTER_END);

        let entries = fs.directory_entries(inner).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entry.name, DOT_NAME);
        assert_eq!(entries[0].entry.first_cluster(), inner);
        assert_eq!(entries[1].entry.name, DOTDOT_NAME);
        assert_eq!(entries[1].entry.first_cluster(), outer);

        let top = fs.directory_entries(outer).unwrap();
        assert_eq!(top[1].entry.first_cluster(), ROOT_CLUSTER);
    }

    #[test]
    fn test_rmdir_requires_empty_directory() {
        let mut fs = mounted_volume();
        fs.mkdir("/dir").unwrap();
        fs.mknod("/dir/file").unwrap();
        assert!(matches!(fs.rmdir("/dir"), Err(FatError::DirectoryNotEmpty(_))));

        fs.unlink("/dir/file").unwrap();
        let cluster = fs.find_entry("/dir").unwrap().entry.first_cluster();
        fs.rmdir("/dir").unwrap();
        assert_eq!(fs.read_fat_entry(cluster).unwrap(), CLUSTER_FREE);
        assert!(matches!(fs.find_entry("/dir"), Err(FatError::NotFound(_))));
    }

    #[test]
    fn test_rmdir_errors() {
        let mut fs = mounted_volume();
        fs.mknod("/file").unwrap();
        fs.mkdir("/dir").unwrap();
        assert!(matches!(fs.rmdir("/"), Err(FatError::Busy(_))));
        assert!(matches!(fs.rmdir("/file"), Err(FatError::NotADirectory(_))));
        assert!(matches!(fs.rmdir("/missing"), Err(FatError::NotFound(_))));
        assert!(matches!(fs.rmdir("/dir/."), Err(FatError::InvalidArgument(_))));
    }

    #[test]
    fn test_unlink_errors() {
        let mut fs = mounted_volume();
        fs.mkdir("/dir").unwrap();
        assert!(matches!(fs.unlink("/"), Err(FatError::IsADirectory(_))));
        assert!(matches!(fs.unlink("/dir"), Err(FatError::IsADirectory(_))));
        assert!(matches!(fs.unlink("/missing"), Err(FatError::NotFound(_))));
    }

    #[test]
    fn test_unlink_leaves_tombstone() {
        let mut fs = mounted_volume();
        fs.mknod("/gone").unwrap();
        let slot = fs.find_entry("/gone").unwrap();
        fs.unlink("/gone").unwrap();

        let mut buffer = vec![0u8; 512];
        fs.read_sector(slot.sector, &mut buffer).unwrap();
        assert_eq!(buffer[slot.offset], NAME_DELETED);
    }

    #[test]
    fn test_utimens_sets_dates() {
        let mut fs = mounted_volume();
        fs.mknod("/stamped").unwrap();
        // 2024-01-15 14:30:00 UTC
        let modified = UNIX_EPOCH + Duration::from_secs(1_705_329_000);
        let accessed = UNIX_EPOCH + Duration::from_secs(1_705_329_000 + 86_400);
        fs.utimens("/stamped", accessed, modified).unwrap();

        let entry = fs.find_entry("/stamped").unwrap().entry;
        let written = FatTimestamp::from_system_time(modified);
        assert_eq!(entry.write_date, written.date.0);
        assert_eq!(entry.write_time, written.time.0);
        assert_eq!(entry.last_access_date, FatTimestamp::from_system_time(accessed).date.0);
        assert!(fs.utimens("/", accessed, modified).is_ok());
    }
}
