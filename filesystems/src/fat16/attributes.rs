// Stat-style views of entries and the volume: getattr, readdir, statfs

use super::path_resolver::{path_is_root, DirSlot};
use super::Fat16Fs;
use crate::fat_common::{
    display_name, timestamps::fat_datetime_to_unix, DirEntry, MAX_SHORT_NAME_LEN, ROOT_CLUSTER,
};
use log::debug;
use serde::Serialize;
use sfat_core::{BlockDevice, FatError, FatResult};
use std::time::UNIX_EPOCH;

/// Size unit of the `blocks` field, independent of the volume's sector size
pub const STAT_BLOCK_SIZE: u64 = 512;

/// File attributes returned by getattr
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileAttributes {
    pub size: u64,
    pub is_directory: bool,
    pub is_read_only: bool,
    pub created: Option<u64>,  // Unix timestamp
    pub modified: Option<u64>, // Unix timestamp
    pub accessed: Option<u64>, // Unix timestamp
    pub permissions: u32,      // Unix-style permission bits, no file type
    pub owner: u32,
    pub group: u32,
    pub links: u32,
    pub block_size: u32,
    pub blocks: u64,
    pub first_cluster: u16,
}

impl FileAttributes {
    /// Full mode word: file type plus permission bits
    pub fn mode(&self) -> u32 {
        let kind = if self.is_directory { libc::S_IFDIR } else { libc::S_IFREG };
        kind as u32 | self.permissions
    }
}

/// One name from readdir
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryListing {
    pub name: String,
    pub attributes: FileAttributes,
}

/// Volume totals returned by statfs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilesystemInfo {
    pub total_space: u64,
    pub free_space: u64,
    pub total_clusters: u32,
    pub free_clusters: u32,
    pub cluster_size: u32,
    pub max_filename_length: u32,
    pub volume_label: String,
    pub volume_serial: u32,
}

impl<D: BlockDevice> Fat16Fs<D> {
    fn entry_attributes(&self, entry: &DirEntry) -> FileAttributes {
        let read_only = entry.attributes().is_read_only();
        let is_directory = entry.is_directory();
        let size = if is_directory { 0 } else { entry.file_size as u64 };
        let created = fat_datetime_to_unix(entry.creation_date, entry.creation_time)
            + (entry.creation_time_tenth / 100) as u64;

        FileAttributes {
            size,
            is_directory,
            is_read_only: read_only,
            created: Some(created),
            modified: Some(fat_datetime_to_unix(entry.write_date, entry.write_time)),
            accessed: Some(fat_datetime_to_unix(entry.last_access_date, 0)),
            permissions: self.options.mode_bits(read_only),
            owner: self.options.uid,
            group: self.options.gid,
            links: if is_directory { 2 } else { 1 },
            block_size: self.meta.cluster_size,
            blocks: (size + STAT_BLOCK_SIZE - 1) / STAT_BLOCK_SIZE,
            first_cluster: entry.first_cluster(),
        }
    }

    /// The root directory has no entry; it reports the mount time for every timestamp
    fn root_attributes(&self) -> FileAttributes {
        let mounted = self
            .mounted_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        FileAttributes {
            size: 0,
            is_directory: true,
            is_read_only: false,
            created: Some(mounted),
            modified: Some(mounted),
            accessed: Some(mounted),
            permissions: self.options.mode_bits(false),
            owner: self.options.uid,
            group: self.options.gid,
            links: 2,
            block_size: self.meta.cluster_size,
            blocks: 0,
            first_cluster: ROOT_CLUSTER,
        }
    }

    pub fn getattr(&mut self, path: &str) -> FatResult<FileAttributes> {
        debug!("getattr(path='{}')", path);
        if path_is_root(path) {
            return Ok(self.root_attributes());
        }
        let slot = self.find_entry(path)?;
        Ok(self.entry_attributes(&slot.entry))
    }

    /// List a directory. Subdirectories include their "." and ".." entries.
    pub fn readdir(&mut self, path: &str) -> FatResult<Vec<DirectoryListing>> {
        debug!("readdir(path='{}')", path);
        let dir_cluster = if path_is_root(path) {
            ROOT_CLUSTER
        } else {
            let slot = self.find_entry(path)?;
            if !slot.entry.is_directory() {
                return Err(FatError::NotADirectory(path.to_string()));
            }
            slot.entry.first_cluster()
        };

        let slots: Vec<DirSlot> = self.directory_entries(dir_cluster)?;
        Ok(slots
            .iter()
            .map(|slot| DirectoryListing {
                name: display_name(&slot.entry.name),
                attributes: self.entry_attributes(&slot.entry),
            })
            .collect())
    }

    pub fn statfs(&mut self) -> FatResult<FilesystemInfo> {
        let free_clusters = self.free_cluster_count()?;
        Ok(FilesystemInfo {
            total_space: self.meta.total_data_bytes(),
            free_space: free_clusters as u64 * self.meta.cluster_size as u64,
            total_clusters: self.meta.cluster_count,
            free_clusters,
            cluster_size: self.meta.cluster_size,
            max_filename_length: MAX_SHORT_NAME_LEN as u32,
            volume_label: self.boot_sector.label(),
            volume_serial: self.boot_sector.volume_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{mounted_volume, mounted_volume_with_options};
    use sfat_core::MountOptions;

    #[test]
    fn test_root_attributes() {
        let mut fs = mounted_volume();
        let attrs = fs.getattr("/").unwrap();
        assert!(attrs.is_directory);
        assert_eq!(attrs.size, 0);
        assert_eq!(attrs.mode() & libc::S_IFMT as u32, libc::S_IFDIR as u32);
        assert_eq!(attrs.created, attrs.modified);
    }

    #[test]
    fn test_permissions_follow_mount_options() {
        let options = MountOptions { uid: 1000, gid: 100, umask: 0o027 };
        let mut fs = mounted_volume_with_options(options);
        fs.mknod("/f").unwrap();
        let attrs = fs.getattr("/f").unwrap();
        assert_eq!(attrs.owner, 1000);
        assert_eq!(attrs.group, 100);
        assert_eq!(attrs.permissions, 0o750);
        assert_eq!(attrs.mode(), libc::S_IFREG as u32 | 0o750);
    }

    #[test]
    fn test_read_only_entry_loses_write_bits() {
        let options = MountOptions { uid: 0, gid: 0, umask: 0o022 };
        let mut fs = mounted_volume_with_options(options);
        fs.mknod("/ro").unwrap();
        let mut slot = fs.find_entry("/ro").unwrap();
        slot.entry.attributes |= crate::fat_common::FatAttributes::READ_ONLY;
        fs.dir_entry_write(&slot).unwrap();

        let attrs = fs.getattr("/ro").unwrap();
        assert!(attrs.is_read_only);
        assert_eq!(attrs.permissions, 0o555);
    }

    #[test]
    fn test_readdir_lists_names_in_order() {
        let mut fs = mounted_volume();
        fs.mkdir("/docs").unwrap();
        fs.mknod("/docs/readme.txt").unwrap();
        fs.mknod("/docs/.profile").unwrap();

        let names: Vec<String> = fs.readdir("/docs").unwrap().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec![".", "..", "readme.txt", ".profile"]);
        assert!(matches!(fs.readdir("/docs/readme.txt"), Err(FatError::NotADirectory(_))));
    }

    #[test]
    fn test_readdir_skips_tombstones() {
        let mut fs = mounted_volume();
        fs.mknod("/a").unwrap();
        fs.mknod("/b").unwrap();
        fs.unlink("/a").unwrap();
        let names: Vec<String> = fs.readdir("/").unwrap().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn test_statfs_tracks_allocation() {
        let mut fs = mounted_volume();
        let before = fs.statfs().unwrap();
        assert_eq!(before.free_clusters, before.total_clusters);
        fs.mkdir("/d").unwrap();
        let after = fs.statfs().unwrap();
        assert_eq!(after.free_clusters, before.free_clusters - 1);
        assert_eq!(after.max_filename_length, 12);
    }
}
