// FAT16 path resolver
// Walks slash-separated paths from the root directory, one short name per level

use super::Fat16Fs;
use crate::fat_common::{to_shortname, DirEntry, DIR_ENTRY_SIZE, FAT_NAME_LEN, ROOT_CLUSTER};
use log::{debug, trace};
use sfat_core::{BlockDevice, FatError, FatResult};

/// Location of one 32-byte directory slot together with its decoded contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirSlot {
    pub sector: u64,
    pub offset: usize,
    pub entry: DirEntry,
}

impl DirSlot {
    pub fn new(sector: u64, offset: usize, entry: DirEntry) -> Self {
        Self { sector, offset, entry }
    }

    /// An unused slot, ready to receive a new entry
    pub fn vacant(sector: u64, offset: usize) -> Self {
        Self::new(sector, offset, DirEntry::default())
    }
}

/// Outcome of searching one directory for a name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindResult {
    /// The name exists at this slot
    Found(DirSlot),
    /// The name is absent; this slot can take it
    Empty(DirSlot),
    /// The name is absent and every slot is in use
    Full,
}

/// Result of resolving a whole path
#[derive(Debug, Clone, Copy)]
pub struct Lookup<'a> {
    pub result: FindResult,
    /// Unresolved tail of the path: empty when found, else the final component
    pub remainder: &'a str,
    /// Cluster of the directory searched last (0 for the root directory)
    pub parent_cluster: u16,
}

/// Lazily splits a path into components, ignoring repeated slashes
#[derive(Debug, Clone)]
pub struct PathComponents<'a> {
    rest: &'a str,
}

impl<'a> PathComponents<'a> {
    pub fn new(path: &'a str) -> Self {
        Self { rest: path }
    }

    /// The part of the path not yet yielded, without leading slashes
    pub fn remainder(&self) -> &'a str {
        self.rest.trim_start_matches('/')
    }
}

impl<'a> Iterator for PathComponents<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let rest = self.remainder();
        if rest.is_empty() {
            self.rest = rest;
            return None;
        }
        let end = rest.find('/').unwrap_or(rest.len());
        self.rest = &rest[end..];
        Some(&rest[..end])
    }
}

/// Whether a path names the root directory ("", "/", "//", ...)
pub fn path_is_root(path: &str) -> bool {
    PathComponents::new(path).remainder().is_empty()
}

/// A run of consecutive directory slots starting at a sector boundary
#[derive(Debug, Clone, Copy)]
pub(crate) struct DirExtent {
    pub first_sector: u64,
    pub slots: usize,
}

/// State carried across the extents of one directory
struct SlotSearch<'n> {
    name: &'n [u8; FAT_NAME_LEN],
    first_deleted: Option<DirSlot>,
}

impl<'n> SlotSearch<'n> {
    fn new(name: &'n [u8; FAT_NAME_LEN]) -> Self {
        Self { name, first_deleted: None }
    }

    /// Every range scanned without hitting the end marker
    fn exhausted(self) -> FindResult {
        match self.first_deleted {
            Some(slot) => FindResult::Empty(slot),
            None => FindResult::Full,
        }
    }
}

impl<D: BlockDevice> Fat16Fs<D> {
    /// Runs of slots holding a directory, in order. The root region is capped at
    /// its declared entry count even when its last sector has room for more.
    pub(crate) fn directory_extents(&mut self, dir_cluster: u16) -> FatResult<Vec<DirExtent>> {
        if dir_cluster == ROOT_CLUSTER {
            return Ok(vec![DirExtent {
                first_sector: self.meta.root_start,
                slots: self.meta.root_entries as usize,
            }]);
        }
        let slots = self.meta.sectors_per_cluster as usize * self.meta.dir_entries_per_sector();
        let mut extents = Vec::new();
        for cluster in self.cluster_chain(dir_cluster)? {
            extents.push(DirExtent { first_sector: self.meta.cluster_first_sector(cluster)?, slots });
        }
        Ok(extents)
    }

    /// Read every slot of an extent in order, stopping early when `visit` returns a value
    pub(crate) fn scan_extent<T>(
        &mut self,
        extent: DirExtent,
        mut visit: impl FnMut(DirSlot) -> Option<T>,
    ) -> FatResult<Option<T>> {
        let per_sector = self.meta.dir_entries_per_sector();
        let mut buffer = self.sector_buffer();

        for index in 0..extent.slots {
            let sector = extent.first_sector + (index / per_sector) as u64;
            let offset = (index % per_sector) * DIR_ENTRY_SIZE;
            if offset == 0 {
                self.read_sector(sector, &mut buffer)?;
            }
            let entry = DirEntry::from_bytes(&buffer[offset..offset + DIR_ENTRY_SIZE]);
            if let Some(found) = visit(DirSlot::new(sector, offset, entry)) {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Scan one extent for a name. Tombstones never match; the first one seen
    /// is offered as the free slot once the used part of the directory ends.
    /// `None` means the extent ended without a verdict.
    fn find_entry_in_sectors(
        &mut self,
        search: &mut SlotSearch<'_>,
        extent: DirExtent,
    ) -> FatResult<Option<FindResult>> {
        self.scan_extent(extent, |slot| {
            let entry = &slot.entry;
            if entry.is_free() {
                return Some(FindResult::Empty(search.first_deleted.take().unwrap_or(slot)));
            }
            if entry.is_deleted() {
                if search.first_deleted.is_none() {
                    search.first_deleted = Some(slot);
                }
                return None;
            }
            if entry.is_lfn() || entry.is_volume_label() {
                return None;
            }
            if entry.name == *search.name {
                trace!("Matched entry at sector {} offset {}", slot.sector, slot.offset);
                return Some(FindResult::Found(slot));
            }
            None
        })
    }

    /// Search one directory (root region or cluster chain) for an encoded name
    pub fn find_in_directory(&mut self, name: &[u8; FAT_NAME_LEN], dir_cluster: u16) -> FatResult<FindResult> {
        let mut search = SlotSearch::new(name);
        for extent in self.directory_extents(dir_cluster)? {
            if let Some(result) = self.find_entry_in_sectors(&mut search, extent)? {
                return Ok(result);
            }
        }
        Ok(search.exhausted())
    }

    /// Resolve a path. Intermediate components must exist and be directories;
    /// the outcome for the final component is reported as-is.
    pub fn find_entry_internal<'a>(&mut self, path: &'a str) -> FatResult<Lookup<'a>> {
        let mut components = PathComponents::new(path);
        let mut dir_cluster = ROOT_CLUSTER;

        while let Some(component) = components.next() {
            let name = to_shortname(component)?;
            let result = self.find_in_directory(&name, dir_cluster)?;
            let last = components.remainder().is_empty();

            match result {
                FindResult::Found(slot) if !last => {
                    if !slot.entry.is_directory() {
                        return Err(FatError::NotADirectory(format!(
                            "'{}' in path {}",
                            component, path
                        )));
                    }
                    // ".." of a first-level directory stores 0, which is the root
                    dir_cluster = slot.entry.first_cluster();
                }
                _ if !last => {
                    return Err(FatError::NotFound(format!("'{}' in path {}", component, path)));
                }
                FindResult::Found(_) => {
                    return Ok(Lookup { result, remainder: "", parent_cluster: dir_cluster });
                }
                _ => {
                    return Ok(Lookup { result, remainder: component, parent_cluster: dir_cluster });
                }
            }
        }

        Err(FatError::InvalidArgument(format!("Path {} names the root directory", path)))
    }

    /// Find the entry a path names
    pub fn find_entry(&mut self, path: &str) -> FatResult<DirSlot> {
        match self.find_entry_internal(path)?.result {
            FindResult::Found(slot) => Ok(slot),
            _ => Err(FatError::NotFound(path.to_string())),
        }
    }

    /// Find a free slot where `path` can be created. Returns the slot, the final
    /// component, and the parent directory's cluster. A full subdirectory grows
    /// by one cluster; a full root directory cannot grow.
    pub fn find_empty_slot<'a>(&mut self, path: &'a str) -> FatResult<(DirSlot, &'a str, u16)> {
        if path_is_root(path) {
            return Err(FatError::AlreadyExists("/".into()));
        }

        let lookup = self.find_entry_internal(path)?;
        match lookup.result {
            FindResult::Found(_) => Err(FatError::AlreadyExists(path.to_string())),
            FindResult::Empty(slot) => Ok((slot, lookup.remainder, lookup.parent_cluster)),
            FindResult::Full if lookup.parent_cluster == ROOT_CLUSTER => Err(FatError::NoSpace(
                format!("Root directory is full ({} entries)", self.meta.root_entries),
            )),
            FindResult::Full => {
                debug!("Directory at cluster {} is full, extending", lookup.parent_cluster);
                let slot = self.extend_directory(lookup.parent_cluster)?;
                Ok((slot, lookup.remainder, lookup.parent_cluster))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{formatted_device, mounted_volume, small_format_options};
    use sfat_core::FormatOptions;

    #[test]
    fn test_path_components() {
        let mut components = PathComponents::new("/a//b/c.txt/");
        assert_eq!(components.next(), Some("a"));
        assert_eq!(components.remainder(), "b/c.txt/");
        assert_eq!(components.next(), Some("b"));
        assert_eq!(components.next(), Some("c.txt"));
        assert_eq!(components.remainder(), "");
        assert_eq!(components.next(), None);
    }

    #[test]
    fn test_path_is_root() {
        assert!(path_is_root(""));
        assert!(path_is_root("/"));
        assert!(path_is_root("///"));
        assert!(!path_is_root("/a"));
    }

    #[test]
    fn test_empty_root_offers_first_slot() {
        let mut fs = mounted_volume();
        let root_start = fs.metadata().root_start;
        let lookup = fs.find_entry_internal("/hello.txt").unwrap();
        assert_eq!(lookup.remainder, "hello.txt");
        assert_eq!(lookup.parent_cluster, ROOT_CLUSTER);
        match lookup.result {
            FindResult::Empty(slot) => assert_eq!((slot.sector, slot.offset), (root_start, 0)),
            other => panic!("expected an empty slot, got {:?}", other),
        }
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let mut fs = mounted_volume();
        fs.mknod("/Hello.TXT").unwrap();
        let slot = fs.find_entry("/hello.txt").unwrap();
        assert_eq!(&slot.entry.name, b"HELLO   TXT");
        assert!(matches!(fs.find_entry("/hello.txt/x"), Err(FatError::NotADirectory(_))));
    }

    #[test]
    fn test_missing_intermediate_is_not_found() {
        let mut fs = mounted_volume();
        assert!(matches!(fs.find_entry_internal("/nodir/file"), Err(FatError::NotFound(_))));
        assert!(matches!(fs.find_entry("/nofile"), Err(FatError::NotFound(_))));
    }

    #[test]
    fn test_invalid_component_rejected() {
        let mut fs = mounted_volume();
        assert!(matches!(fs.find_entry("/bad*name"), Err(FatError::InvalidArgument(_))));
    }

    #[test]
    fn test_tombstone_reused_after_end_marker() {
        let mut fs = mounted_volume();
        fs.mknod("/a").unwrap();
        fs.mknod("/b").unwrap();
        let first = fs.find_entry("/a").unwrap();
        fs.unlink("/a").unwrap();

        // "b" after the tombstone is still found
        assert!(fs.find_entry("/b").is_ok());
        let (slot, name, _) = fs.find_empty_slot("/c").unwrap();
        assert_eq!(name, "c");
        assert_eq!((slot.sector, slot.offset), (first.sector, first.offset));
    }

    #[test]
    fn test_existing_name_is_already_exists() {
        let mut fs = mounted_volume();
        fs.mknod("/a").unwrap();
        assert!(matches!(fs.find_empty_slot("/a"), Err(FatError::AlreadyExists(_))));
        assert!(matches!(fs.find_empty_slot("/"), Err(FatError::AlreadyExists(_))));
    }

    #[test]
    fn test_root_capacity_ends_mid_sector() {
        let options = FormatOptions {
            root_entries: 20,
            ..small_format_options()
        };
        let device = formatted_device(8192, &options);
        let mut fs = Fat16Fs::mount(device).unwrap();
        assert_eq!(fs.metadata().root_sectors, 2);

        for i in 0..20 {
            fs.mknod(&format!("/f{}", i)).unwrap();
        }
        // The second root sector has room for 12 more slots on disk
        assert!(matches!(fs.find_empty_slot("/extra"), Err(FatError::NoSpace(_))));
        assert!(matches!(fs.mknod("/extra"), Err(FatError::NoSpace(_))));
        assert_eq!(fs.readdir("/").unwrap().len(), 20);
    }

    #[test]
    fn test_dotdot_resolves_to_root() {
        let mut fs = mounted_volume();
        fs.mkdir("/dir").unwrap();
        fs.mknod("/top").unwrap();
        let direct = fs.find_entry("/top").unwrap();
        let via_parent = fs.find_entry("/dir/../top").unwrap();
        assert_eq!(direct, via_parent);
    }
}
