//! The shared tree node built by the scanner and browsed by the UI.
//!
//! Entries are reference-counted and internally synchronized: workers append
//! children under the parent's child lock while size counters accumulate
//! through atomics, so sibling directories scan concurrently without a
//! global tree lock. `children` is append-only during traversal; the
//! post-scan aggregation pass is the only writer that reorders it.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// Classification of a directory entry.
///
/// Other file types (sockets, FIFOs, devices) are skipped during traversal
/// and never become entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Regular,
    Directory,
    Symlink,
}

/// A node in the scanned tree.
pub struct Entry {
    path: PathBuf,
    name: String,
    kind: EntryKind,
    /// Counted size: allocated blocks, or the apparent size when the scan
    /// was configured that way. Hard-link duplicates stay at zero.
    size: AtomicU64,
    apparent_size: AtomicU64,
    /// Number of counted regular files at or below this node; filled by the
    /// post-scan aggregation pass.
    entry_count: AtomicU64,
    marked: AtomicBool,
    mtime: SystemTime,
    device_id: u64,
    inode: u64,
    hard_link_count: u64,
    symlink_target: Option<PathBuf>,
    children: Mutex<Vec<Arc<Entry>>>,
}

impl Entry {
    /// Build an entry from `symlink_metadata` of `path`.
    ///
    /// Returns `None` for file types the scanner does not track. Symlinks
    /// keep their target verbatim (`[unreadable]` when the link cannot be
    /// read) and carry no timestamps or inode identity.
    pub fn from_symlink_metadata(path: PathBuf, meta: &Metadata) -> Option<Entry> {
        let file_type = meta.file_type();
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::Regular
        } else {
            return None;
        };

        let symlink_target = if kind == EntryKind::Symlink {
            Some(std::fs::read_link(&path).unwrap_or_else(|_| PathBuf::from("[unreadable]")))
        } else {
            None
        };
        let mtime = if kind == EntryKind::Symlink {
            UNIX_EPOCH
        } else {
            meta.modified().unwrap_or(UNIX_EPOCH)
        };
        let (device_id, inode, hard_link_count) = if kind == EntryKind::Symlink {
            (0, 0, 1)
        } else {
            file_identity(meta)
        };

        Some(Entry {
            name: display_name(&path),
            path,
            kind,
            size: AtomicU64::new(0),
            apparent_size: AtomicU64::new(0),
            entry_count: AtomicU64::new(0),
            marked: AtomicBool::new(false),
            mtime,
            device_id,
            inode,
            hard_link_count,
            symlink_target,
            children: Mutex::new(Vec::new()),
        })
    }

    /// A synthetic directory node that exists only in memory: the virtual
    /// root joining multiple scan roots, or the `[Search Results]` folder.
    pub fn virtual_dir(label: &str) -> Arc<Entry> {
        Arc::new(Entry {
            path: PathBuf::from(label),
            name: label.to_string(),
            kind: EntryKind::Directory,
            size: AtomicU64::new(0),
            apparent_size: AtomicU64::new(0),
            entry_count: AtomicU64::new(0),
            marked: AtomicBool::new(false),
            mtime: UNIX_EPOCH,
            device_id: 0,
            inode: 0,
            hard_link_count: 1,
            symlink_target: None,
            children: Mutex::new(Vec::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file name, or the full path text for roots like `/` that have
    /// none.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == EntryKind::Symlink
    }

    pub fn mtime(&self) -> SystemTime {
        self.mtime
    }

    pub fn device_id(&self) -> u64 {
        self.device_id
    }

    pub fn inode(&self) -> u64 {
        self.inode
    }

    pub fn hard_link_count(&self) -> u64 {
        self.hard_link_count
    }

    pub fn symlink_target(&self) -> Option<&Path> {
        self.symlink_target.as_deref()
    }

    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Relaxed)
    }

    pub fn set_size(&self, bytes: u64) {
        self.size.store(bytes, Ordering::Relaxed);
    }

    pub fn add_size(&self, bytes: u64) {
        self.size.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn apparent_size(&self) -> u64 {
        self.apparent_size.load(Ordering::Relaxed)
    }

    pub fn set_apparent_size(&self, bytes: u64) {
        self.apparent_size.store(bytes, Ordering::Relaxed);
    }

    pub fn add_apparent_size(&self, bytes: u64) {
        self.apparent_size.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count.load(Ordering::Relaxed)
    }

    pub fn set_entry_count(&self, count: u64) {
        self.entry_count.store(count, Ordering::Relaxed);
    }

    pub fn add_entry_count(&self, count: u64) {
        self.entry_count.fetch_add(count, Ordering::Relaxed);
    }

    pub fn is_marked(&self) -> bool {
        self.marked.load(Ordering::Relaxed)
    }

    pub fn set_marked(&self, marked: bool) {
        self.marked.store(marked, Ordering::Relaxed);
    }

    pub fn toggle_marked(&self) {
        self.marked.fetch_xor(true, Ordering::Relaxed);
    }

    /// Append a child under this node's child lock.
    pub fn push_child(&self, child: Arc<Entry>) {
        self.children.lock().unwrap().push(child);
    }

    /// Clone the child list out from under the lock.
    pub fn children_snapshot(&self) -> Vec<Arc<Entry>> {
        self.children.lock().unwrap().clone()
    }

    pub fn child_count(&self) -> usize {
        self.children.lock().unwrap().len()
    }

    /// Run `f` with exclusive access to the child list. Used by the
    /// aggregation pass for the in-place sort and by deletion.
    pub fn with_children<R>(&self, f: impl FnOnce(&mut Vec<Arc<Entry>>) -> R) -> R {
        f(&mut self.children.lock().unwrap())
    }

    /// Drop a specific child, matched by pointer identity.
    pub fn remove_child(&self, child: &Arc<Entry>) {
        self.children
            .lock()
            .unwrap()
            .retain(|existing| !Arc::ptr_eq(existing, child));
    }

    /// Swap in a freshly scanned child list.
    pub fn replace_children(&self, new_children: Vec<Arc<Entry>>) {
        *self.children.lock().unwrap() = new_children;
    }

    /// Move the child list out, leaving this node empty.
    pub fn take_children(&self) -> Vec<Arc<Entry>> {
        std::mem::take(&mut self.children.lock().unwrap())
    }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("size", &self.size())
            .field("entry_count", &self.entry_count())
            .field("children", &self.child_count())
            .finish()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(unix)]
fn file_identity(meta: &Metadata) -> (u64, u64, u64) {
    use std::os::unix::fs::MetadataExt;
    (meta.dev(), meta.ino(), meta.nlink())
}

#[cfg(not(unix))]
fn file_identity(_meta: &Metadata) -> (u64, u64, u64) {
    (0, 0, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry_for(path: &Path) -> Entry {
        let meta = std::fs::symlink_metadata(path).unwrap();
        Entry::from_symlink_metadata(path.to_path_buf(), &meta).unwrap()
    }

    #[test]
    fn test_regular_file_entry() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("data.bin");
        std::fs::write(&file, b"12345").unwrap();

        let entry = entry_for(&file);
        assert_eq!(entry.kind(), EntryKind::Regular);
        assert_eq!(entry.name(), "data.bin");
        assert_eq!(entry.size(), 0);
        assert!(!entry.is_marked());
        #[cfg(unix)]
        {
            assert!(entry.inode() > 0);
            assert_eq!(entry.hard_link_count(), 1);
        }
    }

    #[test]
    fn test_directory_entry() {
        let temp_dir = TempDir::new().unwrap();
        let entry = entry_for(temp_dir.path());
        assert!(entry.is_dir());
        assert!(!entry.is_symlink());
        assert_eq!(entry.child_count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_entry_is_inert() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("target");
        let link = temp_dir.path().join("link");
        std::fs::write(&target, b"x").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let entry = entry_for(&link);
        assert!(entry.is_symlink());
        assert_eq!(entry.symlink_target(), Some(target.as_path()));
        assert_eq!(entry.mtime(), UNIX_EPOCH);
        assert_eq!(entry.device_id(), 0);
        assert_eq!(entry.inode(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_symlink_target_placeholder() {
        let temp_dir = TempDir::new().unwrap();
        let link = temp_dir.path().join("dangling");
        std::os::unix::fs::symlink("/nonexistent/target", &link).unwrap();

        let entry = entry_for(&link);
        // read_link succeeds on dangling links; the placeholder only shows
        // up when the link itself cannot be read.
        assert!(entry.symlink_target().is_some());
    }

    #[test]
    fn test_child_list_operations() {
        let parent = Entry::virtual_dir("parent");
        let a = Entry::virtual_dir("a");
        let b = Entry::virtual_dir("b");
        parent.push_child(a.clone());
        parent.push_child(b.clone());
        assert_eq!(parent.child_count(), 2);

        parent.remove_child(&a);
        let rest = parent.children_snapshot();
        assert_eq!(rest.len(), 1);
        assert!(Arc::ptr_eq(&rest[0], &b));

        let taken = parent.take_children();
        assert_eq!(taken.len(), 1);
        assert_eq!(parent.child_count(), 0);
    }

    #[test]
    fn test_atomic_counters() {
        let entry = Entry::virtual_dir("x");
        entry.add_size(100);
        entry.add_size(50);
        assert_eq!(entry.size(), 150);
        entry.set_size(10);
        assert_eq!(entry.size(), 10);

        entry.toggle_marked();
        assert!(entry.is_marked());
        entry.toggle_marked();
        assert!(!entry.is_marked());
    }

    #[test]
    fn test_root_name_falls_back_to_path() {
        let entry = Entry::virtual_dir("[Search Results]");
        assert_eq!(entry.name(), "[Search Results]");
    }
}
