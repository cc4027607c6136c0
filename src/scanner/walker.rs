//! Directory traversal: fans per-directory tasks into the work-stealing
//! pool, deduplicates hard links, guards against revisiting directories, and
//! aggregates sizes in a single post-pass once the pool drains.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::{ByteFormat, Config};
use crate::fmt::{format_size, shorten_path};
use crate::tree::{Entry, EntryKind};

use super::pool::WorkStealingPool;
use super::progress::ProgressThrottle;
use super::ScanError;

/// Children are built and accounted in batches of this many entries.
const BATCH_SIZE: usize = 256;
/// Wall-clock budget for listing a single directory.
const DIR_TIMEOUT: Duration = Duration::from_secs(5);
/// Progress line updates are throttled to one per interval.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Counters summarizing a finished scan.
#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    pub files: usize,
    pub directories: usize,
    pub symlinks: usize,
    pub io_errors: usize,
    /// Directories abandoned because their listing exceeded the budget.
    pub skipped_dirs: usize,
    pub entries_traversed: usize,
    pub total_size: u64,
    pub elapsed: Duration,
}

impl ScanStats {
    /// Write the end-of-scan summary to stderr.
    pub fn print(&self, format: ByteFormat) {
        eprintln!(
            "\nScanned {} files, {} directories, and {} symlinks in {}ms",
            self.files,
            self.directories,
            self.symlinks,
            self.elapsed.as_millis()
        );
        if self.io_errors > 0 {
            eprintln!("Encountered {} I/O errors", self.io_errors);
        }
        if self.skipped_dirs > 0 {
            eprintln!("Skipped {} unresponsive directories", self.skipped_dirs);
        }
        eprintln!("Total size: {}", format_size(self.total_size, format));
    }
}

/// Builds the entry tree for one or more roots.
///
/// A scanner owns its pool and its dedup state, so each scan (including the
/// interactive refresh paths) starts with fresh maps.
pub struct Scanner {
    state: Arc<ScanState>,
}

struct ScanState {
    pool: WorkStealingPool,
    config: Config,
    /// Seen (device, inode) pairs of hard-linked files; membership is the
    /// "already counted" sentinel.
    inode_map: Mutex<HashSet<(u64, u64)>>,
    /// Canonical paths of directories already entered.
    visited_dirs: Mutex<HashSet<PathBuf>>,
    current_path: Mutex<String>,
    throttle: ProgressThrottle,
    files: AtomicUsize,
    directories: AtomicUsize,
    symlinks: AtomicUsize,
    io_errors: AtomicUsize,
    skipped_dirs: AtomicUsize,
    entries_traversed: AtomicUsize,
    total_size: AtomicU64,
    started: Instant,
}

enum Enumeration {
    Listed(Vec<PathBuf>),
    TimedOut,
    Failed,
}

impl Scanner {
    pub fn new(config: Config) -> Self {
        Self {
            state: Arc::new(ScanState {
                pool: WorkStealingPool::new(config.thread_count),
                config,
                inode_map: Mutex::new(HashSet::new()),
                visited_dirs: Mutex::new(HashSet::new()),
                current_path: Mutex::new(String::new()),
                throttle: ProgressThrottle::new(PROGRESS_INTERVAL),
                files: AtomicUsize::new(0),
                directories: AtomicUsize::new(0),
                symlinks: AtomicUsize::new(0),
                io_errors: AtomicUsize::new(0),
                skipped_dirs: AtomicUsize::new(0),
                entries_traversed: AtomicUsize::new(0),
                total_size: AtomicU64::new(0),
                started: Instant::now(),
            }),
        }
    }

    /// Scan every path, returning one root entry per input.
    ///
    /// Blocks until traversal and the aggregation pass are both complete, so
    /// the returned trees are fully sized and sorted.
    pub fn scan(&self, paths: &[PathBuf]) -> Result<Vec<Arc<Entry>>, ScanError> {
        let state = &self.state;
        let mut roots = Vec::with_capacity(paths.len());

        for path in paths {
            let meta = fs::symlink_metadata(path).map_err(|source| {
                if source.kind() == io::ErrorKind::NotFound {
                    ScanError::PathNotFound { path: path.clone() }
                } else {
                    ScanError::Io {
                        path: path.clone(),
                        source,
                    }
                }
            })?;
            let entry =
                Entry::from_symlink_metadata(path.clone(), &meta).ok_or_else(|| ScanError::Io {
                    path: path.clone(),
                    source: io::Error::new(io::ErrorKind::Unsupported, "unsupported file type"),
                })?;
            let root = Arc::new(entry);
            state.set_current_path(path);
            state.entries_traversed.fetch_add(1, Ordering::Relaxed);

            match root.kind() {
                EntryKind::Directory => {
                    state.directories.fetch_add(1, Ordering::Relaxed);
                    state.update_progress();
                    scan_directory(state, root.clone(), root.device_id());
                }
                EntryKind::Regular => {
                    size_regular_file(state, &root, &meta);
                    state.update_progress();
                }
                EntryKind::Symlink => {
                    state.symlinks.fetch_add(1, Ordering::Relaxed);
                }
            }

            roots.push(root);
        }

        state.pool.wait_all();
        if state.config.show_progress {
            state.throttle.clear_line();
        }

        for root in &roots {
            let size = calculate_sizes(root);
            state.total_size.fetch_add(size, Ordering::Relaxed);
        }

        Ok(roots)
    }

    pub fn stats(&self) -> ScanStats {
        let state = &self.state;
        ScanStats {
            files: state.files.load(Ordering::Relaxed),
            directories: state.directories.load(Ordering::Relaxed),
            symlinks: state.symlinks.load(Ordering::Relaxed),
            io_errors: state.io_errors.load(Ordering::Relaxed),
            skipped_dirs: state.skipped_dirs.load(Ordering::Relaxed),
            entries_traversed: state.entries_traversed.load(Ordering::Relaxed),
            total_size: state.total_size.load(Ordering::Relaxed),
            elapsed: state.started.elapsed(),
        }
    }
}

impl ScanState {
    fn set_current_path(&self, path: &Path) {
        *self.current_path.lock().unwrap() = path.to_string_lossy().into_owned();
    }

    fn update_progress(&self) {
        if !self.config.show_progress || !self.throttle.should_update() {
            return;
        }
        let traversed = self.entries_traversed.load(Ordering::Relaxed);
        let skipped = self.skipped_dirs.load(Ordering::Relaxed);
        let current = self.current_path.lock().unwrap().clone();

        let mut line = format!("Enumerating {traversed} items");
        if skipped > 0 {
            line.push_str(&format!(" (skipped {skipped})"));
        }
        line.push_str(&format!(" - {}", shorten_path(&current)));
        self.throttle.write_line(&line);
    }

    /// Whether to descend into `path`. Directories are entered exactly once
    /// by canonical identity, which also stops symlink-into-ancestor loops
    /// and overlapping roots; configured ignore dirs are never entered.
    fn should_skip_directory(&self, path: &Path) -> bool {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if !self.visited_dirs.lock().unwrap().insert(canonical.clone()) {
            return true;
        }
        self.config.ignore_dirs.contains(&canonical)
    }

    /// Whether a regular file's size should be attributed. First insert of a
    /// hard-linked inode wins; later encounters of the same inode add
    /// nothing anywhere.
    fn should_count(&self, entry: &Entry) -> bool {
        if !self.config.count_hard_links && entry.hard_link_count() > 1 {
            let mut seen = self.inode_map.lock().unwrap();
            return seen.insert((entry.device_id(), entry.inode()));
        }
        true
    }
}

fn scan_directory(state: &Arc<ScanState>, dir: Arc<Entry>, root_device: u64) {
    if dir.is_symlink() || state.should_skip_directory(dir.path()) {
        return;
    }
    state.set_current_path(dir.path());

    let entries = match enumerate_with_timeout(dir.path()) {
        Enumeration::Listed(entries) => entries,
        Enumeration::TimedOut => {
            state.skipped_dirs.fetch_add(1, Ordering::Relaxed);
            return;
        }
        Enumeration::Failed => {
            state.io_errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    for batch in entries.chunks(BATCH_SIZE) {
        scan_batch(state, &dir, batch, root_device);
    }
}

fn scan_batch(state: &Arc<ScanState>, parent: &Arc<Entry>, batch: &[PathBuf], root_device: u64) {
    for path in batch {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(_) => {
                state.io_errors.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };
        let Some(entry) = Entry::from_symlink_metadata(path.clone(), &meta) else {
            continue;
        };
        let child = Arc::new(entry);

        if state.config.stay_on_filesystem
            && !child.is_symlink()
            && child.device_id() != root_device
        {
            continue;
        }

        state.set_current_path(path);
        state.entries_traversed.fetch_add(1, Ordering::Relaxed);
        state.update_progress();

        match child.kind() {
            EntryKind::Symlink => {
                state.symlinks.fetch_add(1, Ordering::Relaxed);
                parent.push_child(child);
            }
            EntryKind::Directory => {
                state.directories.fetch_add(1, Ordering::Relaxed);
                parent.push_child(child.clone());
                let task_state = Arc::clone(state);
                state
                    .pool
                    .enqueue(move || scan_directory(&task_state, child, root_device));
            }
            EntryKind::Regular => {
                if size_regular_file(state, &child, &meta) {
                    parent.add_entry_count(1);
                }
                parent.push_child(child.clone());
                parent.add_size(child.size());
                parent.add_apparent_size(child.apparent_size());
            }
        }
    }
}

/// Record a regular file's sizes on its entry. Returns whether the file was
/// counted (hard-link duplicates are recorded with zero size).
fn size_regular_file(state: &ScanState, entry: &Arc<Entry>, meta: &fs::Metadata) -> bool {
    let apparent = meta.len();
    entry.set_apparent_size(apparent);
    if !state.should_count(entry) {
        return false;
    }
    let size = if state.config.apparent_size {
        apparent
    } else {
        size_on_disk(meta, apparent)
    };
    entry.set_size(size);
    state.files.fetch_add(1, Ordering::Relaxed);
    true
}

#[cfg(unix)]
fn size_on_disk(meta: &fs::Metadata, _apparent: u64) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.blocks() * 512
}

#[cfg(not(unix))]
fn size_on_disk(_meta: &fs::Metadata, apparent: u64) -> u64 {
    const BLOCK: u64 = 4096;
    apparent.div_ceil(BLOCK) * BLOCK
}

/// List a directory on a disposable thread so an unresponsive mount cannot
/// wedge a worker. After a timeout the receiver is gone and the helper's
/// late result is dropped at the closed channel.
fn enumerate_with_timeout(path: &Path) -> Enumeration {
    let (tx, rx) = mpsc::channel();
    let dir = path.to_path_buf();
    let spawned = thread::Builder::new()
        .name("dusage-enumerate".into())
        .spawn(move || {
            let listing = fs::read_dir(&dir).and_then(|entries| {
                entries
                    .map(|entry| entry.map(|e| e.path()))
                    .collect::<io::Result<Vec<_>>>()
            });
            let _ = tx.send(listing);
        });
    if spawned.is_err() {
        return Enumeration::Failed;
    }

    match rx.recv_timeout(DIR_TIMEOUT) {
        Ok(Ok(entries)) => Enumeration::Listed(entries),
        Ok(Err(_)) => Enumeration::Failed,
        Err(RecvTimeoutError::Timeout) => Enumeration::TimedOut,
        Err(RecvTimeoutError::Disconnected) => Enumeration::Failed,
    }
}

/// Post-order aggregation: fill in directory sizes and entry counts from the
/// final child values, then sort each child list largest-first (ties break
/// on name ascending so repeated scans order identically). Leaves count one
/// entry only when their counted size is nonzero, so empty files and
/// hard-link duplicates do not inflate counts.
fn calculate_sizes(entry: &Arc<Entry>) -> u64 {
    if !entry.is_dir() {
        entry.set_entry_count(u64::from(entry.size() > 0));
        return entry.size();
    }

    let mut total = 0u64;
    let mut apparent = 0u64;
    let mut count = 0u64;
    entry.with_children(|children| {
        for child in children.iter() {
            total += calculate_sizes(child);
            apparent += child.apparent_size();
            count += child.entry_count();
        }
        children.sort_by(|a, b| b.size().cmp(&a.size()).then_with(|| a.name().cmp(b.name())));
    });
    entry.set_size(total);
    entry.set_apparent_size(apparent);
    entry.set_entry_count(count);
    total
}
