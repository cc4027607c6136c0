//! Runtime configuration shared by the scanner, the printers and the
//! interactive UI.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use clap::ValueEnum;

/// Byte-count rendering family selected with `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ByteFormat {
    /// Powers of 1000 (KB, MB, GB, ...)
    #[default]
    Metric,
    /// Powers of 1024 (KiB, MiB, GiB, ...)
    Binary,
    /// Raw byte count
    Bytes,
    /// Always gigabytes
    Gb,
    /// Always gibibytes
    Gib,
    /// Always megabytes
    Mb,
    /// Always mebibytes
    Mib,
}

/// Options controlling a scan and how its results are presented.
#[derive(Debug, Clone)]
pub struct Config {
    /// Use apparent sizes instead of allocated blocks.
    pub apparent_size: bool,
    /// Disable hard-link dedup: every encounter contributes fully.
    pub count_hard_links: bool,
    /// Skip entries on a different filesystem than their scan root.
    pub stay_on_filesystem: bool,
    /// Skip the existence check before interactive refresh and delete.
    pub no_entry_check: bool,
    /// Suppress ANSI colors in non-interactive output.
    pub no_colors: bool,
    /// Print a tree instead of the flat aggregate.
    pub tree_mode: bool,
    /// Show the stderr progress line while scanning.
    pub show_progress: bool,
    /// Maximum recursion depth for the tree printer.
    pub max_depth: Option<usize>,
    /// Maximum children printed per directory in tree mode.
    pub top_n: Option<usize>,
    /// Worker count for the scan pool; 0 probes the hardware.
    pub thread_count: usize,
    /// Byte-count rendering family.
    pub format: ByteFormat,
    /// Canonicalized directories excluded from traversal.
    pub ignore_dirs: BTreeSet<PathBuf>,
    /// The scan roots.
    pub paths: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            apparent_size: false,
            count_hard_links: false,
            stay_on_filesystem: false,
            no_entry_check: false,
            no_colors: false,
            tree_mode: false,
            show_progress: true,
            max_depth: None,
            top_n: None,
            thread_count: 0,
            format: ByteFormat::Metric,
            ignore_dirs: BTreeSet::new(),
            paths: Vec::new(),
        }
    }
}

impl Config {
    /// Register a directory to be skipped during traversal.
    ///
    /// The path is canonicalized so it matches however the scanner reaches
    /// it; unresolvable paths are reported on stderr and dropped.
    pub fn add_ignore_dir(&mut self, dir: &Path) {
        match dir.canonicalize() {
            Ok(canonical) => {
                self.ignore_dirs.insert(canonical);
            }
            Err(_) => {
                eprintln!("Warning: cannot resolve ignore directory: {}", dir.display());
            }
        }
    }
}
