//! Non-interactive output: the flat aggregate listing and the tree renderer.

use std::io::{self, Write};
use std::sync::Arc;

use crate::config::Config;
use crate::fmt::format_size;
use crate::tree::Entry;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";
const GRAY: &str = "\x1b[90m";

/// Print each root on one line, smallest first, with a trailing total when
/// more than one root was scanned.
pub fn print_flat(roots: &[Arc<Entry>], config: &Config, out: &mut impl Write) -> io::Result<()> {
    let mut sorted: Vec<Arc<Entry>> = roots.to_vec();
    sorted.sort_by(|a, b| a.size().cmp(&b.size()).then_with(|| a.name().cmp(b.name())));

    for root in &sorted {
        write!(out, "{:>12} ", format_size(root.size(), config.format))?;
        let colored = !config.no_colors && (root.is_dir() || root.is_symlink());
        if colored {
            if root.is_symlink() {
                write!(out, "{MAGENTA}")?;
            } else {
                write!(out, "{CYAN}")?;
            }
        }
        write!(out, "{}", root.path().display())?;
        if let Some(target) = root.symlink_target() {
            write!(out, " -> {}", target.display())?;
        }
        if colored {
            write!(out, "{RESET}")?;
        }
        writeln!(out)?;
    }

    if sorted.len() > 1 {
        let total: u64 = sorted.iter().map(|root| root.size()).sum();
        writeln!(out, "{:>12} total", format_size(total, config.format))?;
    }
    Ok(())
}

/// Print a root as a size-annotated tree, largest children first.
pub fn print_tree(root: &Arc<Entry>, config: &Config, out: &mut impl Write) -> io::Result<()> {
    print_tree_node(root, config, "", true, 0, out)
}

fn print_tree_node(
    entry: &Arc<Entry>,
    config: &Config,
    prefix: &str,
    is_last: bool,
    depth: usize,
    out: &mut impl Write,
) -> io::Result<()> {
    if let Some(max_depth) = config.max_depth {
        if depth > max_depth {
            return Ok(());
        }
    }

    write!(out, "{prefix}{}", if is_last { "└── " } else { "├── " })?;

    let colored = !config.no_colors && (entry.is_dir() || entry.is_symlink());
    if colored {
        if entry.is_symlink() {
            write!(out, "{MAGENTA}")?;
        } else {
            write!(out, "{BLUE}{BOLD}")?;
        }
    }
    write!(out, "{}", entry.name())?;
    if let Some(target) = entry.symlink_target() {
        write!(out, " -> {}", target.display())?;
    }
    if colored {
        write!(out, "{RESET}")?;
    }

    if config.no_colors {
        writeln!(out, " [{}]", format_size(entry.size(), config.format))?;
    } else {
        writeln!(
            out,
            " {YELLOW}[{}]{RESET}",
            format_size(entry.size(), config.format)
        )?;
    }

    if !entry.is_dir() || entry.is_symlink() {
        return Ok(());
    }

    let mut children = entry.children_snapshot();
    children.sort_by(|a, b| b.size().cmp(&a.size()).then_with(|| a.name().cmp(b.name())));

    let limit = config
        .top_n
        .map_or(children.len(), |top| children.len().min(top));
    let truncated = children.len() > limit;
    let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });

    for (index, child) in children.iter().take(limit).enumerate() {
        let child_is_last = !truncated && index == limit - 1;
        print_tree_node(child, config, &child_prefix, child_is_last, depth + 1, out)?;
    }

    if truncated {
        let omitted = children.len() - limit;
        if config.no_colors {
            writeln!(out, "{child_prefix}└── ... {omitted} more entries")?;
        } else {
            writeln!(
                out,
                "{child_prefix}└── {GRAY}... {omitted} more entries{RESET}"
            )?;
        }
    }
    Ok(())
}
