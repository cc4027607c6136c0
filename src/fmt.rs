//! Byte-count formatting and path shortening for progress lines.

use crate::config::ByteFormat;

const METRIC_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
const BINARY_UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

/// Paths longer than this many characters are shortened for display.
const SHORTEN_LIMIT: usize = 45;
const SHORTEN_HEAD: usize = 30;
const SHORTEN_TAIL: usize = 30;

/// Render a byte count in the given unit family.
///
/// The scaled families pick the largest unit where the value is at least 1
/// and render two decimals, except at the base unit where the raw integer is
/// shown. The fixed families always render two decimals.
pub fn format_size(bytes: u64, format: ByteFormat) -> String {
    match format {
        ByteFormat::Bytes => format!("{bytes} B"),
        ByteFormat::Metric => scaled(bytes, 1000.0, &METRIC_UNITS),
        ByteFormat::Binary => scaled(bytes, 1024.0, &BINARY_UNITS),
        ByteFormat::Gb => format!("{:.2} GB", bytes as f64 / 1_000_000_000.0),
        ByteFormat::Gib => format!("{:.2} GiB", bytes as f64 / 1_073_741_824.0),
        ByteFormat::Mb => format!("{:.2} MB", bytes as f64 / 1_000_000.0),
        ByteFormat::Mib => format!("{:.2} MiB", bytes as f64 / 1_048_576.0),
    }
}

fn scaled(bytes: u64, divisor: f64, units: &[&str; 6]) -> String {
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= divisor && unit < units.len() - 1 {
        size /= divisor;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", units[0])
    } else {
        format!("{size:.2} {}", units[unit])
    }
}

/// Shorten a long path to `head...tail` for single-line progress output.
///
/// Operates on characters, not bytes, so multi-byte names never split.
pub fn shorten_path(path: &str) -> String {
    let chars: Vec<char> = path.chars().collect();
    if chars.len() <= SHORTEN_LIMIT || chars.len() <= SHORTEN_HEAD + SHORTEN_TAIL + 3 {
        return path.to_string();
    }

    let head: String = chars[..SHORTEN_HEAD].iter().collect();
    let tail: String = chars[chars.len() - SHORTEN_TAIL..].iter().collect();
    format!("{head}...{tail}")
}
