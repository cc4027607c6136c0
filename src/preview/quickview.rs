//! Bounded, in-memory previews of filesystem paths.
//!
//! Previews are plain text lines plus optional styled spans when an external
//! highlighter produced them. Generation is synchronous and capped, so a
//! preview can be built for anything the cursor lands on without reading
//! unbounded data.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

use crate::config::ByteFormat;
use crate::fmt::format_size;

use super::ansi::{self, StyledLine};

/// Upper bound on lines retained for the scrollable preview.
pub const MAX_PREVIEW_LINES: usize = 10_000;
/// Longer lines are cut at this many characters.
pub const MAX_LINE_LENGTH: usize = 4096;
/// How much of a file's head the text/binary probe reads.
const PROBE_BYTES: usize = 8192;
/// Bytes shown by the binary hex dump.
const HEX_DUMP_BYTES: usize = 256;
/// Directory previews list at most this many entries.
const MAX_DIR_ENTRIES: usize = MAX_PREVIEW_LINES - 3;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "svg", "webp", "ico"];
const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar"];

/// What kind of content a preview holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    Text,
    Binary,
    Directory,
    Image,
    Archive,
    Empty,
    Error,
}

/// A generated preview.
pub struct PreviewContent {
    pub kind: PreviewKind,
    /// Plain text lines, always present.
    pub lines: Vec<String>,
    /// Highlighted spans, present when a highlighter ran.
    pub styled: Option<Vec<StyledLine>>,
    /// Line count of the underlying document, which can exceed `lines`.
    pub total_lines: usize,
    pub file_size: u64,
}

impl PreviewContent {
    fn message(kind: PreviewKind, lines: Vec<String>, file_size: u64) -> Self {
        Self {
            kind,
            total_lines: lines.len(),
            lines,
            styled: None,
            file_size,
        }
    }
}

/// Classify a path for previewing.
pub fn detect_kind(path: &Path) -> PreviewKind {
    let Ok(meta) = fs::metadata(path) else {
        return PreviewKind::Error;
    };
    if meta.is_dir() {
        return PreviewKind::Directory;
    }
    if !meta.is_file() {
        return PreviewKind::Error;
    }
    if meta.len() == 0 {
        return PreviewKind::Empty;
    }

    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return PreviewKind::Image;
    }
    if ARCHIVE_EXTENSIONS.contains(&extension.as_str()) {
        return PreviewKind::Archive;
    }

    if is_text_file(path) {
        PreviewKind::Text
    } else {
        PreviewKind::Binary
    }
}

/// Build a preview for any path.
pub fn generate_preview(path: &Path) -> PreviewContent {
    match detect_kind(path) {
        PreviewKind::Text => preview_text(path),
        PreviewKind::Directory => preview_directory(path),
        PreviewKind::Binary => preview_binary(path),
        PreviewKind::Image => preview_metadata(path, PreviewKind::Image),
        PreviewKind::Archive => preview_metadata(path, PreviewKind::Archive),
        PreviewKind::Empty => {
            PreviewContent::message(PreviewKind::Empty, vec!["Empty file".to_string()], 0)
        }
        PreviewKind::Error => PreviewContent::message(
            PreviewKind::Error,
            vec!["Error: cannot preview this file".to_string()],
            0,
        ),
    }
}

/// NUL bytes or non-whitespace control bytes in the probed head mean binary.
fn is_binary_data(data: &[u8]) -> bool {
    data.iter()
        .any(|&byte| byte == 0 || (byte < 32 && byte != b'\t' && byte != b'\n' && byte != b'\r'))
}

fn is_text_file(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut buffer = [0u8; PROBE_BYTES];
    let Ok(read) = file.read(&mut buffer) else {
        return false;
    };
    !is_binary_data(&buffer[..read])
}

fn truncate_line(line: &str, max: usize) -> String {
    let count = line.chars().count();
    if count <= max {
        return line.to_string();
    }
    let head: String = line.chars().take(max.saturating_sub(3)).collect();
    format!("{head}...")
}

/// Path of the optional syntax highlighter, probed once per process.
fn highlighter_path() -> Option<&'static str> {
    static HIGHLIGHTER: OnceLock<Option<String>> = OnceLock::new();
    HIGHLIGHTER
        .get_or_init(|| {
            let output = Command::new("which").arg("bat").output().ok()?;
            if !output.status.success() {
                return None;
            }
            let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if path.is_empty() {
                None
            } else {
                Some(path)
            }
        })
        .as_deref()
}

fn highlight_with_bat(path: &Path, file_size: u64) -> Option<PreviewContent> {
    let bat = highlighter_path()?;
    let output = Command::new(bat)
        .arg("--color=always")
        .arg("--style=plain")
        .arg("--theme=Monokai Extended")
        .arg("--paging=never")
        .arg(format!("--line-range=1:{MAX_PREVIEW_LINES}"))
        .arg(path)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let styled: Vec<StyledLine> = ansi::parse_lines(&text)
        .into_iter()
        .map(|line| line.truncated(MAX_LINE_LENGTH))
        .collect();
    let lines: Vec<String> = styled.iter().map(|line| line.plain_text()).collect();
    Some(PreviewContent {
        kind: PreviewKind::Text,
        total_lines: lines.len(),
        lines,
        styled: Some(styled),
        file_size,
    })
}

fn preview_text(path: &Path) -> PreviewContent {
    let file_size = fs::metadata(path).map(|meta| meta.len()).unwrap_or(0);
    if let Some(highlighted) = highlight_with_bat(path, file_size) {
        return highlighted;
    }

    let Ok(file) = File::open(path) else {
        return PreviewContent::message(
            PreviewKind::Error,
            vec!["Cannot open file".to_string()],
            file_size,
        );
    };

    let reader = BufReader::new(file);
    let mut lines = Vec::new();
    let mut total_lines = 0usize;
    for line in reader.lines() {
        let Ok(line) = line else { break };
        total_lines += 1;
        if lines.len() < MAX_PREVIEW_LINES {
            lines.push(truncate_line(&line, MAX_LINE_LENGTH));
        }
    }

    PreviewContent {
        kind: PreviewKind::Text,
        lines,
        styled: None,
        total_lines,
        file_size,
    }
}

fn preview_directory(path: &Path) -> PreviewContent {
    let listing = fs::read_dir(path).and_then(|entries| {
        entries
            .map(|entry| {
                entry.map(|e| {
                    let file_type = e.file_type().ok();
                    let is_dir = file_type.as_ref().is_some_and(|t| t.is_dir());
                    let is_symlink = file_type.as_ref().is_some_and(|t| t.is_symlink());
                    let size = if is_dir || is_symlink {
                        None
                    } else {
                        e.metadata().ok().map(|meta| meta.len())
                    };
                    (e.file_name().to_string_lossy().into_owned(), is_dir, is_symlink, size)
                })
            })
            .collect::<std::io::Result<Vec<_>>>()
    });
    let mut entries = match listing {
        Ok(entries) => entries,
        Err(err) => {
            return PreviewContent::message(
                PreviewKind::Error,
                vec![format!("Cannot read directory: {err}")],
                0,
            );
        }
    };

    // Directories first, then by name.
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut lines = vec![
        format!("Directory: {}", path.display()),
        format!("Entries: {}", entries.len()),
        String::new(),
    ];
    for (index, (name, is_dir, is_symlink, size)) in entries.iter().enumerate() {
        if index >= MAX_DIR_ENTRIES {
            lines.push(format!("... and {} more entries", entries.len() - index));
            break;
        }
        let tag = if *is_dir {
            "[DIR]  "
        } else if *is_symlink {
            "[LINK] "
        } else {
            "[FILE] "
        };
        let mut line = format!("{tag}{name}");
        if let Some(size) = size {
            line.push_str(&format!(" ({})", format_size(*size, ByteFormat::Binary)));
        }
        lines.push(line);
    }

    PreviewContent {
        kind: PreviewKind::Directory,
        total_lines: lines.len(),
        lines,
        styled: None,
        file_size: 0,
    }
}

fn preview_binary(path: &Path) -> PreviewContent {
    let file_size = fs::metadata(path).map(|meta| meta.len()).unwrap_or(0);
    let mut lines = vec![
        "Binary file".to_string(),
        format!("Size: {}", format_size(file_size, ByteFormat::Binary)),
        format!("Permissions: {}", format_permissions(path)),
    ];

    if let Ok(mut file) = File::open(path) {
        let mut buffer = [0u8; HEX_DUMP_BYTES];
        if let Ok(read) = file.read(&mut buffer) {
            lines.push(String::new());
            lines.push(format!("Hex dump (first {HEX_DUMP_BYTES} bytes):"));
            lines.push(String::new());
            for (row_index, row) in buffer[..read].chunks(16).enumerate() {
                lines.push(hex_dump_row(row, row_index * 16));
            }
        }
    }

    PreviewContent {
        kind: PreviewKind::Binary,
        total_lines: lines.len(),
        lines,
        styled: None,
        file_size,
    }
}

/// One hex-dump line: offset, hex columns split 8/8, ASCII gutter.
fn hex_dump_row(row: &[u8], offset: usize) -> String {
    let mut line = format!("{offset:08X}  ");
    for column in 0..16 {
        match row.get(column) {
            Some(byte) => line.push_str(&format!("{byte:02X} ")),
            None => line.push_str("   "),
        }
        if column == 7 {
            line.push(' ');
        }
    }
    line.push_str(" |");
    for byte in row {
        let c = *byte as char;
        line.push(if c.is_ascii_graphic() || c == ' ' { c } else { '.' });
    }
    line.push('|');
    line
}

fn preview_metadata(path: &Path, kind: PreviewKind) -> PreviewContent {
    let file_size = fs::metadata(path).map(|meta| meta.len()).unwrap_or(0);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let lines = if kind == PreviewKind::Image {
        vec![
            format!("Image file: {name}"),
            format!("Size: {}", format_size(file_size, ByteFormat::Binary)),
            format!("Type: {extension}"),
            String::new(),
            "[Image preview not available in terminal]".to_string(),
            String::new(),
            "Use 'O' to open with the system viewer".to_string(),
        ]
    } else {
        vec![
            format!("Archive file: {name}"),
            format!("Size: {}", format_size(file_size, ByteFormat::Binary)),
            format!("Type: {extension}"),
            String::new(),
            "[Archive contents preview not available]".to_string(),
            String::new(),
            "Use 'O' to open with the system handler".to_string(),
        ]
    };

    PreviewContent {
        kind,
        total_lines: lines.len(),
        lines,
        styled: None,
        file_size,
    }
}

#[cfg(unix)]
fn format_permissions(path: &Path) -> String {
    use std::os::unix::fs::MetadataExt;
    let Ok(meta) = fs::metadata(path) else {
        return "?????????".to_string();
    };
    let mode = meta.mode();
    let mut perms = String::with_capacity(10);
    perms.push(if meta.is_dir() { 'd' } else { '-' });
    for shift in [6u32, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        perms.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        perms.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        perms.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    perms
}

#[cfg(not(unix))]
fn format_permissions(_path: &Path) -> String {
    "?????????".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_text_and_binary() {
        let temp_dir = TempDir::new().unwrap();
        let text = temp_dir.path().join("a.txt");
        std::fs::write(&text, "hello\nworld\n").unwrap();
        assert_eq!(detect_kind(&text), PreviewKind::Text);

        let binary = temp_dir.path().join("a.bin");
        std::fs::write(&binary, b"abc\x00def").unwrap();
        assert_eq!(detect_kind(&binary), PreviewKind::Binary);
    }

    #[test]
    fn test_detect_by_extension() {
        let temp_dir = TempDir::new().unwrap();
        let image = temp_dir.path().join("photo.PNG");
        std::fs::write(&image, b"not really a png").unwrap();
        assert_eq!(detect_kind(&image), PreviewKind::Image);

        let archive = temp_dir.path().join("backup.tar");
        std::fs::write(&archive, b"not really a tar").unwrap();
        assert_eq!(detect_kind(&archive), PreviewKind::Archive);
    }

    #[test]
    fn test_detect_empty_and_missing() {
        let temp_dir = TempDir::new().unwrap();
        let empty = temp_dir.path().join("empty");
        std::fs::write(&empty, b"").unwrap();
        assert_eq!(detect_kind(&empty), PreviewKind::Empty);
        assert_eq!(
            detect_kind(&temp_dir.path().join("missing")),
            PreviewKind::Error
        );
    }

    #[test]
    fn test_tab_and_newline_are_texty() {
        assert!(!is_binary_data(b"col1\tcol2\r\nrow\n"));
        assert!(is_binary_data(b"\x01\x02"));
        assert!(is_binary_data(b"a\x00b"));
    }

    #[test]
    fn test_text_preview_lines() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("notes.txt");
        std::fs::write(&file, "first\nsecond\nthird\n").unwrap();

        let preview = generate_preview(&file);
        assert_eq!(preview.kind, PreviewKind::Text);
        assert_eq!(preview.total_lines, 3);
        assert_eq!(preview.lines[0], "first");
        assert_eq!(preview.lines[2], "third");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("short", 10), "short");
        let cut = truncate_line(&"x".repeat(100), 10);
        assert_eq!(cut.chars().count(), 10);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_directory_preview_sorted_dirs_first() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("zz_file"), b"abc").unwrap();
        std::fs::create_dir(temp_dir.path().join("a_dir")).unwrap();
        std::fs::create_dir(temp_dir.path().join("b_dir")).unwrap();

        let preview = generate_preview(temp_dir.path());
        assert_eq!(preview.kind, PreviewKind::Directory);
        assert!(preview.lines[0].starts_with("Directory: "));
        assert_eq!(preview.lines[1], "Entries: 3");
        assert_eq!(preview.lines[3], "[DIR]  a_dir");
        assert_eq!(preview.lines[4], "[DIR]  b_dir");
        assert!(preview.lines[5].starts_with("[FILE] zz_file (3 B"));
    }

    #[test]
    fn test_binary_preview_hex_dump() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("blob");
        std::fs::write(&file, b"AB\x00\x01CD").unwrap();

        let preview = generate_preview(&file);
        assert_eq!(preview.kind, PreviewKind::Binary);
        assert_eq!(preview.lines[0], "Binary file");
        assert!(preview.lines[2].starts_with("Permissions: "));

        let dump_row = preview.lines.last().unwrap();
        assert!(dump_row.starts_with("00000000  41 42 00 01 43 44"));
        assert!(dump_row.ends_with("|AB..CD|"));
    }

    #[cfg(unix)]
    #[test]
    fn test_permission_string_shape() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("f");
        std::fs::write(&file, b"x").unwrap();
        let perms = format_permissions(&file);
        assert_eq!(perms.len(), 10);
        assert!(perms.starts_with('-'));
        let dir_perms = format_permissions(temp_dir.path());
        assert!(dir_perms.starts_with('d'));
    }

    #[test]
    fn test_empty_preview() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("none");
        std::fs::write(&file, b"").unwrap();
        let preview = generate_preview(&file);
        assert_eq!(preview.kind, PreviewKind::Empty);
        assert_eq!(preview.lines, vec!["Empty file".to_string()]);
    }

    #[test]
    fn test_image_preview_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("pic.png");
        std::fs::write(&file, b"1234").unwrap();
        let preview = generate_preview(&file);
        assert_eq!(preview.kind, PreviewKind::Image);
        assert_eq!(preview.lines[0], "Image file: pic.png");
        assert!(preview.lines[2].ends_with(".png"));
    }
}
