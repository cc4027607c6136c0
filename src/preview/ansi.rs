//! Minimal SGR parser for syntax-highlighter output.
//!
//! `bat` emits 24-bit color escapes; the preview pane works with a small
//! terminal palette. Parsed styles are therefore reduced to ratatui colors
//! through a fixed table for the common Monokai syntax roles, with a
//! dominant-channel plus luminance fallback for everything else. Non-SGR
//! escape sequences are consumed and dropped.

use ratatui::style::{Color, Modifier, Style};

/// One styled run of text within a line.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledSpan {
    pub text: String,
    pub style: Style,
}

/// A preview line as a sequence of styled runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyledLine {
    pub spans: Vec<StyledSpan>,
}

impl StyledLine {
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|span| span.text.as_str()).collect()
    }

    pub fn char_len(&self) -> usize {
        self.spans
            .iter()
            .map(|span| span.text.chars().count())
            .sum()
    }

    /// The sub-line covering `start..start + len` in character positions.
    pub fn slice(&self, start: usize, len: usize) -> StyledLine {
        let mut out = StyledLine::default();
        let mut position = 0usize;
        let end = start.saturating_add(len);
        for span in &self.spans {
            let span_len = span.text.chars().count();
            let span_start = position;
            let span_end = position + span_len;
            position = span_end;
            if span_end <= start {
                continue;
            }
            if span_start >= end {
                break;
            }
            let take_from = start.saturating_sub(span_start);
            let take_to = span_len.min(end - span_start);
            let text: String = span
                .text
                .chars()
                .skip(take_from)
                .take(take_to - take_from)
                .collect();
            if !text.is_empty() {
                out.spans.push(StyledSpan {
                    text,
                    style: span.style,
                });
            }
        }
        out
    }

    /// Cut the line to at most `max` characters.
    pub fn truncated(&self, max: usize) -> StyledLine {
        if self.char_len() <= max {
            self.clone()
        } else {
            self.slice(0, max)
        }
    }

    fn push_char(&mut self, c: char, style: Style) {
        match self.spans.last_mut() {
            Some(last) if last.style == style => last.text.push(c),
            _ => self.spans.push(StyledSpan {
                text: c.to_string(),
                style,
            }),
        }
    }
}

/// Parse highlighter output into styled lines, one per input line.
pub fn parse_lines(input: &str) -> Vec<StyledLine> {
    let mut lines = Vec::new();
    let mut current = StyledLine::default();
    let mut style = Style::default();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\x1b' => {
                if chars.peek() == Some(&'[') {
                    chars.next();
                    let mut params = String::new();
                    let mut terminator = None;
                    for seq_char in chars.by_ref() {
                        if ('\u{40}'..='\u{7e}').contains(&seq_char) {
                            terminator = Some(seq_char);
                            break;
                        }
                        params.push(seq_char);
                    }
                    if terminator == Some('m') {
                        style = apply_sgr(&params, style);
                    }
                } else {
                    // A non-CSI escape; drop the introducer byte too.
                    chars.next();
                }
            }
            '\n' => {
                lines.push(std::mem::take(&mut current));
            }
            '\r' => {}
            _ => current.push_char(c, style),
        }
    }
    if !current.spans.is_empty() {
        lines.push(current);
    }
    lines
}

fn apply_sgr(params: &str, mut style: Style) -> Style {
    let codes: Vec<u16> = params
        .split(';')
        .map(|part| part.parse::<u16>().unwrap_or(0))
        .collect();

    let mut index = 0;
    while index < codes.len() {
        match codes[index] {
            0 => style = Style::default(),
            1 => style = style.add_modifier(Modifier::BOLD),
            4 => style = style.add_modifier(Modifier::UNDERLINED),
            22 => style = style.remove_modifier(Modifier::BOLD),
            24 => style = style.remove_modifier(Modifier::UNDERLINED),
            30..=37 => style = style.fg(basic_color(codes[index] - 30, false)),
            39 => style.fg = None,
            90..=97 => style = style.fg(basic_color(codes[index] - 90, true)),
            38 | 48 => {
                let is_foreground = codes[index] == 38;
                let color = match codes.get(index + 1).copied() {
                    Some(5) => {
                        let n = codes.get(index + 2).copied().unwrap_or(0);
                        index += 2;
                        Some(indexed_color(n))
                    }
                    Some(2) => {
                        let r = codes.get(index + 2).copied().unwrap_or(0) as u8;
                        let g = codes.get(index + 3).copied().unwrap_or(0) as u8;
                        let b = codes.get(index + 4).copied().unwrap_or(0) as u8;
                        index += 4;
                        Some(map_rgb(r, g, b))
                    }
                    _ => None,
                };
                // Background colors are recognized but not kept; the pane
                // paints its own backgrounds.
                if is_foreground {
                    if let Some(color) = color {
                        style = style.fg(color);
                    }
                }
            }
            _ => {}
        }
        index += 1;
    }
    style
}

fn basic_color(code: u16, bright: bool) -> Color {
    match (code, bright) {
        (0, false) => Color::Black,
        (1, false) => Color::Red,
        (2, false) => Color::Green,
        (3, false) => Color::Yellow,
        (4, false) => Color::Blue,
        (5, false) => Color::Magenta,
        (6, false) => Color::Cyan,
        (7, false) => Color::Gray,
        (0, true) => Color::DarkGray,
        (1, true) => Color::LightRed,
        (2, true) => Color::LightGreen,
        (3, true) => Color::LightYellow,
        (4, true) => Color::LightBlue,
        (5, true) => Color::LightMagenta,
        (6, true) => Color::LightCyan,
        _ => Color::White,
    }
}

/// Reduce a 256-color index to the palette.
fn indexed_color(n: u16) -> Color {
    match n {
        0..=7 => basic_color(n, false),
        8..=15 => basic_color(n - 8, true),
        232..=255 => {
            let level = (n - 232) as u8 * 10 + 8;
            map_rgb(level, level, level)
        }
        _ => {
            // 6x6x6 cube.
            let n = n - 16;
            let to_level = |v: u16| -> u8 {
                if v == 0 {
                    0
                } else {
                    (55 + v * 40) as u8
                }
            };
            map_rgb(
                to_level(n / 36),
                to_level((n / 6) % 6),
                to_level(n % 6),
            )
        }
    }
}

/// Exact colors the Monokai Extended theme uses for common syntax roles.
const MONOKAI_ROLES: &[((u8, u8, u8), Color)] = &[
    ((0xf9, 0x26, 0x72), Color::Magenta),      // keyword
    ((0xe6, 0xdb, 0x74), Color::Yellow),       // string
    ((0x75, 0x71, 0x5e), Color::DarkGray),     // comment
    ((0x66, 0xd9, 0xef), Color::Cyan),         // type
    ((0xa6, 0xe2, 0x2e), Color::Green),        // function
    ((0xfd, 0x97, 0x1f), Color::LightRed),     // parameter
    ((0xae, 0x81, 0xff), Color::LightMagenta), // constant
    ((0xf8, 0xf8, 0xf2), Color::White),        // text
];

/// Tolerance per channel when matching against the role table.
const ROLE_TOLERANCE: u8 = 24;

/// Reduce a 24-bit color to one of at most 16 palette slots.
pub fn map_rgb(r: u8, g: u8, b: u8) -> Color {
    for ((role_r, role_g, role_b), color) in MONOKAI_ROLES {
        if r.abs_diff(*role_r) <= ROLE_TOLERANCE
            && g.abs_diff(*role_g) <= ROLE_TOLERANCE
            && b.abs_diff(*role_b) <= ROLE_TOLERANCE
        {
            return *color;
        }
    }

    let luminance = (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000;
    if luminance < 40 {
        return Color::DarkGray;
    }
    if luminance > 215 {
        return Color::White;
    }

    let bright = luminance > 140;
    let near = |a: u8, b: u8| a.abs_diff(b) <= 32;
    if near(r, g) && near(g, b) {
        return if bright { Color::Gray } else { Color::DarkGray };
    }
    if near(r, g) && r > b {
        return if bright { Color::LightYellow } else { Color::Yellow };
    }
    if near(r, b) && r > g {
        return if bright { Color::LightMagenta } else { Color::Magenta };
    }
    if near(g, b) && g > r {
        return if bright { Color::LightCyan } else { Color::Cyan };
    }
    if r >= g && r >= b {
        if bright {
            Color::LightRed
        } else {
            Color::Red
        }
    } else if g >= b {
        if bright {
            Color::LightGreen
        } else {
            Color::Green
        }
    } else if bright {
        Color::LightBlue
    } else {
        Color::Blue
    }
}
