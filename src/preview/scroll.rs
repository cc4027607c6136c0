//! Cursor and viewport state for the scrollable quick-view pane.
//!
//! Pure state machine over the preview's line lengths; drawing and key
//! decoding live in the UI layer, which keeps every motion and search rule
//! testable without a terminal.

/// Cursor, viewport, search and command state for one previewed document.
#[derive(Debug, Default, Clone)]
pub struct ScrollableView {
    pub cursor_x: usize,
    pub cursor_y: usize,
    pub offset_x: usize,
    pub offset_y: usize,
    pub window_width: usize,
    pub window_height: usize,
    pub content_height: usize,
    pub max_line_length: usize,
    line_lengths: Vec<usize>,

    pub search_pattern: String,
    search_matches: Vec<(usize, usize)>,
    current_match: usize,
    /// A committed search has matches to navigate.
    pub search_active: bool,
    /// The pattern is currently being typed.
    pub search_input: bool,

    pub command_buffer: String,
    pub command_active: bool,
}

impl ScrollableView {
    pub fn reset(&mut self) {
        *self = ScrollableView {
            window_width: self.window_width,
            window_height: self.window_height,
            ..ScrollableView::default()
        };
    }

    pub fn update_window_size(&mut self, width: usize, height: usize) {
        self.window_width = width;
        self.window_height = height;
        self.ensure_cursor_visible();
    }

    /// Re-derive per-line metrics from the preview content.
    pub fn update_content(&mut self, lines: &[String]) {
        self.line_lengths = lines.iter().map(|line| line.chars().count()).collect();
        self.content_height = self.line_lengths.len();
        self.max_line_length = self.line_lengths.iter().copied().max().unwrap_or(0);
        self.cursor_y = self.cursor_y.min(self.content_height.saturating_sub(1));
        self.clamp_cursor_x();
        self.ensure_cursor_visible();
    }

    pub fn line_len(&self, line: usize) -> usize {
        self.line_lengths.get(line).copied().unwrap_or(0)
    }

    fn current_line_len(&self) -> usize {
        self.line_len(self.cursor_y)
    }

    /// Columns clamp to the last character; empty lines pin to column 0.
    fn clamp_cursor_x(&mut self) {
        self.cursor_x = self.cursor_x.min(self.current_line_len().saturating_sub(1));
    }

    fn ensure_cursor_visible(&mut self) {
        if self.window_height > 0 {
            if self.cursor_y < self.offset_y {
                self.offset_y = self.cursor_y;
            } else if self.cursor_y >= self.offset_y + self.window_height {
                self.offset_y = self.cursor_y - self.window_height + 1;
            }
        }
        if self.window_width > 0 {
            if self.cursor_x < self.offset_x {
                self.offset_x = self.cursor_x;
            } else if self.cursor_x >= self.offset_x + self.window_width {
                self.offset_x = self.cursor_x - self.window_width + 1;
            }
        }
    }

    pub fn move_up(&mut self) {
        if self.cursor_y > 0 {
            self.cursor_y -= 1;
            self.clamp_cursor_x();
            self.ensure_cursor_visible();
        }
    }

    pub fn move_down(&mut self) {
        if self.cursor_y + 1 < self.content_height {
            self.cursor_y += 1;
            self.clamp_cursor_x();
            self.ensure_cursor_visible();
        }
    }

    pub fn move_left(&mut self) {
        if self.cursor_x > 0 {
            self.cursor_x -= 1;
            self.ensure_cursor_visible();
        }
    }

    pub fn move_right(&mut self) {
        let len = self.current_line_len();
        if len > 0 && self.cursor_x + 1 < len {
            self.cursor_x += 1;
            self.ensure_cursor_visible();
        }
    }

    pub fn page_up(&mut self) {
        self.cursor_y = self.cursor_y.saturating_sub(self.window_height.max(1));
        self.clamp_cursor_x();
        self.ensure_cursor_visible();
    }

    pub fn page_down(&mut self) {
        if self.content_height == 0 {
            return;
        }
        self.cursor_y = (self.cursor_y + self.window_height.max(1)).min(self.content_height - 1);
        self.clamp_cursor_x();
        self.ensure_cursor_visible();
    }

    pub fn move_home(&mut self) {
        self.cursor_y = 0;
        self.clamp_cursor_x();
        self.ensure_cursor_visible();
    }

    pub fn move_end(&mut self) {
        self.cursor_y = self.content_height.saturating_sub(1);
        self.clamp_cursor_x();
        self.ensure_cursor_visible();
    }

    pub fn move_line_start(&mut self) {
        self.cursor_x = 0;
        self.ensure_cursor_visible();
    }

    pub fn move_line_end(&mut self) {
        self.cursor_x = self.current_line_len().saturating_sub(1);
        self.ensure_cursor_visible();
    }

    pub fn start_search(&mut self) {
        self.search_input = true;
        self.search_active = false;
        self.search_pattern.clear();
        self.search_matches.clear();
    }

    pub fn push_search_char(&mut self, c: char) {
        self.search_pattern.push(c);
    }

    pub fn pop_search_char(&mut self) {
        self.search_pattern.pop();
    }

    pub fn cancel_search(&mut self) {
        self.search_input = false;
        self.search_active = false;
        self.search_pattern.clear();
        self.search_matches.clear();
    }

    pub fn commit_search(&mut self, lines: &[String]) {
        self.search_input = false;
        self.perform_search(lines);
    }

    /// Scan every line for the pattern (case-insensitive substring) and jump
    /// to the match nearest the cursor, line distance dominant.
    pub fn perform_search(&mut self, lines: &[String]) {
        self.search_matches.clear();
        self.current_match = 0;
        if self.search_pattern.is_empty() {
            self.search_active = false;
            return;
        }

        let needle: Vec<char> = self
            .search_pattern
            .chars()
            .map(|c| c.to_ascii_lowercase())
            .collect();
        for (line_index, line) in lines.iter().enumerate() {
            let haystack: Vec<char> = line.chars().map(|c| c.to_ascii_lowercase()).collect();
            if haystack.len() < needle.len() {
                continue;
            }
            for start in 0..=haystack.len() - needle.len() {
                if haystack[start..start + needle.len()] == needle[..] {
                    self.search_matches.push((line_index, start));
                }
            }
        }

        if self.search_matches.is_empty() {
            self.search_active = false;
            return;
        }
        self.search_active = true;

        let (cy, cx) = (self.cursor_y, self.cursor_x);
        let nearest = self
            .search_matches
            .iter()
            .enumerate()
            .min_by_key(|(_, (line, col))| (line.abs_diff(cy), col.abs_diff(cx)))
            .map(|(index, _)| index)
            .unwrap_or(0);
        self.move_to_match(nearest);
    }

    /// Jump to the first match after the cursor, wrapping to the start.
    pub fn next_match(&mut self) {
        if self.search_matches.is_empty() {
            return;
        }
        let position = (self.cursor_y, self.cursor_x);
        let next = self
            .search_matches
            .iter()
            .position(|&candidate| candidate > position)
            .unwrap_or(0);
        self.move_to_match(next);
    }

    /// Jump to the last match before the cursor, wrapping to the end.
    pub fn prev_match(&mut self) {
        if self.search_matches.is_empty() {
            return;
        }
        let position = (self.cursor_y, self.cursor_x);
        let prev = self
            .search_matches
            .iter()
            .rposition(|&candidate| candidate < position)
            .unwrap_or(self.search_matches.len() - 1);
        self.move_to_match(prev);
    }

    fn move_to_match(&mut self, index: usize) {
        if let Some(&(line, column)) = self.search_matches.get(index) {
            self.current_match = index;
            self.cursor_y = line;
            self.cursor_x = column;
            self.clamp_cursor_x();
            self.ensure_cursor_visible();
        }
    }

    /// Re-run the search with the `[A-Za-z0-9_]+` token under the cursor.
    pub fn search_word_under_cursor(&mut self, lines: &[String]) {
        let Some(line) = lines.get(self.cursor_y) else {
            return;
        };
        let chars: Vec<char> = line.chars().collect();
        let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';
        if self.cursor_x >= chars.len() || !is_word(chars[self.cursor_x]) {
            return;
        }

        let mut start = self.cursor_x;
        while start > 0 && is_word(chars[start - 1]) {
            start -= 1;
        }
        let mut end = self.cursor_x + 1;
        while end < chars.len() && is_word(chars[end]) {
            end += 1;
        }

        self.search_pattern = chars[start..end].iter().collect();
        self.perform_search(lines);
    }

    pub fn has_matches(&self) -> bool {
        !self.search_matches.is_empty()
    }

    pub fn match_count(&self) -> usize {
        self.search_matches.len()
    }

    pub fn current_match_index(&self) -> usize {
        self.current_match
    }

    pub fn start_command(&mut self) {
        self.command_active = true;
        self.command_buffer.clear();
    }

    pub fn push_command_char(&mut self, c: char) {
        self.command_buffer.push(c);
    }

    pub fn pop_command_char(&mut self) {
        self.command_buffer.pop();
    }

    pub fn cancel_command(&mut self) {
        self.command_active = false;
        self.command_buffer.clear();
    }

    /// Apply a `:` command: digits jump to that 1-based line centered in the
    /// window, `$` jumps to the last line. Anything else is ignored.
    pub fn commit_command(&mut self) {
        let buffer = std::mem::take(&mut self.command_buffer);
        self.command_active = false;

        if buffer == "$" {
            self.move_end();
            self.center_on_cursor();
            return;
        }
        if let Ok(line) = buffer.parse::<usize>() {
            if line >= 1 && self.content_height > 0 {
                self.cursor_y = (line - 1).min(self.content_height - 1);
                self.cursor_x = 0;
                self.clamp_cursor_x();
                self.center_on_cursor();
            }
        }
    }

    fn center_on_cursor(&mut self) {
        if self.window_height > 0 {
            self.offset_y = self.cursor_y.saturating_sub(self.window_height / 2);
        }
        self.ensure_cursor_visible();
    }
}
