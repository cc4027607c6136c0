//! The interactive browser's state machine.
//!
//! Owns the scanned roots, the navigation stack, the sorted view of the
//! current directory, the mark pane, and every operation the key map can
//! trigger. Drawing reads this state; nothing here touches the terminal, so
//! the whole machine is exercised directly by tests.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent};

use crate::config::Config;
use crate::fmt::format_size;
use crate::glob::glob_match;
use crate::scanner::Scanner;
use crate::tree::Entry;

use super::input::{self, Command, Mode};
use super::mark::{MarkPane, PaneTab};

/// Which side of the split owns input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Main,
    Pane,
}

/// Active sort order of the entry list. Pressing a sort key again flips the
/// direction of that key's column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    SizeDesc,
    SizeAsc,
    NameAsc,
    NameDesc,
    TimeDesc,
    TimeAsc,
    CountDesc,
    CountAsc,
}

impl SortMode {
    fn toggled_size(self) -> Self {
        if self == SortMode::SizeDesc {
            SortMode::SizeAsc
        } else {
            SortMode::SizeDesc
        }
    }

    fn toggled_name(self) -> Self {
        if self == SortMode::NameAsc {
            SortMode::NameDesc
        } else {
            SortMode::NameAsc
        }
    }

    fn toggled_time(self) -> Self {
        if self == SortMode::TimeDesc {
            SortMode::TimeAsc
        } else {
            SortMode::TimeDesc
        }
    }

    fn toggled_count(self) -> Self {
        if self == SortMode::CountDesc {
            SortMode::CountAsc
        } else {
            SortMode::CountDesc
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortMode::SizeDesc => "size descending",
            SortMode::SizeAsc => "size ascending",
            SortMode::NameAsc => "name ascending",
            SortMode::NameDesc => "name descending",
            SortMode::TimeDesc => "modified descending",
            SortMode::TimeAsc => "modified ascending",
            SortMode::CountDesc => "count descending",
            SortMode::CountAsc => "count ascending",
        }
    }
}

/// Pre-formatted strings for one entry row, cached per entry identity so
/// cursor movement repaints without re-formatting the whole view.
#[derive(Debug, Clone)]
pub struct CachedRow {
    pub size: String,
    pub mtime: String,
    pub count: String,
    pub name: String,
    pub percent: f64,
}

pub struct App {
    pub config: Config,
    pub roots: Vec<Arc<Entry>>,
    pub current_dir: Arc<Entry>,
    pub nav_stack: Vec<Arc<Entry>>,
    pub current_view: Vec<Arc<Entry>>,
    pub selected: usize,
    pub view_offset: usize,
    /// Rows the list area can show; the draw pass keeps this current.
    pub list_height: usize,

    pub mode: Mode,
    pub focus: Focus,
    pub sort_mode: SortMode,
    pub show_mtime: bool,
    pub show_count: bool,
    pub glob_pattern: String,
    pub confirm_input: String,
    pub mark_pane: MarkPane,

    format_cache: HashMap<usize, CachedRow>,
    pub needs_full_redraw: bool,
    pub should_quit: bool,
}

impl App {
    /// Multiple scan roots are joined under an in-memory virtual root so the
    /// navigation stack always has a single bottom.
    pub fn new(roots: Vec<Arc<Entry>>, config: Config) -> Self {
        let mut app = Self {
            config,
            roots,
            current_dir: Entry::virtual_dir(""),
            nav_stack: Vec::new(),
            current_view: Vec::new(),
            selected: 0,
            view_offset: 0,
            list_height: 20,
            mode: Mode::Browsing,
            focus: Focus::Main,
            sort_mode: SortMode::default(),
            show_mtime: false,
            show_count: false,
            glob_pattern: String::new(),
            confirm_input: String::new(),
            mark_pane: MarkPane::new(),
            format_cache: HashMap::new(),
            needs_full_redraw: true,
            should_quit: false,
        };
        app.rebuild_navigation();
        app
    }

    fn rebuild_navigation(&mut self) {
        let bottom = if self.roots.len() > 1 {
            let virtual_root = Entry::virtual_dir("");
            for root in &self.roots {
                virtual_root.push_child(root.clone());
                virtual_root.add_size(root.size());
                virtual_root.add_apparent_size(root.apparent_size());
                virtual_root.add_entry_count(root.entry_count());
            }
            virtual_root
        } else {
            self.roots[0].clone()
        };
        self.current_dir = bottom.clone();
        self.nav_stack = vec![bottom];
        self.selected = 0;
        self.view_offset = 0;
        self.update_view();
    }

    /// Snapshot and sort the current directory's children.
    pub fn update_view(&mut self) {
        self.current_view = self.current_dir.children_snapshot();
        self.apply_sort();
        self.format_cache.clear();
        if self.selected >= self.current_view.len() {
            self.selected = self.current_view.len().saturating_sub(1);
        }
        self.needs_full_redraw = true;
    }

    fn apply_sort(&mut self) {
        let sort_mode = self.sort_mode;
        self.current_view.sort_by(|a, b| {
            let by_name = || a.name().cmp(b.name());
            match sort_mode {
                SortMode::SizeDesc => b.size().cmp(&a.size()).then_with(by_name),
                SortMode::SizeAsc => a.size().cmp(&b.size()).then_with(by_name),
                SortMode::NameAsc => by_name(),
                SortMode::NameDesc => b.name().cmp(a.name()),
                SortMode::TimeDesc => b.mtime().cmp(&a.mtime()).then_with(by_name),
                SortMode::TimeAsc => a.mtime().cmp(&b.mtime()).then_with(by_name),
                SortMode::CountDesc => b.entry_count().cmp(&a.entry_count()).then_with(by_name),
                SortMode::CountAsc => a.entry_count().cmp(&b.entry_count()).then_with(by_name),
            }
        });
    }

    pub fn selected_entry(&self) -> Option<Arc<Entry>> {
        self.current_view.get(self.selected).cloned()
    }

    pub fn is_browsing_main(&self) -> bool {
        self.mode == Mode::Browsing && self.focus == Focus::Main
    }

    /// Route one key press according to mode and focus.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.mode == Mode::Browsing && self.focus == Focus::Pane {
            self.handle_pane_key(key.code);
            return;
        }
        let command = input::handle_key(key, self.mode);
        self.handle_command(command);
    }

    pub fn handle_command(&mut self, command: Command) {
        match command {
            Command::MoveUp => self.apply_movement(-1),
            Command::MoveDown => self.apply_movement(1),
            Command::PageUp => self.apply_movement(-(self.list_height as i64)),
            Command::PageDown => self.apply_movement(self.list_height as i64),
            Command::GotoTop => {
                self.selected = 0;
                self.view_offset = 0;
            }
            Command::GotoBottom => {
                self.selected = self.current_view.len().saturating_sub(1);
                self.ensure_visible();
            }
            Command::Enter => self.enter_directory(),
            Command::Exit => self.exit_directory(),
            Command::ToggleMark => self.toggle_mark(),
            Command::ToggleAllMarks => self.toggle_all_marks(),
            Command::Delete => self.delete_key(),
            Command::QuickView => self.activate_quickview(),
            Command::ClearQuickView => self.clear_quickview(),
            Command::SwitchFocus => self.switch_focus(),
            Command::StartGlobSearch => {
                self.mode = Mode::GlobSearch;
                self.glob_pattern.clear();
            }
            Command::GlobInput(c) => self.glob_pattern.push(c),
            Command::GlobBackspace => {
                self.glob_pattern.pop();
            }
            Command::GlobConfirm => {
                self.perform_glob_search();
                self.mode = Mode::Browsing;
                self.needs_full_redraw = true;
            }
            Command::GlobCancel => {
                self.glob_pattern.clear();
                self.mode = Mode::Browsing;
                self.needs_full_redraw = true;
            }
            Command::RefreshSelected => self.refresh_selected(),
            Command::RefreshAll => self.refresh_all(),
            Command::OpenExternal => self.open_selected(),
            Command::SortBySize => self.set_sort(self.sort_mode.toggled_size()),
            Command::SortByName => self.set_sort(self.sort_mode.toggled_name()),
            Command::SortByTime => self.set_sort(self.sort_mode.toggled_time()),
            Command::SortByCount => self.set_sort(self.sort_mode.toggled_count()),
            Command::ToggleMtimeColumn => {
                self.show_mtime = !self.show_mtime;
                self.format_cache.clear();
                self.needs_full_redraw = true;
            }
            Command::ToggleCountColumn => {
                self.show_count = !self.show_count;
                self.format_cache.clear();
                self.needs_full_redraw = true;
            }
            Command::ShowHelp => self.mode = Mode::Help,
            Command::CloseHelp => {
                self.mode = Mode::Browsing;
                self.needs_full_redraw = true;
            }
            Command::ConfirmInput(c) => self.confirm_input.push(c),
            Command::ConfirmBackspace => {
                self.confirm_input.pop();
            }
            Command::ConfirmSubmit => {
                let confirmed = self.confirm_input == "YES";
                self.confirm_input.clear();
                self.mode = Mode::Browsing;
                if confirmed {
                    self.delete_marked();
                }
                self.needs_full_redraw = true;
            }
            Command::ConfirmCancel => {
                self.confirm_input.clear();
                self.mode = Mode::Browsing;
                self.needs_full_redraw = true;
            }
            Command::Quit => {
                if self.mode == Mode::Browsing {
                    self.should_quit = true;
                }
            }
            Command::Noop => {}
        }
    }

    /// Apply an accumulated up/down delta in one jump.
    pub fn apply_movement(&mut self, delta: i64) {
        if self.current_view.is_empty() || delta == 0 {
            return;
        }
        let last = self.current_view.len() - 1;
        let current = self.selected as i64;
        self.selected = (current + delta).clamp(0, last as i64) as usize;
        self.ensure_visible();
    }

    fn ensure_visible(&mut self) {
        let height = self.list_height.max(1);
        if self.selected < self.view_offset {
            self.view_offset = self.selected;
        } else if self.selected >= self.view_offset + height {
            self.view_offset = self.selected - height + 1;
        }
    }

    /// Regenerate the preview for the newly selected row, if one is active.
    pub fn refresh_quickview(&mut self) {
        if self.mark_pane.quickview_active() {
            if let Some(entry) = self.selected_entry() {
                self.mark_pane.activate_quickview(entry.path());
            }
        }
    }

    fn enter_directory(&mut self) {
        let Some(entry) = self.selected_entry() else {
            return;
        };
        if entry.is_dir() && !entry.is_symlink() && entry.child_count() > 0 {
            self.current_dir = entry.clone();
            self.nav_stack.push(entry);
            self.selected = 0;
            self.view_offset = 0;
            self.update_view();
        }
    }

    fn exit_directory(&mut self) {
        if self.nav_stack.len() > 1 {
            self.nav_stack.pop();
            self.current_dir = self.nav_stack.last().unwrap().clone();
            self.selected = 0;
            self.view_offset = 0;
            self.update_view();
        }
    }

    fn switch_focus(&mut self) {
        if !self.mark_pane.is_visible() {
            return;
        }
        match self.focus {
            Focus::Main => {
                self.focus = Focus::Pane;
                self.mark_pane.set_focus(true);
            }
            Focus::Pane => self.focus_main(),
        }
        self.needs_full_redraw = true;
    }

    fn focus_main(&mut self) {
        self.focus = Focus::Main;
        self.mark_pane.set_focus(false);
        self.needs_full_redraw = true;
    }

    fn toggle_mark(&mut self) {
        if let Some(entry) = self.selected_entry() {
            entry.toggle_marked();
            self.mark_pane.update(&self.roots);
            if !self.mark_pane.is_empty() {
                self.mark_pane.switch_tab(PaneTab::MarkedFiles);
            }
            self.needs_full_redraw = true;
        }
    }

    fn toggle_all_marks(&mut self) {
        let any_marked = self.current_view.iter().any(|entry| entry.is_marked());
        for entry in &self.current_view {
            entry.set_marked(!any_marked);
        }
        self.mark_pane.update(&self.roots);
        if !self.mark_pane.is_empty() {
            self.mark_pane.switch_tab(PaneTab::MarkedFiles);
        }
        self.needs_full_redraw = true;
    }

    /// `d` deletes when the mark set is non-empty, otherwise marks the
    /// selected entry and advances.
    fn delete_key(&mut self) {
        if !self.mark_pane.is_empty() {
            self.mode = Mode::DeleteConfirm;
            self.confirm_input.clear();
        } else if let Some(entry) = self.selected_entry() {
            entry.set_marked(true);
            self.mark_pane.update(&self.roots);
            self.mark_pane.switch_tab(PaneTab::MarkedFiles);
            self.apply_movement(1);
            self.needs_full_redraw = true;
        }
    }

    /// Remove every marked entry from disk, continuing past failures, then
    /// re-scan so sizes reconcile. Entries that could not be deleted keep
    /// their mark and reappear after the refresh.
    fn delete_marked(&mut self) {
        for entry in self.mark_pane.marked_entries() {
            if !self.config.no_entry_check && !entry.path().exists() {
                entry.set_marked(false);
                continue;
            }
            let removed = if entry.is_dir() && !entry.is_symlink() {
                fs::remove_dir_all(entry.path())
            } else {
                fs::remove_file(entry.path())
            };
            if removed.is_ok() {
                entry.set_marked(false);
                self.current_dir.remove_child(&entry);
            }
        }
        self.refresh_all();
    }

    fn collect_marked_paths(&self) -> HashSet<PathBuf> {
        self.mark_pane
            .rows()
            .iter()
            .map(|item| item.entry.path().to_path_buf())
            .collect()
    }

    fn restore_marks(entry: &Arc<Entry>, marked: &HashSet<PathBuf>) {
        if marked.contains(entry.path()) {
            entry.set_marked(true);
        }
        if entry.is_dir() && !entry.is_symlink() {
            for child in entry.children_snapshot() {
                Self::restore_marks(&child, marked);
            }
        }
    }

    /// Re-scan the selected directory and splice the fresh subtree in,
    /// preserving marks wherever paths persist.
    fn refresh_selected(&mut self) {
        let Some(entry) = self.selected_entry() else {
            return;
        };
        if !entry.is_dir() || entry.is_symlink() {
            return;
        }
        if !self.config.no_entry_check && !entry.path().exists() {
            return;
        }

        let marked = self.collect_marked_paths();
        let scanner = Scanner::new(self.config.clone());
        let Ok(fresh) = scanner.scan(&[entry.path().to_path_buf()]) else {
            return;
        };
        let Some(fresh_root) = fresh.into_iter().next() else {
            return;
        };

        entry.replace_children(fresh_root.take_children());
        entry.set_size(fresh_root.size());
        entry.set_apparent_size(fresh_root.apparent_size());
        entry.set_entry_count(fresh_root.entry_count());
        Self::restore_marks(&entry, &marked);

        self.mark_pane.update(&self.roots);
        self.update_view();
    }

    /// Re-scan every root from disk and rebuild the navigation stack,
    /// preserving marks wherever paths persist.
    fn refresh_all(&mut self) {
        let marked = self.collect_marked_paths();
        let scanner = Scanner::new(self.config.clone());
        let Ok(fresh_roots) = scanner.scan(&self.config.paths) else {
            return;
        };
        for root in &fresh_roots {
            Self::restore_marks(root, &marked);
        }
        self.roots = fresh_roots;
        self.rebuild_navigation();
        self.mark_pane.update(&self.roots);
        self.needs_full_redraw = true;
    }

    fn activate_quickview(&mut self) {
        if let Some(entry) = self.selected_entry() {
            self.mark_pane.activate_quickview(entry.path());
            self.needs_full_redraw = true;
        }
    }

    fn clear_quickview(&mut self) {
        self.mark_pane.deactivate_quickview();
        if !self.mark_pane.is_empty() {
            self.mark_pane.switch_tab(PaneTab::MarkedFiles);
        } else if self.focus == Focus::Pane {
            self.focus_main();
        }
        self.needs_full_redraw = true;
    }

    /// Install the glob results as a synthetic directory on the stack.
    fn perform_glob_search(&mut self) {
        if self.glob_pattern.is_empty() {
            return;
        }
        let mut matches = Vec::new();
        Self::search_entries(&self.current_dir, &self.glob_pattern, &mut matches);
        if matches.is_empty() {
            return;
        }

        let results = Entry::virtual_dir("[Search Results]");
        for matched in &matches {
            results.push_child(matched.clone());
            results.add_size(matched.size());
            results.add_apparent_size(matched.apparent_size());
            results.add_entry_count(matched.entry_count());
        }
        self.current_dir = results.clone();
        self.nav_stack.push(results);
        self.selected = 0;
        self.view_offset = 0;
        self.update_view();
    }

    fn search_entries(root: &Arc<Entry>, pattern: &str, matches: &mut Vec<Arc<Entry>>) {
        if glob_match(pattern, root.name()) {
            matches.push(root.clone());
        }
        if root.is_dir() && !root.is_symlink() {
            for child in root.children_snapshot() {
                Self::search_entries(&child, pattern, matches);
            }
        }
    }

    fn open_selected(&self) {
        if let Some(entry) = self.selected_entry() {
            let _ = open::that_detached(entry.path());
        }
    }

    fn set_sort(&mut self, sort_mode: SortMode) {
        self.sort_mode = sort_mode;
        self.update_view();
    }

    /// Keys while the right pane is focused.
    fn handle_pane_key(&mut self, code: KeyCode) {
        if self.mark_pane.tab == PaneTab::QuickView
            && self.mark_pane.quickview_active()
            && self.handle_quickview_key(code)
        {
            return;
        }

        match code {
            KeyCode::Char('1') => self.mark_pane.switch_tab(PaneTab::QuickView),
            KeyCode::Char('2') => self.mark_pane.switch_tab(PaneTab::MarkedFiles),
            KeyCode::Up | KeyCode::Char('k') => self.mark_pane.navigate_up(),
            KeyCode::Down | KeyCode::Char('j') => self.mark_pane.navigate_down(),
            KeyCode::PageUp => self.mark_pane.navigate_page_up(),
            KeyCode::PageDown => self.mark_pane.navigate_page_down(),
            KeyCode::Home => self.mark_pane.navigate_home(),
            KeyCode::End => self.mark_pane.navigate_end(),
            KeyCode::Char(' ') | KeyCode::Char('x') | KeyCode::Char('d') => {
                self.mark_pane.remove_selected();
                if !self.mark_pane.is_visible() {
                    self.focus_main();
                }
                self.needs_full_redraw = true;
            }
            KeyCode::Char('a') | KeyCode::Char('A') => {
                self.mark_pane.remove_all();
                if !self.mark_pane.is_visible() {
                    self.focus_main();
                }
                self.needs_full_redraw = true;
            }
            KeyCode::Tab | KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.focus_main();
            }
            _ => {}
        }
    }

    /// Scroll, search and command keys for the focused quick-view tab.
    /// Returns false for keys the caller should still handle.
    fn handle_quickview_key(&mut self, code: KeyCode) -> bool {
        if self.mark_pane.scroll.search_input {
            match code {
                KeyCode::Esc => self.mark_pane.scroll.cancel_search(),
                KeyCode::Enter => self.mark_pane.scroll_commit_search(),
                KeyCode::Backspace => self.mark_pane.scroll.pop_search_char(),
                KeyCode::Char(c) => self.mark_pane.scroll.push_search_char(c),
                _ => {}
            }
            return true;
        }
        if self.mark_pane.scroll.command_active {
            match code {
                KeyCode::Esc => self.mark_pane.scroll.cancel_command(),
                KeyCode::Enter => self.mark_pane.scroll.commit_command(),
                KeyCode::Backspace => self.mark_pane.scroll.pop_command_char(),
                KeyCode::Char(c) => self.mark_pane.scroll.push_command_char(c),
                _ => {}
            }
            return true;
        }

        match code {
            KeyCode::Up | KeyCode::Char('k') => self.mark_pane.scroll.move_up(),
            KeyCode::Down | KeyCode::Char('j') => self.mark_pane.scroll.move_down(),
            KeyCode::Left | KeyCode::Char('h') => self.mark_pane.scroll.move_left(),
            KeyCode::Right | KeyCode::Char('l') => self.mark_pane.scroll.move_right(),
            KeyCode::PageUp | KeyCode::Char('b') => self.mark_pane.scroll.page_up(),
            KeyCode::PageDown | KeyCode::Char('f') => self.mark_pane.scroll.page_down(),
            KeyCode::Home | KeyCode::Char('g') => self.mark_pane.scroll.move_home(),
            KeyCode::End | KeyCode::Char('G') => self.mark_pane.scroll.move_end(),
            KeyCode::Char('0') => self.mark_pane.scroll.move_line_start(),
            KeyCode::Char('$') => self.mark_pane.scroll.move_line_end(),
            KeyCode::Char('/') => self.mark_pane.scroll.start_search(),
            KeyCode::Char('n') => self.mark_pane.scroll.next_match(),
            KeyCode::Char('N') => self.mark_pane.scroll.prev_match(),
            KeyCode::Char('*') => self.mark_pane.scroll_word_search(),
            KeyCode::Char(':') => self.mark_pane.scroll.start_command(),
            KeyCode::Tab
            | KeyCode::Esc
            | KeyCode::Char('q')
            | KeyCode::Char('Q')
            | KeyCode::Char('1')
            | KeyCode::Char('2') => return false,
            _ => {}
        }
        true
    }

    /// Formatted strings for a view row, cached by entry identity.
    pub fn cached_row(&mut self, index: usize) -> Option<CachedRow> {
        let entry = self.current_view.get(index)?.clone();
        let key = Arc::as_ptr(&entry) as usize;
        if let Some(row) = self.format_cache.get(&key) {
            return Some(row.clone());
        }

        let parent_size = self.current_dir.size();
        let percent = if parent_size > 0 {
            entry.size() as f64 / parent_size as f64 * 100.0
        } else {
            0.0
        };
        let mtime: DateTime<Local> = entry.mtime().into();
        let count = if entry.entry_count() > 0 {
            entry.entry_count().to_string()
        } else {
            "-".to_string()
        };
        let name = if entry.is_symlink() {
            let target = entry
                .symlink_target()
                .map(|t| t.display().to_string())
                .unwrap_or_default();
            format!(" {} -> {}", entry.name(), target)
        } else if entry.is_dir() {
            format!("/{}", entry.name())
        } else {
            format!(" {}", entry.name())
        };

        let row = CachedRow {
            size: format_size(entry.size(), self.config.format),
            mtime: mtime.format("%Y-%m-%d %H:%M").to_string(),
            count,
            name,
            percent,
        };
        self.format_cache.insert(key, row.clone());
        Some(row)
    }

    /// Paths of everything still marked, dumped to stdout on exit.
    pub fn marked_paths(&self) -> Vec<PathBuf> {
        self.mark_pane
            .rows()
            .iter()
            .map(|item| item.entry.path().to_path_buf())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ByteFormat;
    use std::path::Path;
    use tempfile::TempDir;

    fn scan_config(paths: Vec<PathBuf>) -> Config {
        Config {
            apparent_size: true,
            show_progress: false,
            thread_count: 1,
            format: ByteFormat::Metric,
            paths,
            ..Config::default()
        }
    }

    fn app_over(path: &Path) -> App {
        let config = scan_config(vec![path.to_path_buf()]);
        let scanner = Scanner::new(config.clone());
        let roots = scanner.scan(&config.paths).unwrap();
        App::new(roots, config)
    }

    fn select_by_name(app: &mut App, name: &str) {
        let index = app
            .current_view
            .iter()
            .position(|entry| entry.name() == name)
            .unwrap();
        app.selected = index;
    }

    #[test]
    fn test_enter_and_exit_directory() {
        let temp_dir = TempDir::new().unwrap();
        let sub = temp_dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("inner"), b"1234").unwrap();
        std::fs::write(temp_dir.path().join("outer"), b"12").unwrap();

        let mut app = app_over(temp_dir.path());
        assert_eq!(app.nav_stack.len(), 1);

        select_by_name(&mut app, "sub");
        app.handle_command(Command::Enter);
        assert_eq!(app.nav_stack.len(), 2);
        assert_eq!(app.current_view.len(), 1);
        assert_eq!(app.current_view[0].name(), "inner");

        app.handle_command(Command::Exit);
        assert_eq!(app.nav_stack.len(), 1);
        // The bottom of the stack never pops.
        app.handle_command(Command::Exit);
        assert_eq!(app.nav_stack.len(), 1);
    }

    #[test]
    fn test_enter_requires_nonempty_directory() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("empty")).unwrap();
        std::fs::write(temp_dir.path().join("file"), b"x").unwrap();

        let mut app = app_over(temp_dir.path());
        select_by_name(&mut app, "empty");
        app.handle_command(Command::Enter);
        assert_eq!(app.nav_stack.len(), 1);

        select_by_name(&mut app, "file");
        app.handle_command(Command::Enter);
        assert_eq!(app.nav_stack.len(), 1);
    }

    #[test]
    fn test_movement_clamps_and_batches() {
        let temp_dir = TempDir::new().unwrap();
        for i in 0..5 {
            std::fs::write(temp_dir.path().join(format!("f{i}")), vec![0u8; i + 1]).unwrap();
        }
        let mut app = app_over(temp_dir.path());

        app.apply_movement(3);
        assert_eq!(app.selected, 3);
        app.apply_movement(100);
        assert_eq!(app.selected, 4);
        app.apply_movement(-100);
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn test_sort_key_toggles_direction() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("big"), vec![0u8; 30]).unwrap();
        std::fs::write(temp_dir.path().join("small"), vec![0u8; 5]).unwrap();

        let mut app = app_over(temp_dir.path());
        assert_eq!(app.sort_mode, SortMode::SizeDesc);
        assert_eq!(app.current_view[0].name(), "big");

        app.handle_command(Command::SortBySize);
        assert_eq!(app.sort_mode, SortMode::SizeAsc);
        assert_eq!(app.current_view[0].name(), "small");

        app.handle_command(Command::SortByName);
        assert_eq!(app.sort_mode, SortMode::NameAsc);
        assert_eq!(app.current_view[0].name(), "big");
        app.handle_command(Command::SortByName);
        assert_eq!(app.sort_mode, SortMode::NameDesc);
        assert_eq!(app.current_view[0].name(), "small");
    }

    #[test]
    fn test_mark_toggle_updates_pane_visibility() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a"), b"xx").unwrap();

        let mut app = app_over(temp_dir.path());
        assert!(!app.mark_pane.is_visible());

        app.handle_command(Command::ToggleMark);
        assert!(app.mark_pane.is_visible());
        assert_eq!(app.mark_pane.count(), 1);
        assert_eq!(app.mark_pane.tab, PaneTab::MarkedFiles);

        app.handle_command(Command::ToggleMark);
        assert!(!app.mark_pane.is_visible());
    }

    #[test]
    fn test_toggle_all_marks() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a"), b"1").unwrap();
        std::fs::write(temp_dir.path().join("b"), b"22").unwrap();

        let mut app = app_over(temp_dir.path());
        app.handle_command(Command::ToggleAllMarks);
        assert_eq!(app.mark_pane.count(), 2);
        app.handle_command(Command::ToggleAllMarks);
        assert_eq!(app.mark_pane.count(), 0);
    }

    #[test]
    fn test_delete_key_marks_and_advances_when_nothing_marked() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a"), vec![0u8; 9]).unwrap();
        std::fs::write(temp_dir.path().join("b"), vec![0u8; 3]).unwrap();

        let mut app = app_over(temp_dir.path());
        app.selected = 0;
        app.handle_command(Command::Delete);
        assert_eq!(app.mode, Mode::Browsing);
        assert_eq!(app.mark_pane.count(), 1);
        assert_eq!(app.selected, 1);

        // With marks present the same key opens the dialog instead.
        app.handle_command(Command::Delete);
        assert_eq!(app.mode, Mode::DeleteConfirm);
    }

    #[test]
    fn test_delete_requires_literal_yes() {
        let temp_dir = TempDir::new().unwrap();
        let victim = temp_dir.path().join("victim");
        std::fs::write(&victim, b"data").unwrap();

        let mut app = app_over(temp_dir.path());
        select_by_name(&mut app, "victim");
        app.handle_command(Command::ToggleMark);
        app.handle_command(Command::Delete);
        assert_eq!(app.mode, Mode::DeleteConfirm);

        for c in "yes".chars() {
            app.handle_command(Command::ConfirmInput(c));
        }
        app.handle_command(Command::ConfirmSubmit);
        // Lowercase does not confirm; the file survives.
        assert!(victim.exists());
        assert_eq!(app.mode, Mode::Browsing);
    }

    #[test]
    fn test_mark_and_delete_scenario() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("f1"), vec![0u8; 10]).unwrap();
        std::fs::write(temp_dir.path().join("f2"), vec![0u8; 20]).unwrap();
        std::fs::write(temp_dir.path().join("f3"), vec![0u8; 40]).unwrap();

        let mut app = app_over(temp_dir.path());
        select_by_name(&mut app, "f1");
        app.handle_command(Command::ToggleMark);
        select_by_name(&mut app, "f3");
        app.handle_command(Command::ToggleMark);
        assert_eq!(app.mark_pane.count(), 2);

        app.handle_command(Command::Delete);
        for c in "YES".chars() {
            app.handle_command(Command::ConfirmInput(c));
        }
        app.handle_command(Command::ConfirmSubmit);

        assert!(!temp_dir.path().join("f1").exists());
        assert!(!temp_dir.path().join("f3").exists());
        assert!(temp_dir.path().join("f2").exists());

        // The refresh reconciled sizes and counts.
        assert_eq!(app.current_dir.size(), 20);
        assert_eq!(app.current_dir.entry_count(), 1);
        assert_eq!(app.current_view.len(), 1);
        assert_eq!(app.mark_pane.count(), 0);
    }

    #[test]
    fn test_glob_search_builds_synthetic_directory() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("readme.md"), vec![0u8; 4]).unwrap();
        std::fs::write(temp_dir.path().join("README"), vec![0u8; 2]).unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), vec![0u8; 8]).unwrap();

        let mut app = app_over(temp_dir.path());
        app.handle_command(Command::StartGlobSearch);
        assert_eq!(app.mode, Mode::GlobSearch);
        for c in "readme*".chars() {
            app.handle_command(Command::GlobInput(c));
        }
        app.handle_command(Command::GlobConfirm);

        assert_eq!(app.mode, Mode::Browsing);
        assert_eq!(app.current_dir.name(), "[Search Results]");
        let mut names: Vec<&str> = app.current_view.iter().map(|e| e.name()).collect();
        names.sort_unstable();
        assert_eq!(names, ["README", "readme.md"]);
        assert_eq!(app.current_dir.size(), 6);

        // The synthetic directory sits on the stack and pops normally.
        app.handle_command(Command::Exit);
        assert_eq!(
            app.current_dir.name(),
            temp_dir.path().file_name().unwrap().to_string_lossy()
        );
    }

    #[test]
    fn test_glob_search_no_matches_stays_put() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a"), b"1").unwrap();

        let mut app = app_over(temp_dir.path());
        app.handle_command(Command::StartGlobSearch);
        for c in "zzz".chars() {
            app.handle_command(Command::GlobInput(c));
        }
        app.handle_command(Command::GlobConfirm);
        assert_eq!(app.nav_stack.len(), 1);
    }

    #[test]
    fn test_refresh_selected_picks_up_new_files() {
        let temp_dir = TempDir::new().unwrap();
        let sub = temp_dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("old"), vec![0u8; 5]).unwrap();

        let mut app = app_over(temp_dir.path());
        std::fs::write(sub.join("new"), vec![0u8; 7]).unwrap();

        select_by_name(&mut app, "sub");
        app.handle_command(Command::RefreshSelected);

        let sub_entry = app
            .current_view
            .iter()
            .find(|entry| entry.name() == "sub")
            .unwrap();
        assert_eq!(sub_entry.size(), 12);
        assert_eq!(sub_entry.child_count(), 2);
    }

    #[test]
    fn test_refresh_preserves_marks_by_path() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("keep"), vec![0u8; 5]).unwrap();

        let mut app = app_over(temp_dir.path());
        select_by_name(&mut app, "keep");
        app.handle_command(Command::ToggleMark);
        assert_eq!(app.mark_pane.count(), 1);

        app.handle_command(Command::RefreshAll);
        assert_eq!(app.mark_pane.count(), 1);
        assert!(app.current_view[0].is_marked());
        assert_eq!(app.marked_paths(), vec![temp_dir.path().join("keep")]);
    }

    #[test]
    fn test_quickview_focus_and_pane_keys() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("doc.txt"), "one\ntwo\nthree\n").unwrap();

        let mut app = app_over(temp_dir.path());
        select_by_name(&mut app, "doc.txt");
        app.handle_command(Command::QuickView);
        assert!(app.mark_pane.quickview_active());
        assert_eq!(app.mark_pane.tab, PaneTab::QuickView);

        app.handle_command(Command::SwitchFocus);
        assert_eq!(app.focus, Focus::Pane);

        app.handle_pane_key(KeyCode::Char('j'));
        assert_eq!(app.mark_pane.scroll.cursor_y, 1);

        // Escape returns focus to the main pane.
        app.handle_pane_key(KeyCode::Esc);
        assert_eq!(app.focus, Focus::Main);

        app.handle_command(Command::ClearQuickView);
        assert!(!app.mark_pane.quickview_active());
        assert!(!app.mark_pane.is_visible());
    }

    #[test]
    fn test_quit_only_from_browsing() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a"), b"1").unwrap();
        let mut app = app_over(temp_dir.path());

        app.mode = Mode::DeleteConfirm;
        app.handle_command(Command::Quit);
        assert!(!app.should_quit);

        app.mode = Mode::Browsing;
        app.handle_command(Command::Quit);
        assert!(app.should_quit);
    }

    #[test]
    fn test_cached_row_formatting() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("file"), vec![0u8; 1000]).unwrap();
        let sub = temp_dir.path().join("dir");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("inner"), vec![0u8; 3000]).unwrap();

        let mut app = app_over(temp_dir.path());
        select_by_name(&mut app, "dir");
        let row = app.cached_row(app.selected).unwrap();
        assert_eq!(row.size, "3.00 KB");
        assert!(row.name.starts_with('/'));
        assert_eq!(row.count, "1");
        assert!((row.percent - 75.0).abs() < 0.01);
    }

    #[test]
    fn test_virtual_root_for_multiple_paths() {
        let temp_dir = TempDir::new().unwrap();
        let one = temp_dir.path().join("one");
        let two = temp_dir.path().join("two");
        std::fs::create_dir(&one).unwrap();
        std::fs::create_dir(&two).unwrap();
        std::fs::write(one.join("a"), vec![0u8; 10]).unwrap();
        std::fs::write(two.join("b"), vec![0u8; 30]).unwrap();

        let config = scan_config(vec![one, two]);
        let scanner = Scanner::new(config.clone());
        let roots = scanner.scan(&config.paths).unwrap();
        let app = App::new(roots, config);

        assert_eq!(app.current_view.len(), 2);
        assert_eq!(app.current_dir.size(), 40);
        assert_eq!(app.current_dir.entry_count(), 2);
        // Sorted size-descending: the larger root first.
        assert_eq!(app.current_view[0].name(), "two");
    }
}
