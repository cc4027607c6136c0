//! The right-hand pane: marked-items collection plus the quick-view tab.
//!
//! The pane is visible iff at least one tab has content, meaning the mark
//! set is non-empty or a preview is active. That single rule is evaluated in
//! [`MarkPane::is_visible`]; every marking and preview operation funnels
//! through here so the two entry paths cannot drift.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::preview::{generate_preview, PreviewContent, ScrollableView};
use crate::tree::Entry;

/// Jump distance for the pane's page up/down.
const PAGE_JUMP: usize = 10;

/// Which tab of the right pane is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaneTab {
    QuickView,
    #[default]
    MarkedFiles,
}

/// One marked entry with its render-ready path and size kept in lockstep.
pub struct MarkedItem {
    pub entry: Arc<Entry>,
    pub path: String,
    pub size: u64,
}

pub struct MarkPane {
    rows: Vec<MarkedItem>,
    pub selected: usize,
    pub offset: usize,
    pub focused: bool,
    pub tab: PaneTab,
    /// Rows shown at once; the draw pass keeps this current.
    pub visible_height: usize,
    preview_path: Option<PathBuf>,
    pub preview: Option<PreviewContent>,
    pub scroll: ScrollableView,
}

impl MarkPane {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            selected: 0,
            offset: 0,
            focused: false,
            tab: PaneTab::MarkedFiles,
            visible_height: 20,
            preview_path: None,
            preview: None,
            scroll: ScrollableView::default(),
        }
    }

    /// Rebuild the marked-item rows by walking every root, sorted by path.
    pub fn update(&mut self, roots: &[Arc<Entry>]) {
        self.rows.clear();
        for root in roots {
            collect_marked(root, &mut self.rows);
        }
        self.rows.sort_by(|a, b| a.path.cmp(&b.path));

        if self.selected >= self.rows.len() {
            self.selected = self.rows.len().saturating_sub(1);
        }
        self.adjust_offset();
    }

    pub fn rows(&self) -> &[MarkedItem] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }

    pub fn total_size(&self) -> u64 {
        self.rows.iter().map(|item| item.size).sum()
    }

    /// The single visibility rule for the whole pane.
    pub fn is_visible(&self) -> bool {
        !self.rows.is_empty() || self.quickview_active()
    }

    pub fn quickview_active(&self) -> bool {
        self.preview_path.is_some()
    }

    pub fn marked_entries(&self) -> Vec<Arc<Entry>> {
        self.rows.iter().map(|item| item.entry.clone()).collect()
    }

    pub fn set_focus(&mut self, focused: bool) {
        self.focused = focused;
        if focused && !self.rows.is_empty() {
            self.selected = self.rows.len() - 1;
            self.adjust_offset();
        }
    }

    pub fn switch_tab(&mut self, tab: PaneTab) {
        self.tab = tab;
    }

    /// Generate (or regenerate) the preview for `path` and show its tab.
    pub fn activate_quickview(&mut self, path: &Path) {
        let preview = generate_preview(path);
        self.scroll.reset();
        self.scroll.update_content(&preview.lines);
        self.preview = Some(preview);
        self.preview_path = Some(path.to_path_buf());
        self.tab = PaneTab::QuickView;
    }

    pub fn deactivate_quickview(&mut self) {
        self.preview_path = None;
        self.preview = None;
        self.scroll.reset();
    }

    pub fn navigate_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.adjust_offset();
        }
    }

    pub fn navigate_down(&mut self) {
        if self.selected + 1 < self.rows.len() {
            self.selected += 1;
            self.adjust_offset();
        }
    }

    pub fn navigate_page_up(&mut self) {
        self.selected = self.selected.saturating_sub(PAGE_JUMP);
        self.adjust_offset();
    }

    pub fn navigate_page_down(&mut self) {
        if !self.rows.is_empty() {
            self.selected = (self.selected + PAGE_JUMP).min(self.rows.len() - 1);
            self.adjust_offset();
        }
    }

    pub fn navigate_home(&mut self) {
        self.selected = 0;
        self.offset = 0;
    }

    pub fn navigate_end(&mut self) {
        if !self.rows.is_empty() {
            self.selected = self.rows.len() - 1;
            self.adjust_offset();
        }
    }

    /// Unmark the selected row and drop it from the list.
    pub fn remove_selected(&mut self) {
        if self.selected < self.rows.len() {
            let item = self.rows.remove(self.selected);
            item.entry.set_marked(false);
            if self.selected >= self.rows.len() && !self.rows.is_empty() {
                self.selected = self.rows.len() - 1;
            }
            self.adjust_offset();
        }
    }

    /// Clear every mark.
    pub fn remove_all(&mut self) {
        for item in &self.rows {
            item.entry.set_marked(false);
        }
        self.rows.clear();
        self.selected = 0;
        self.offset = 0;
    }

    /// Scroll-view search commit needs the preview lines, which live next to
    /// the scroll state; these wrappers keep the borrow local.
    pub fn scroll_commit_search(&mut self) {
        if let Some(preview) = &self.preview {
            self.scroll.commit_search(&preview.lines);
        } else {
            self.scroll.cancel_search();
        }
    }

    pub fn scroll_word_search(&mut self) {
        if let Some(preview) = &self.preview {
            self.scroll.search_word_under_cursor(&preview.lines);
        }
    }

    fn adjust_offset(&mut self) {
        let height = self.visible_height.max(1);
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + height {
            self.offset = self.selected - height + 1;
        }
    }
}

impl Default for MarkPane {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_marked(entry: &Arc<Entry>, out: &mut Vec<MarkedItem>) {
    if entry.is_marked() {
        out.push(MarkedItem {
            entry: entry.clone(),
            path: entry.path().to_string_lossy().into_owned(),
            size: entry.size(),
        });
    }
    if entry.is_dir() && !entry.is_symlink() {
        for child in entry.children_snapshot() {
            collect_marked(&child, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with_marks() -> Arc<Entry> {
        let root = Entry::virtual_dir("/root");
        let b = Entry::virtual_dir("/root/b");
        b.set_size(20);
        b.set_marked(true);
        let a = Entry::virtual_dir("/root/a");
        a.set_size(10);
        a.set_marked(true);
        let sub = Entry::virtual_dir("/root/sub");
        let c = Entry::virtual_dir("/root/sub/c");
        c.set_size(5);
        c.set_marked(true);
        sub.push_child(c);
        root.push_child(b);
        root.push_child(a);
        root.push_child(sub);
        root
    }

    #[test]
    fn test_update_collects_recursively_sorted_by_path() {
        let root = tree_with_marks();
        let mut pane = MarkPane::new();
        pane.update(&[root]);

        assert_eq!(pane.count(), 3);
        let paths: Vec<&str> = pane.rows().iter().map(|item| item.path.as_str()).collect();
        assert_eq!(paths, ["/root/a", "/root/b", "/root/sub/c"]);
        assert_eq!(pane.total_size(), 35);
    }

    #[test]
    fn test_visibility_rule_both_entry_paths() {
        let mut pane = MarkPane::new();
        assert!(!pane.is_visible());

        // Path one: something gets marked.
        let root = tree_with_marks();
        pane.update(&[root.clone()]);
        assert!(pane.is_visible());
        pane.remove_all();
        assert!(!pane.is_visible());

        // Path two: a preview is activated with nothing marked.
        let temp_dir = tempfile::TempDir::new().unwrap();
        let file = temp_dir.path().join("f.txt");
        std::fs::write(&file, "hello\n").unwrap();
        pane.activate_quickview(&file);
        assert!(pane.is_visible());
        assert_eq!(pane.tab, PaneTab::QuickView);
        pane.deactivate_quickview();
        assert!(!pane.is_visible());
    }

    #[test]
    fn test_remove_selected_clears_mark() {
        let root = tree_with_marks();
        let mut pane = MarkPane::new();
        pane.update(&[root.clone()]);

        pane.selected = 0;
        let removed = pane.rows()[0].entry.clone();
        pane.remove_selected();
        assert!(!removed.is_marked());
        assert_eq!(pane.count(), 2);

        pane.remove_all();
        assert_eq!(pane.count(), 0);
        let mut check = Vec::new();
        collect_marked(&root, &mut check);
        assert!(check.is_empty());
    }

    #[test]
    fn test_navigation_clamps() {
        let root = tree_with_marks();
        let mut pane = MarkPane::new();
        pane.update(&[root]);

        pane.navigate_up();
        assert_eq!(pane.selected, 0);
        pane.navigate_down();
        pane.navigate_down();
        pane.navigate_down();
        assert_eq!(pane.selected, 2);
        pane.navigate_home();
        assert_eq!(pane.selected, 0);
        pane.navigate_end();
        assert_eq!(pane.selected, 2);
        pane.navigate_page_up();
        assert_eq!(pane.selected, 0);
    }

    #[test]
    fn test_focus_selects_last_row() {
        let root = tree_with_marks();
        let mut pane = MarkPane::new();
        pane.update(&[root]);
        pane.set_focus(true);
        assert!(pane.focused);
        assert_eq!(pane.selected, 2);
    }

    #[test]
    fn test_quickview_scroll_search_wrapper() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let file = temp_dir.path().join("f.txt");
        std::fs::write(&file, "alpha\nbeta\nalpha\n").unwrap();

        let mut pane = MarkPane::new();
        pane.activate_quickview(&file);
        pane.scroll.start_search();
        for c in "alpha".chars() {
            pane.scroll.push_search_char(c);
        }
        pane.scroll_commit_search();
        assert!(pane.scroll.search_active);
        assert_eq!(pane.scroll.match_count(), 2);
    }

    #[test]
    fn test_update_preserves_selection_clamp() {
        let root = tree_with_marks();
        let mut pane = MarkPane::new();
        pane.update(&[root.clone()]);
        pane.selected = 2;

        // Unmark everything underneath and rebuild.
        pane.rows()[2].entry.set_marked(false);
        pane.rows()[1].entry.set_marked(false);
        pane.update(&[root]);
        assert_eq!(pane.count(), 1);
        assert_eq!(pane.selected, 0);
    }
}
