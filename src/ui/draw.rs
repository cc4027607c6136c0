//! ratatui rendering for the interactive browser.
//!
//! Pure view code: reads [`App`] state, writes widgets into the frame, and
//! feeds viewport geometry back (list height, pane height, scroll window) so
//! the state machine can clamp and page correctly.

use std::sync::Arc;

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Clear, List, ListItem, ListState, Paragraph, Scrollbar, ScrollbarOrientation,
    ScrollbarState, Tabs,
};
use ratatui::Frame;

use crate::fmt::format_size;
use crate::preview::StyledLine;
use crate::tree::Entry;

use super::app::{App, Focus};
use super::input::Mode;
use super::mark::PaneTab;

/// Width of the percentage graph bar in the entry list.
const GRAPH_WIDTH: usize = 20;

pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();
    if app.mark_pane.is_visible() {
        let panes =
            Layout::horizontal([Constraint::Percentage(67), Constraint::Percentage(33)]).split(area);
        render_main(frame, app, panes[0]);
        render_mark_pane(frame, app, panes[1]);
    } else {
        render_main(frame, app, area);
    }

    if app.mode == Mode::Help {
        render_help(frame, area);
    }
    if app.mode == Mode::DeleteConfirm {
        render_delete_dialog(frame, app, area);
    }
    app.needs_full_redraw = false;
}

fn render_main(frame: &mut Frame, app: &mut App, area: Rect) {
    let rows = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .split(area);

    render_header(frame, rows[0]);
    render_path_bar(frame, app, rows[1]);
    render_entry_list(frame, app, rows[2]);
    render_status_line(frame, app, rows[3]);
    render_hint_line(frame, app, rows[4]);
}

fn render_header(frame: &mut Frame, area: Rect) {
    let header = Paragraph::new(" dusage - interactive disk usage  (press ? for help)")
        .style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_widget(header, area);
}

fn render_path_bar(frame: &mut Frame, app: &App, area: Rect) {
    let path_text = app.current_dir.path().to_string_lossy();
    let shown_path = if path_text.is_empty() {
        "[root]"
    } else {
        path_text.as_ref()
    };
    let info = format!(
        "({} visible, {} total, {})",
        app.current_view.len(),
        app.current_dir.entry_count(),
        format_size(app.current_dir.size(), app.config.format)
    );

    let width = area.width as usize;
    let mut text = format!(" {shown_path}");
    let used = text.chars().count();
    let info_len = info.chars().count();
    if used + info_len + 2 <= width {
        text.push_str(&" ".repeat(width - used - info_len - 1));
        text.push_str(&info);
    }
    let bar = Paragraph::new(text).style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_widget(bar, area);
}

fn render_entry_list(frame: &mut Frame, app: &mut App, area: Rect) {
    app.list_height = area.height as usize;

    let mut items: Vec<ListItem> = Vec::with_capacity(app.current_view.len());
    for index in 0..app.current_view.len() {
        let row = app.cached_row(index).expect("row within view");
        let entry = app.current_view[index].clone();
        items.push(ListItem::new(entry_line(app, &entry, &row)));
    }

    let highlight = if app.focus == Focus::Main {
        Style::default().bg(Color::Cyan).fg(Color::Black)
    } else {
        Style::default().bg(Color::Blue).fg(Color::Black)
    };
    let list = List::new(items).highlight_style(highlight);

    let mut state = ListState::default()
        .with_offset(app.view_offset)
        .with_selected(if app.current_view.is_empty() {
            None
        } else {
            Some(app.selected)
        });
    frame.render_stateful_widget(list, area, &mut state);
    app.view_offset = state.offset();
}

fn entry_line(app: &App, entry: &Arc<Entry>, row: &super::app::CachedRow) -> Line<'static> {
    let mut spans: Vec<Span> = Vec::new();

    if entry.is_marked() {
        spans.push(Span::styled(
            "*",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    } else {
        spans.push(Span::raw(" "));
    }

    spans.push(Span::styled(
        format!("{:>9}", row.size),
        Style::default().fg(Color::Green),
    ));
    spans.push(Span::raw(" | "));
    spans.push(Span::styled(
        format!("{:>5.1}%", row.percent),
        Style::default().fg(Color::Yellow),
    ));
    spans.push(Span::raw(" | "));

    let filled = ((row.percent / 100.0) * GRAPH_WIDTH as f64) as usize;
    let filled = filled.min(GRAPH_WIDTH);
    spans.push(Span::styled(
        "\u{2592}".repeat(filled),
        Style::default().fg(Color::Green),
    ));
    spans.push(Span::raw(" ".repeat(GRAPH_WIDTH - filled)));

    if app.show_mtime {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("{:>16}", row.mtime),
            Style::default().fg(Color::Gray),
        ));
    }
    if app.show_count {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("{:>7}", row.count),
            Style::default().fg(Color::Gray),
        ));
    }

    spans.push(Span::raw(" | "));
    let name_style = if entry.is_symlink() {
        Style::default().fg(Color::Magenta)
    } else if entry.is_dir() {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    spans.push(Span::styled(row.name.clone(), name_style));

    Line::from(spans)
}

fn render_status_line(frame: &mut Frame, app: &App, area: Rect) {
    let mut status = format!(" Sort mode: {}", app.sort_mode.label());
    if !app.mark_pane.is_empty() {
        status.push_str(&format!(
            " | Marked: {} items ({})",
            app.mark_pane.count(),
            format_size(app.mark_pane.total_size(), app.config.format)
        ));
    }
    let line = Paragraph::new(status).style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_widget(line, area);
}

fn render_hint_line(frame: &mut Frame, app: &App, area: Rect) {
    let text = if app.mode == Mode::GlobSearch {
        format!("Search: {}", app.glob_pattern)
    } else {
        let mut hints = String::from(" mark = d/space | ");
        if app.mark_pane.is_visible() {
            hints.push_str("mark pane = Tab | ");
        }
        hints.push_str("delete = d | search = / | quick view = i | refresh = r/R");
        hints
    };
    frame.render_widget(Paragraph::new(text), area);
}

fn render_mark_pane(frame: &mut Frame, app: &mut App, area: Rect) {
    let border_style = if app.focus == Focus::Pane {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(" Mark Pane ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .split(inner);

    let selected_tab = match app.mark_pane.tab {
        PaneTab::QuickView => 0,
        PaneTab::MarkedFiles => 1,
    };
    let tabs = Tabs::new(vec!["1:Quick View", "2:Marked Files"])
        .select(selected_tab)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));
    frame.render_widget(tabs, rows[0]);

    match app.mark_pane.tab {
        PaneTab::QuickView => render_quickview_tab(frame, app, rows[1], rows[2]),
        PaneTab::MarkedFiles => render_marked_tab(frame, app, rows[1], rows[2]),
    }
}

fn render_marked_tab(frame: &mut Frame, app: &mut App, area: Rect, footer: Rect) {
    app.mark_pane.visible_height = area.height as usize;

    if app.mark_pane.is_empty() {
        let empty = Paragraph::new("No marked items").style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .mark_pane
        .rows()
        .iter()
        .map(|item| {
            let path_style = if item.entry.is_symlink() {
                Style::default().fg(Color::Magenta)
            } else if item.entry.is_dir() {
                Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:>10}", format_size(item.size, app.config.format)),
                    Style::default().fg(Color::Green),
                ),
                Span::raw(" | "),
                Span::styled(item.path.clone(), path_style),
            ]))
        })
        .collect();

    let highlight = if app.mark_pane.focused {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };
    let list = List::new(items).highlight_style(highlight);
    let mut state = ListState::default()
        .with_offset(app.mark_pane.offset)
        .with_selected(Some(app.mark_pane.selected));
    frame.render_stateful_widget(list, area, &mut state);
    app.mark_pane.offset = state.offset();

    if app.mark_pane.count() > area.height as usize {
        let mut scrollbar_state =
            ScrollbarState::new(app.mark_pane.count()).position(app.mark_pane.offset);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut scrollbar_state,
        );
    }

    let total = format!(
        "Total: {} items, {}",
        app.mark_pane.count(),
        format_size(app.mark_pane.total_size(), app.config.format)
    );
    frame.render_widget(
        Paragraph::new(total).style(Style::default().add_modifier(Modifier::REVERSED)),
        footer,
    );
}

fn render_quickview_tab(frame: &mut Frame, app: &mut App, area: Rect, footer: Rect) {
    let width = area.width as usize;
    let height = area.height as usize;
    app.mark_pane
        .scroll
        .update_window_size(width.saturating_sub(1), height);

    let Some(preview) = &app.mark_pane.preview else {
        let hint = Paragraph::new("No file selected\nPress 'i' on a file to preview")
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(hint, area);
        return;
    };

    let scroll = &app.mark_pane.scroll;
    let focused = app.mark_pane.focused;
    let mut lines: Vec<Line> = Vec::with_capacity(height);
    for line_index in scroll.offset_y..(scroll.offset_y + height).min(preview.lines.len()) {
        let styled = match &preview.styled {
            Some(styled_lines) => styled_lines
                .get(line_index)
                .cloned()
                .unwrap_or_default(),
            None => plain_styled(&preview.lines[line_index]),
        };
        let visible = styled.slice(scroll.offset_x, scroll.window_width.max(1));
        lines.push(to_ratatui_line(
            &visible,
            focused && line_index == scroll.cursor_y,
            scroll.cursor_x.saturating_sub(scroll.offset_x),
        ));
    }
    frame.render_widget(Paragraph::new(lines), area);

    if preview.lines.len() > height {
        let mut scrollbar_state =
            ScrollbarState::new(preview.lines.len()).position(scroll.offset_y);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut scrollbar_state,
        );
    }

    render_quickview_status(frame, app, footer);
}

fn render_quickview_status(frame: &mut Frame, app: &App, area: Rect) {
    let scroll = &app.mark_pane.scroll;
    let total = app
        .mark_pane
        .preview
        .as_ref()
        .map(|preview| preview.lines.len())
        .unwrap_or(0);

    let text = if scroll.search_input {
        format!("/{}", scroll.search_pattern)
    } else if scroll.command_active {
        format!(":{}", scroll.command_buffer)
    } else {
        let mut status = format!("Line {}/{} Col {}", scroll.cursor_y + 1, total, scroll.cursor_x + 1);
        if scroll.search_active && scroll.has_matches() {
            status.push_str(&format!(
                " [{}/{} for \"{}\"]",
                scroll.current_match_index() + 1,
                scroll.match_count(),
                scroll.search_pattern
            ));
        }
        if scroll.offset_x > 0 || scroll.max_line_length > scroll.window_width {
            status.push_str(&format!(
                " [{}-{}]",
                scroll.offset_x + 1,
                scroll.offset_x + scroll.window_width
            ));
        }
        status
    };
    frame.render_widget(
        Paragraph::new(text).style(Style::default().add_modifier(Modifier::REVERSED)),
        area,
    );
}

fn plain_styled(text: &str) -> StyledLine {
    StyledLine {
        spans: vec![crate::preview::StyledSpan {
            text: text.to_string(),
            style: Style::default(),
        }],
    }
}

/// Turn a styled slice into a ratatui line, reversing the cursor cell when
/// this line carries the focused cursor.
fn to_ratatui_line(styled: &StyledLine, has_cursor: bool, cursor_col: usize) -> Line<'static> {
    if !has_cursor {
        let spans: Vec<Span> = styled
            .spans
            .iter()
            .map(|span| Span::styled(span.text.clone(), span.style))
            .collect();
        return Line::from(spans);
    }

    let before = styled.slice(0, cursor_col);
    let at = styled.slice(cursor_col, 1);
    let after_start = cursor_col + 1;
    let after = styled.slice(after_start, usize::MAX - after_start);

    let mut spans: Vec<Span> = Vec::new();
    for span in &before.spans {
        spans.push(Span::styled(span.text.clone(), span.style));
    }
    let cursor_text = if at.spans.is_empty() {
        " ".to_string()
    } else {
        at.plain_text()
    };
    let cursor_style = at
        .spans
        .first()
        .map(|span| span.style)
        .unwrap_or_default()
        .add_modifier(Modifier::REVERSED);
    spans.push(Span::styled(cursor_text, cursor_style));
    for span in &after.spans {
        spans.push(Span::styled(span.text.clone(), span.style));
    }
    Line::from(spans)
}

fn render_help(frame: &mut Frame, area: Rect) {
    let popup = centered_rect(area, 72, 22);
    frame.render_widget(Clear, popup);

    let lines = vec![
        Line::from(Span::styled(
            "HELP",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::raw(""),
        Line::raw("Navigation:                      Marking:"),
        Line::raw("  Up/k        move up              space   toggle mark"),
        Line::raw("  Down/j      move down            d       mark & move down"),
        Line::raw("  Right/l     enter directory      a       toggle all"),
        Line::raw("  Left/h/u    go back              d       delete marked"),
        Line::raw("  PgUp/PgDn   move by page"),
        Line::raw("  Home/End    top / bottom       Display:"),
        Line::raw("  Tab         switch to pane       M       toggle mtime column"),
        Line::raw("  O           open with system     C       toggle count column"),
        Line::raw("  i / I       quick view / clear"),
        Line::raw(""),
        Line::raw("Sorting:                         Other:"),
        Line::raw("  s           by size              /       glob search"),
        Line::raw("  n           by name              r/R     refresh selected/all"),
        Line::raw("  m           by modified time     q       quit"),
        Line::raw("  c           by entry count"),
        Line::raw(""),
        Line::raw("Press any key to close help"),
    ];
    let help = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::Blue)),
    );
    frame.render_widget(help, popup);
}

fn render_delete_dialog(frame: &mut Frame, app: &App, area: Rect) {
    let popup = centered_rect(area, 60, 8);
    frame.render_widget(Clear, popup);

    let lines = vec![
        Line::from(Span::styled(
            format!(
                "WARNING: About to delete {} item(s), {}",
                app.mark_pane.count(),
                format_size(app.mark_pane.total_size(), app.config.format)
            ),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::raw("This action cannot be undone!"),
        Line::raw(""),
        Line::raw("Type YES and press Enter to confirm deletion:"),
        Line::from(format!("> {}", app.confirm_input)),
    ];
    let dialog = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    frame.render_widget(dialog, popup);
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::scanner::Scanner;
    use crate::ui::input::Command;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn test_app(temp_dir: &TempDir) -> App {
        let config = Config {
            apparent_size: true,
            show_progress: false,
            thread_count: 1,
            paths: vec![temp_dir.path().to_path_buf()],
            ..Config::default()
        };
        let scanner = Scanner::new(config.clone());
        let roots = scanner.scan(&config.paths).unwrap();
        App::new(roots, config)
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_render_browsing_screen() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("somefile.txt"), vec![0u8; 42]).unwrap();

        let mut app = test_app(&temp_dir);
        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(frame, &mut app)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("dusage"));
        assert!(text.contains("somefile.txt"));
        assert!(text.contains("Sort mode: size descending"));
        assert!(text.contains("42 B"));
    }

    #[test]
    fn test_render_with_mark_pane_and_dialog() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("marked.bin"), vec![0u8; 7]).unwrap();

        let mut app = test_app(&temp_dir);
        app.handle_command(Command::ToggleMark);
        app.handle_command(Command::Delete);

        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(frame, &mut app)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("Mark Pane"));
        assert!(text.contains("2:Marked Files"));
        assert!(text.contains("marked.bin"));
        assert!(text.contains("WARNING: About to delete 1 item(s)"));
        assert!(text.contains("Type YES"));
    }

    #[test]
    fn test_render_quickview_tab() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("doc.txt"), "alpha\nbeta\n").unwrap();

        let mut app = test_app(&temp_dir);
        app.handle_command(Command::QuickView);

        let backend = TestBackend::new(120, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(frame, &mut app)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("1:Quick View"));
        assert!(text.contains("alpha"));
        assert!(text.contains("Line 1/2 Col 1"));
    }

    #[test]
    fn test_render_help_overlay() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("x"), b"1").unwrap();

        let mut app = test_app(&temp_dir);
        app.handle_command(Command::ShowHelp);

        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(frame, &mut app)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("HELP"));
        assert!(text.contains("glob search"));
    }
}
