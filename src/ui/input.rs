//! Key handling for the interactive browser.
//!
//! Main-screen keys are decoded here into [`Command`]s, dispatched per UI
//! mode. Keys for the focused right pane (mark list and quick-view scroll)
//! are routed separately by the app, since the pane owns tab and scroll
//! semantics.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// The main screen's input mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Browsing the entry list.
    #[default]
    Browsing,
    /// The bottom line is capturing a glob pattern.
    GlobSearch,
    /// The modal help overlay is up.
    Help,
    /// The delete dialog is waiting for a literal `YES`.
    DeleteConfirm,
}

/// Commands the main screen can issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    GotoTop,
    GotoBottom,
    /// Enter the selected directory.
    Enter,
    /// Pop back to the parent directory.
    Exit,
    /// Toggle the mark on the selected entry.
    ToggleMark,
    /// Toggle marks on every visible entry.
    ToggleAllMarks,
    /// Mark-and-advance, or open the delete dialog when marks exist.
    Delete,
    /// Preview the selected entry.
    QuickView,
    /// Drop the active preview.
    ClearQuickView,
    /// Move focus between the main list and the right pane.
    SwitchFocus,
    StartGlobSearch,
    GlobInput(char),
    GlobBackspace,
    GlobConfirm,
    GlobCancel,
    /// Re-scan the selected directory.
    RefreshSelected,
    /// Re-scan every root.
    RefreshAll,
    /// Open the selected entry with the system handler.
    OpenExternal,
    SortBySize,
    SortByName,
    SortByTime,
    SortByCount,
    ToggleMtimeColumn,
    ToggleCountColumn,
    ShowHelp,
    CloseHelp,
    ConfirmInput(char),
    ConfirmBackspace,
    ConfirmSubmit,
    ConfirmCancel,
    Quit,
    Noop,
}

/// Decode a key event for the current mode.
pub fn handle_key(key: KeyEvent, mode: Mode) -> Command {
    match mode {
        Mode::Browsing => handle_browsing(key),
        Mode::GlobSearch => handle_glob_search(key),
        Mode::Help => Command::CloseHelp,
        Mode::DeleteConfirm => handle_delete_confirm(key),
    }
}

fn handle_browsing(key: KeyEvent) -> Command {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Command::MoveUp,
        KeyCode::Down | KeyCode::Char('j') => Command::MoveDown,

        KeyCode::PageUp => Command::PageUp,
        KeyCode::PageDown => Command::PageDown,
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => Command::PageUp,
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => Command::PageDown,

        KeyCode::Home | KeyCode::Char('H') => Command::GotoTop,
        KeyCode::End | KeyCode::Char('G') => Command::GotoBottom,

        KeyCode::Right | KeyCode::Enter | KeyCode::Char('l') | KeyCode::Char('o') => Command::Enter,
        KeyCode::Left | KeyCode::Backspace | KeyCode::Char('h') | KeyCode::Char('u') => {
            Command::Exit
        }

        KeyCode::Char(' ') => Command::ToggleMark,
        KeyCode::Char('a') | KeyCode::Char('A') => Command::ToggleAllMarks,
        KeyCode::Char('d') => Command::Delete,

        KeyCode::Char('i') => Command::QuickView,
        KeyCode::Char('I') => Command::ClearQuickView,
        KeyCode::Tab => Command::SwitchFocus,

        KeyCode::Char('/') => Command::StartGlobSearch,
        KeyCode::Char('r') => Command::RefreshSelected,
        KeyCode::Char('R') => Command::RefreshAll,
        KeyCode::Char('O') => Command::OpenExternal,

        KeyCode::Char('s') => Command::SortBySize,
        KeyCode::Char('n') => Command::SortByName,
        KeyCode::Char('m') => Command::SortByTime,
        KeyCode::Char('c') => Command::SortByCount,

        KeyCode::Char('M') => Command::ToggleMtimeColumn,
        KeyCode::Char('C') => Command::ToggleCountColumn,

        KeyCode::Char('?') => Command::ShowHelp,
        KeyCode::Char('q') | KeyCode::Char('Q') => Command::Quit,

        _ => Command::Noop,
    }
}

fn handle_glob_search(key: KeyEvent) -> Command {
    match key.code {
        KeyCode::Esc => Command::GlobCancel,
        KeyCode::Enter => Command::GlobConfirm,
        KeyCode::Backspace => Command::GlobBackspace,
        KeyCode::Char(c) if c.is_ascii_graphic() || c == ' ' => Command::GlobInput(c),
        _ => Command::Noop,
    }
}

fn handle_delete_confirm(key: KeyEvent) -> Command {
    match key.code {
        KeyCode::Esc => Command::ConfirmCancel,
        KeyCode::Enter => Command::ConfirmSubmit,
        KeyCode::Backspace => Command::ConfirmBackspace,
        KeyCode::Char(c) if c.is_ascii_graphic() => Command::ConfirmInput(c),
        _ => Command::Noop,
    }
}
