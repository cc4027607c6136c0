//! The interactive terminal UI: key decoding, the app state machine, the
//! mark pane, and rendering.

pub mod app;
pub mod draw;
pub mod input;
pub mod mark;

pub use app::{App, Focus, SortMode};
pub use input::{handle_key, Command, Mode};
pub use mark::{MarkPane, PaneTab};
