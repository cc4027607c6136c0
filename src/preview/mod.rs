//! Quick-view previews: content generation, highlighter escape parsing, and
//! the scrollable cursor state over the result.

pub mod ansi;
mod quickview;
mod scroll;

pub use ansi::{StyledLine, StyledSpan};
pub use quickview::{generate_preview, PreviewContent, PreviewKind, MAX_PREVIEW_LINES};
pub use scroll::ScrollableView;
