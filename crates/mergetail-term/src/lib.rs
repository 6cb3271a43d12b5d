//! mergetail-term: terminal output for mergetail.

pub mod render;
pub mod sink;
pub mod theme;

pub use render::{classify, color_enabled, RenderOptions, Renderer};
pub use sink::TerminalSink;
pub use theme::Theme;

#[derive(Debug, thiserror::Error)]
pub enum TermError {
    #[error("invalid timestamp format '{0}'")]
    TimestampFormat(String),
}
