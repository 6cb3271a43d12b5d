//! One output line per entry: `<timestamp> [<source>] <text>`.
//!
//! Colour and timezone choices live in [`RenderOptions`], handed to the
//! [`Renderer`] at construction; nothing here reads global state.

use std::fmt::Write as _;
use std::io::IsTerminal;
use std::sync::Arc;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Utc};
use crossterm::style::ContentStyle;
use mergetail_core::config::{ColorMode, OutputConfig};
use mergetail_core::{Entry, Severity};

use crate::theme::Theme;
use crate::TermError;

const ERROR_WORDS: &[&str] = &[
    "error",
    "failed",
    "exception",
    "panic",
    "fatal",
    "denied",
    "invalid",
];
const WARN_WORDS: &[&str] = &["warn", "warning", "timeout", "retry", "slow"];

/// Severity from a case-insensitive keyword scan. Everything on an `err`
/// channel counts as an error.
pub fn classify(entry: &Entry) -> Severity {
    if entry.source.channel() == "err" {
        return Severity::Error;
    }
    let text = entry.text.to_lowercase();
    if ERROR_WORDS.iter().any(|w| text.contains(w)) {
        Severity::Error
    } else if WARN_WORDS.iter().any(|w| text.contains(w)) {
        Severity::Warn
    } else {
        Severity::Info
    }
}

/// Resolve `auto` against whether stdout is a terminal.
pub fn color_enabled(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => std::io::stdout().is_terminal(),
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub color: bool,
    pub timestamp_format: String,
    pub utc: bool,
    pub theme: Arc<Theme>,
}

impl RenderOptions {
    pub fn new(
        color: bool,
        timestamp_format: impl Into<String>,
        utc: bool,
    ) -> Result<Self, TermError> {
        let timestamp_format = timestamp_format.into();
        if StrftimeItems::new(&timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(TermError::TimestampFormat(timestamp_format));
        }
        Ok(Self {
            color,
            timestamp_format,
            utc,
            theme: Arc::new(Theme::load_default()),
        })
    }

    pub fn from_config(output: &OutputConfig, color: ColorMode) -> Result<Self, TermError> {
        Self::new(color_enabled(color), output.timestamp_format.clone(), output.utc)
    }

    /// Uncoloured, UTC, ISO-like timestamps. Handy for tests and pipes.
    pub fn plain() -> Self {
        Self {
            color: false,
            timestamp_format: "%Y-%m-%dT%H:%M:%S%.6fZ".to_string(),
            utc: true,
            theme: Arc::new(Theme::load_default()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn render(&self, entry: &Entry) -> String {
        let theme = &self.options.theme;
        let ts = self.timestamp(entry.sort_key);
        let label = entry.source.as_str();
        let service = theme.service_style(entry.source.name());
        let message = theme.severity_style(classify(entry));

        let mut line = String::with_capacity(ts.len() + label.len() + entry.text.len() + 4);
        let _ = write!(
            line,
            "{} [{}] {}",
            self.paint(theme.timestamp, &ts),
            self.paint(service, label),
            self.paint(message, &entry.text),
        );
        line
    }

    pub fn header(&self, text: &str) -> String {
        self.paint(self.options.theme.header, text)
    }

    pub fn hint(&self, text: &str) -> String {
        self.paint(self.options.theme.hint, text)
    }

    /// Format a time with the configured zone and pattern.
    pub fn timestamp(&self, ts: DateTime<Utc>) -> String {
        let fmt = &self.options.timestamp_format;
        if self.options.utc {
            ts.format(fmt).to_string()
        } else {
            ts.with_timezone(&Local).format(fmt).to_string()
        }
    }

    fn paint(&self, style: ContentStyle, text: &str) -> String {
        if !self.options.color || style == ContentStyle::new() {
            return text.to_string();
        }
        style.apply(text).to_string()
    }
}
