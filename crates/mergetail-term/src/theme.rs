//! Colour theme for terminal output.
//!
//! The default theme is embedded via [`include_str!`] and parsed with the
//! `config` crate, so the binary needs no files on disk. Styles are resolved
//! once into crossterm [`ContentStyle`] values.
//!
//! # Colour assignment for services
//!
//! A service (the part of a source label before `/`) uses its fixed colour
//! when the theme names one. Otherwise the name is hashed to a stable index
//! into the palette, so `api/out` and `api/err` share a colour and the same
//! service keeps it across runs.

use std::collections::HashMap;

use config::{Config, File, FileFormat};
use crossterm::style::{Attribute, Color, ContentStyle};
use mergetail_core::Severity;
use serde::Deserialize;

const DEFAULT_THEME_SRC: &str = include_str!("themes/default.toml");

#[derive(Debug, Default, Deserialize)]
struct RawStyle {
    fg: Option<String>,
    #[serde(default)]
    bold: bool,
    #[serde(default)]
    dim: bool,
}

impl RawStyle {
    fn into_style(self) -> ContentStyle {
        let mut style = ContentStyle::new();
        style.foreground_color = self.fg.as_deref().and_then(parse_color);
        if self.bold {
            style.attributes.set(Attribute::Bold);
        }
        if self.dim {
            style.attributes.set(Attribute::Dim);
        }
        style
    }
}

#[derive(Debug, Deserialize)]
struct RawSeverity {
    warn: RawStyle,
    error: RawStyle,
}

#[derive(Debug, Deserialize)]
struct RawSources {
    #[serde(default)]
    default: RawStyle,
    #[serde(default)]
    palette: Vec<String>,
    #[serde(default)]
    fixed: HashMap<String, RawStyle>,
}

#[derive(Debug, Deserialize)]
struct RawTheme {
    timestamp: RawStyle,
    header: RawStyle,
    hint: RawStyle,
    severity: RawSeverity,
    sources: RawSources,
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub timestamp: ContentStyle,
    /// Startup header line.
    pub header: ContentStyle,
    /// Secondary notices such as "no web-server logs found".
    pub hint: ContentStyle,
    pub warn: ContentStyle,
    pub error: ContentStyle,
    source_default: ContentStyle,
    source_fixed: HashMap<String, ContentStyle>,
    source_palette: Vec<Color>,
}

impl Default for Theme {
    fn default() -> Self {
        Self::load_default()
    }
}

impl Theme {
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed.
    pub fn load_default() -> Self {
        Self::from_toml_str(DEFAULT_THEME_SRC).expect("embedded default theme must be valid TOML")
    }

    /// Parse a theme. Unknown keys are ignored; unknown colour names leave
    /// the style uncoloured.
    pub fn from_toml_str(src: &str) -> anyhow::Result<Self> {
        let raw: RawTheme = Config::builder()
            .add_source(File::from_str(src, FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        Ok(Self {
            timestamp: raw.timestamp.into_style(),
            header: raw.header.into_style(),
            hint: raw.hint.into_style(),
            warn: raw.severity.warn.into_style(),
            error: raw.severity.error.into_style(),
            source_default: raw.sources.default.into_style(),
            source_fixed: raw
                .sources
                .fixed
                .into_iter()
                .map(|(name, style)| (name, style.into_style()))
                .collect(),
            source_palette: raw
                .sources
                .palette
                .iter()
                .filter_map(|s| parse_color(s))
                .collect(),
        })
    }

    /// Style for the message text. Informational lines are left plain.
    pub fn severity_style(&self, severity: Severity) -> ContentStyle {
        match severity {
            Severity::Info => ContentStyle::new(),
            Severity::Warn => self.warn,
            Severity::Error => self.error,
        }
    }

    pub fn service_style(&self, service: &str) -> ContentStyle {
        if let Some(style) = self.source_fixed.get(service) {
            return *style;
        }
        if self.source_palette.is_empty() {
            return self.source_default;
        }
        let idx = stable_hash(service) % self.source_palette.len();
        let mut style = ContentStyle::new();
        style.foreground_color = Some(self.source_palette[idx]);
        style
    }
}

/// djb2-style hash, stable across Rust versions and process restarts.
fn stable_hash(s: &str) -> usize {
    s.bytes().fold(5381usize, |acc, b| {
        acc.wrapping_mul(31).wrapping_add(b as usize)
    })
}

/// Accepts crossterm colour names (`dark_red`, `grey`, ...), `#rrggbb`, and
/// `indexed:N`.
fn parse_color(s: &str) -> Option<Color> {
    match s.to_ascii_lowercase().as_str() {
        "black" => Some(Color::Black),
        "red" => Some(Color::Red),
        "dark_red" => Some(Color::DarkRed),
        "green" => Some(Color::Green),
        "dark_green" => Some(Color::DarkGreen),
        "yellow" => Some(Color::Yellow),
        "dark_yellow" => Some(Color::DarkYellow),
        "blue" => Some(Color::Blue),
        "dark_blue" => Some(Color::DarkBlue),
        "magenta" => Some(Color::Magenta),
        "dark_magenta" => Some(Color::DarkMagenta),
        "cyan" => Some(Color::Cyan),
        "dark_cyan" => Some(Color::DarkCyan),
        "white" => Some(Color::White),
        "gray" | "grey" => Some(Color::Grey),
        "dark_gray" | "dark_grey" => Some(Color::DarkGrey),
        s if s.starts_with('#') && s.len() == 7 => {
            let r = u8::from_str_radix(&s[1..3], 16).ok()?;
            let g = u8::from_str_radix(&s[3..5], 16).ok()?;
            let b = u8::from_str_radix(&s[5..7], 16).ok()?;
            Some(Color::Rgb { r, g, b })
        }
        s if s.starts_with("indexed:") => {
            let n: u8 = s["indexed:".len()..].parse().ok()?;
            Some(Color::AnsiValue(n))
        }
        _ => None,
    }
}
