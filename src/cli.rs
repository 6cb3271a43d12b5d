//! Command-line flags. Every flag overrides the matching config value.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use mergetail_core::config::{ColorMode, Config, FileSourceConfig};
use mergetail_core::SourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorArg {
    Auto,
    Always,
    Never,
}

impl From<ColorArg> for ColorMode {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => ColorMode::Auto,
            ColorArg::Always => ColorMode::Always,
            ColorArg::Never => ColorMode::Never,
        }
    }
}

/// `NAME=PATH` pair from `--file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArg {
    pub name: String,
    pub path: PathBuf,
}

fn parse_file_arg(s: &str) -> Result<FileArg, String> {
    match s.split_once('=') {
        Some((name, path)) if !name.is_empty() && !name.contains('/') && !path.is_empty() => {
            Ok(FileArg {
                name: name.to_string(),
                path: PathBuf::from(path),
            })
        }
        _ => Err(format!("expected NAME=PATH (NAME without '/'), got '{s}'")),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "mergetail",
    version,
    about = "Tail many log files at once and print one chronologically merged feed"
)]
pub struct Cli {
    /// Read what exists now and exit instead of following.
    #[arg(long)]
    pub no_follow: bool,

    /// Skip web-server log detection.
    #[arg(long)]
    pub no_nginx: bool,

    /// Skip pm2 process discovery.
    #[arg(long)]
    pub no_pm2: bool,

    /// Seconds to hold entries for reordering.
    #[arg(long, value_name = "SECS")]
    pub flush_delay: Option<f64>,

    /// Only show entries newer than this: 30m, 2h, 1d, or `all`.
    #[arg(long, value_name = "SPEC")]
    pub since: Option<String>,

    /// List discovered sources and their paths, then exit.
    #[arg(long)]
    pub paths: bool,

    #[arg(long, value_enum, value_name = "WHEN")]
    pub color: Option<ColorArg>,

    /// Extra file to tail, labelled NAME/<file name>. Repeatable.
    #[arg(long = "file", value_name = "NAME=PATH", value_parser = parse_file_arg)]
    pub files: Vec<FileArg>,

    /// Write debug logs to /tmp/mergetail-debug.log (tail -f to inspect).
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    pub fn apply(&self, config: &mut Config) {
        if self.no_follow {
            config.sources.follow = false;
        }
        if self.no_nginx {
            config.sources.include_optional = false;
        }
        if self.no_pm2 {
            config.sources.pm2_apps.clear();
        }
        if let Some(delay) = self.flush_delay {
            config.merge.flush_delay_secs = delay;
        }
        if let Some(since) = &self.since {
            config.sources.since = since.clone();
        }
        if let Some(color) = self.color {
            config.output.color = color.into();
        }
        config
            .sources
            .files
            .extend(self.files.iter().map(|f| FileSourceConfig {
                name: f.name.clone(),
                path: f.path.clone(),
                kind: SourceKind::Generic,
            }));
    }
}
