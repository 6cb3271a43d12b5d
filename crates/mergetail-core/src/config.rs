//! Configuration types for mergetail.
//!
//! [`Config::load`] reads `~/.config/mergetail/config.toml`, creating it with
//! hardcoded defaults if it does not yet exist. [`Config::defaults`] returns
//! the same defaults without touching the filesystem (useful in tests).
//! Command-line flags are applied on top by the binary.

use std::path::PathBuf;
use std::time::Duration as StdDuration;

use serde::Deserialize;

use crate::merge::MergeSettings;
use crate::types::SourceKind;

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[merge]
flush_delay_secs  = 1.0
poll_interval_ms  = 200
queue_capacity    = 2048
shutdown_grace_ms = 2000

[sources]
follow              = true
since               = "1h"
include_optional    = true
pm2_apps            = []
nginx_dir           = "/var/log/nginx"
nginx_candidates    = ["access.log", "error.log"]
privileged_fallback = true
tail_poll_ms        = 250

[output]
color            = "auto"
timestamp_format = "%Y-%m-%d %I:%M:%S %p"
utc              = false
"#;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Load(#[from] config::ConfigError),
    #[error("failed to create config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level configuration, loaded from `~/.config/mergetail/config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[merge]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct MergeConfig {
    #[serde(default = "default_flush_delay_secs")]
    pub flush_delay_secs: f64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

fn default_flush_delay_secs() -> f64 { 1.0 }
fn default_poll_interval_ms() -> u64 { 200 }
fn default_queue_capacity() -> usize { 2048 }
fn default_shutdown_grace_ms() -> u64 { 2000 }

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            flush_delay_secs: default_flush_delay_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            queue_capacity: default_queue_capacity(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl MergeConfig {
    pub fn settings(&self) -> MergeSettings {
        MergeSettings {
            flush_delay: chrono::Duration::microseconds(
                (self.flush_delay_secs * 1_000_000.0).round() as i64,
            ),
            poll_interval: StdDuration::from_millis(self.poll_interval_ms),
        }
    }

    pub fn shutdown_grace(&self) -> StdDuration {
        StdDuration::from_millis(self.shutdown_grace_ms)
    }
}

/// `[sources]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_follow")]
    pub follow: bool,
    #[serde(default = "default_since")]
    pub since: String,
    /// Web-server logs are optional: picked up when present, skipped silently
    /// when not.
    #[serde(default = "default_include_optional")]
    pub include_optional: bool,
    /// pm2 process names whose stdout/stderr logs are tailed.
    #[serde(default)]
    pub pm2_apps: Vec<String>,
    #[serde(default = "default_nginx_dir")]
    pub nginx_dir: PathBuf,
    #[serde(default = "default_nginx_candidates")]
    pub nginx_candidates: Vec<String>,
    /// Retry unreadable files through `sudo -n tail`.
    #[serde(default = "default_privileged_fallback")]
    pub privileged_fallback: bool,
    #[serde(default = "default_tail_poll_ms")]
    pub tail_poll_ms: u64,
    #[serde(default)]
    pub files: Vec<FileSourceConfig>,
}

fn default_follow() -> bool { true }
fn default_since() -> String { "1h".to_string() }
fn default_include_optional() -> bool { true }
fn default_nginx_dir() -> PathBuf { PathBuf::from("/var/log/nginx") }
fn default_nginx_candidates() -> Vec<String> {
    vec!["access.log".to_string(), "error.log".to_string()]
}
fn default_privileged_fallback() -> bool { true }
fn default_tail_poll_ms() -> u64 { 250 }

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            follow: default_follow(),
            since: default_since(),
            include_optional: default_include_optional(),
            pm2_apps: Vec::new(),
            nginx_dir: default_nginx_dir(),
            nginx_candidates: default_nginx_candidates(),
            privileged_fallback: default_privileged_fallback(),
            tail_poll_ms: default_tail_poll_ms(),
            files: Vec::new(),
        }
    }
}

impl SourcesConfig {
    pub fn tail_poll(&self) -> StdDuration {
        StdDuration::from_millis(self.tail_poll_ms)
    }
}

/// One `[[sources.files]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FileSourceConfig {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub kind: SourceKind,
}

/// When to emit ANSI colour codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// `[output]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub color: ColorMode,
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
    /// Render timestamps in UTC instead of the local zone.
    #[serde(default)]
    pub utc: bool,
}

fn default_timestamp_format() -> String { "%Y-%m-%d %I:%M:%S %p".to_string() }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            color: ColorMode::default(),
            timestamp_format: default_timestamp_format(),
            utc: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load from `~/.config/mergetail/config.toml`, layered on top of the
    /// built-in defaults. Creates the file with defaults if it does not exist;
    /// a read-only home directory only costs a warning.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path();

        if !path.exists() {
            if let Err(err) = write_default(&path) {
                tracing::warn!(error = %err, "could not create default config file");
            }
        }

        Self::from_sources(Some(path))
    }

    /// Load defaults layered with an explicit file (which may be missing).
    pub fn from_sources(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml));
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.as_path()).required(false));
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let delay = self.merge.flush_delay_secs;
        if !delay.is_finite() || delay < 0.0 || delay > 3_600.0 {
            return Err(ConfigError::Invalid(format!(
                "merge.flush_delay_secs must be between 0 and 3600, got {delay}"
            )));
        }
        if self.merge.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "merge.poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.merge.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "merge.queue_capacity must be positive".to_string(),
            ));
        }
        if self.sources.tail_poll_ms == 0 {
            return Err(ConfigError::Invalid(
                "sources.tail_poll_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn write_default(path: &std::path::Path) -> Result<(), ConfigError> {
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, DEFAULT_CONFIG.trim_start())
    };
    write().map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
                .join(".config")
        })
        .join("mergetail")
        .join("config.toml")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_load() {
        let cfg = Config::defaults();
        assert!(cfg.sources.follow);
        assert_eq!(cfg.sources.since, "1h");
        assert_eq!(cfg.merge.queue_capacity, 2048);
        assert_eq!(cfg.output.color, ColorMode::Auto);
        assert!(cfg.sources.pm2_apps.is_empty());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn settings_convert_fractional_delay() {
        let mut cfg = Config::defaults();
        cfg.merge.flush_delay_secs = 0.25;
        let settings = cfg.merge.settings();
        assert_eq!(settings.flush_delay, chrono::Duration::milliseconds(250));
        assert_eq!(settings.poll_interval, StdDuration::from_millis(200));
    }

    #[test]
    fn negative_delay_is_rejected() {
        let mut cfg = Config::defaults();
        cfg.merge.flush_delay_secs = -1.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn user_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[sources]
pm2_apps = ["api", "worker"]

[[sources.files]]
name = "edge"
path = "/var/log/edge/access.log"
kind = "web-access"

[output]
color = "never"
"#
        )
        .unwrap();

        let cfg = Config::from_sources(Some(path)).unwrap();
        assert_eq!(cfg.sources.pm2_apps, ["api", "worker"]);
        assert_eq!(cfg.sources.files.len(), 1);
        assert_eq!(cfg.sources.files[0].kind, SourceKind::WebAccess);
        assert_eq!(cfg.output.color, ColorMode::Never);
        assert_eq!(cfg.sources.since, "1h");
    }

    #[test]
    fn missing_user_file_falls_back_to_defaults() {
        let cfg = Config::from_sources(Some(PathBuf::from("/nonexistent/mergetail.toml"))).unwrap();
        assert_eq!(cfg.merge.poll_interval_ms, 200);
    }
}
