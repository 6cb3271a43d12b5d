//! Test builders. They panic on invalid input rather than returning `Result`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use mergetail_core::{Entry, SourceId, SourceKind};
use mergetail_feeds::{ReadMode, ReaderOptions, SourceSpec, StreamOptions};

/// `"2024-01-01 10:00:00"` as a UTC instant.
pub fn ts(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|e| panic!("bad test timestamp {s:?}: {e}"))
        .and_utc()
}

/// `"api/out"` → `SourceId`.
pub fn id(label: &str) -> SourceId {
    let (name, channel) = label
        .split_once('/')
        .unwrap_or_else(|| panic!("label {label:?} needs a '/'"));
    SourceId::new(name, channel)
}

pub fn entry(label: &str, at: &str, sequence: u64, text: &str) -> Entry {
    Entry::new(id(label), ts(at), sequence, text.to_string())
}

/// Reader settings for one-shot reads with no cutoff and no privileged
/// fallback.
pub fn one_shot() -> ReaderOptions {
    ReaderOptions {
        stream: StreamOptions {
            mode: ReadMode::OneShot,
            poll: Duration::from_millis(10),
            privileged: None,
        },
        since: None,
    }
}

pub fn following() -> ReaderOptions {
    let mut options = one_shot();
    options.stream.mode = ReadMode::Follow;
    options
}

/// A directory of log files that lives as long as the value.
pub struct LogDir {
    dir: tempfile::TempDir,
}

impl LogDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `lines` (newline-terminated) to `name` and return its path.
    pub fn write(&self, name: &str, lines: &[&str]) -> PathBuf {
        let path = self.path(name);
        let mut body = lines.join("\n");
        if !lines.is_empty() {
            body.push('\n');
        }
        std::fs::write(&path, body).expect("write log file");
        path
    }

    pub fn append(&self, name: &str, lines: &[&str]) {
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.path(name))
            .expect("open log file");
        for line in lines {
            writeln!(file, "{line}").expect("append line");
        }
    }

    pub fn spec(&self, label: &str, file: &str) -> SourceSpec {
        spec_at(label, &self.path(file))
    }
}

impl Default for LogDir {
    fn default() -> Self {
        Self::new()
    }
}

pub fn spec_at(label: &str, path: &Path) -> SourceSpec {
    SourceSpec::new(id(label), SourceKind::Generic, path)
}
