//! Core types for mergetail-core.
//!
//! This module defines the data that flows between the layers: the sequenced
//! [`Entry`], the [`SourceId`] that tags it, the [`SourceKind`] timestamp hint,
//! the [`Feed`] message carried on the shared queue, and the [`Severity`] a
//! rendered line is classified as.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// One line of output, stamped and sequenced by its source reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Best-effort absolute timestamp. Parsed from the line when possible,
    /// otherwise synthesised from the previous timestamp of the same source.
    pub sort_key: DateTime<Utc>,
    /// Per-source counter, strictly increasing in read order. Starts at 1.
    pub sequence: u64,
    /// Which stream the line came from.
    pub source: SourceId,
    /// Raw line content with the trailing newline removed.
    pub text: String,
}

impl Entry {
    pub fn new(
        source: SourceId,
        sort_key: DateTime<Utc>,
        sequence: u64,
        text: impl Into<String>,
    ) -> Self {
        Self {
            sort_key,
            sequence,
            source,
            text: text.into(),
        }
    }
}

/// Stable identifier of a stream, rendered as `name/channel`
/// (e.g. `api/out`, `api/err`, `nginx/access.log`).
///
/// Cloning is cheap: every entry of a source shares the same allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId {
    label: Arc<str>,
    name_len: usize,
}

impl SourceId {
    pub fn new(name: &str, channel: &str) -> Self {
        Self {
            label: Arc::from(format!("{name}/{channel}")),
            name_len: name.len(),
        }
    }

    /// Service or process name, e.g. `api` or `nginx`.
    pub fn name(&self) -> &str {
        &self.label[..self.name_len]
    }

    /// Stream within the service, e.g. `out`, `err` or a log file name.
    pub fn channel(&self) -> &str {
        &self.label[self.name_len + 1..]
    }

    /// Full `name/channel` label.
    pub fn as_str(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Timestamp format hint for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Application output; lines usually start with an ISO-like timestamp.
    #[default]
    Generic,
    /// Web-server access/error logs with a bracketed `[DD/Mon/YYYY:...]` stamp.
    WebAccess,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Generic => write!(f, "generic"),
            SourceKind::WebAccess => write!(f, "web-access"),
        }
    }
}

/// Message carried on the shared queue from source readers to the merge
/// engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    Entry(Entry),
    /// The reader for this source has stopped and will send nothing more.
    Finished(SourceId),
}

/// Severity a rendered line is classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warn => write!(f, "warn"),
            Severity::Error => write!(f, "error"),
        }
    }
}
