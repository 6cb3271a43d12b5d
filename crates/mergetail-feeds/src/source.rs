//! Per-source stamping state.
//!
//! A [`Source`] is owned by exactly one reader task. It turns raw lines into
//! [`Entry`] values: the timestamp comes from the line when one can be
//! extracted, otherwise it is one microsecond after the previous timestamp of
//! the same source, so unparseable continuation lines (stack traces, wrapped
//! JSON) stay glued to the line they follow.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use mergetail_core::{timestamp, Entry, SourceId, SourceKind};

/// A stream to tail, as produced by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub id: SourceId,
    pub kind: SourceKind,
    pub path: PathBuf,
}

impl SourceSpec {
    pub fn new(id: SourceId, kind: SourceKind, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            kind,
            path: path.into(),
        }
    }
}

/// Prefix of every synthetic diagnostic line.
pub const DIAGNOSTIC_PREFIX: &str = "[mergetail]";

#[derive(Debug)]
pub struct Source {
    spec: SourceSpec,
    last_known: DateTime<Utc>,
    sequence: u64,
}

impl Source {
    /// `start` seeds the timestamp given to lines that carry none of their
    /// own, until a real timestamp is seen.
    pub fn new(spec: SourceSpec, start: DateTime<Utc>) -> Self {
        Self {
            spec,
            last_known: start,
            sequence: 0,
        }
    }

    pub fn id(&self) -> &SourceId {
        &self.spec.id
    }

    pub fn path(&self) -> &Path {
        &self.spec.path
    }

    pub fn last_known(&self) -> DateTime<Utc> {
        self.last_known
    }

    /// Re-seed the synthetic timestamp, typically with the file's mtime.
    pub fn start_at(&mut self, start: DateTime<Utc>) {
        self.last_known = start;
    }

    /// Stamp and sequence one line read from the stream.
    pub fn stamp(&mut self, text: String) -> Entry {
        let ts = timestamp::extract(&text, self.spec.kind)
            .unwrap_or_else(|| self.last_known + Duration::microseconds(1));
        self.last_known = ts;
        Entry::new(self.spec.id.clone(), ts, self.next_sequence(), text)
    }

    /// Build a diagnostic entry describing a problem with this source. It is
    /// stamped `now` and does not move the synthetic timestamp.
    pub fn diagnostic(&mut self, message: impl fmt::Display, now: DateTime<Utc>) -> Entry {
        let text = format!("{DIAGNOSTIC_PREFIX} {message}");
        Entry::new(self.spec.id.clone(), now, self.next_sequence(), text)
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}
