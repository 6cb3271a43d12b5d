//! Source reader task: one per source, feeding the shared queue.
//!
//! The reader opens its stream, seeds the synthetic timestamp from the file's
//! mtime, then stamps, sequences, filters and forwards every line. Failures
//! never escape the task: they become a single diagnostic entry in the feed.
//! Whatever happens, the reader ends with a [`Feed::Finished`] marker so the
//! merge engine can count live sources.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mergetail_core::{Clock, Entry, Feed};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::source::{Source, SourceSpec};
use crate::stream::{open_stream, StreamOptions};

/// Settings shared by every reader of a run.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    pub stream: StreamOptions,
    /// Entries stamped strictly before this are dropped.
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    pub lines: u64,
    pub skipped: u64,
    pub diagnostics: u64,
}

/// The queue went away; nothing more can be delivered.
struct QueueClosed;

pub struct SourceReader<C> {
    source: Source,
    options: Arc<ReaderOptions>,
    clock: C,
    stats: ReaderStats,
}

impl<C: Clock + 'static> SourceReader<C> {
    pub fn new(spec: SourceSpec, options: Arc<ReaderOptions>, clock: C) -> Self {
        let start = clock.now();
        Self {
            source: Source::new(spec, start),
            options,
            clock,
            stats: ReaderStats::default(),
        }
    }

    /// Read until the stream ends, fails, or `cancel` fires.
    pub async fn run(mut self, tx: mpsc::Sender<Feed>, cancel: CancellationToken) -> ReaderStats {
        let id = self.source.id().clone();

        let cancelled = tokio::select! {
            biased;
            _ = cancel.cancelled() => true,
            _ = self.pump(&tx) => false,
        };

        // The stream handle is already dropped here; only the marker remains.
        let marker = Feed::Finished(id.clone());
        if cancelled {
            let _ = tx.try_send(marker);
        } else {
            let _ = tx.send(marker).await;
        }

        debug!(
            source = %id,
            cancelled,
            lines = self.stats.lines,
            skipped = self.stats.skipped,
            "reader finished"
        );
        self.stats
    }

    async fn pump(&mut self, tx: &mpsc::Sender<Feed>) -> Result<(), QueueClosed> {
        let path = self.source.path().to_path_buf();
        let mut stream = match open_stream(&path, &self.options.stream).await {
            Ok(stream) => stream,
            Err(err) => {
                debug!(source = %self.source.id(), error = %err, "source unavailable");
                let entry = self.source.diagnostic(&err, self.clock.now());
                return self.send_diagnostic(tx, entry).await;
            }
        };

        let start = match tokio::fs::metadata(&path).await.and_then(|m| m.modified()) {
            Ok(mtime) => DateTime::<Utc>::from(mtime),
            Err(_) => self.clock.now(),
        };
        self.source.start_at(start);

        loop {
            match stream.next_line().await {
                Ok(Some(line)) => {
                    self.stats.lines += 1;
                    let entry = self.source.stamp(line);
                    if self.options.since.is_some_and(|cutoff| entry.sort_key < cutoff) {
                        self.stats.skipped += 1;
                        continue;
                    }
                    tx.send(Feed::Entry(entry)).await.map_err(|_| QueueClosed)?;
                }
                Ok(None) => return Ok(()),
                Err(err) => {
                    debug!(source = %self.source.id(), error = %err, "source read failed");
                    let entry = self.source.diagnostic(&err, self.clock.now());
                    return self.send_diagnostic(tx, entry).await;
                }
            }
        }
    }

    async fn send_diagnostic(
        &mut self,
        tx: &mpsc::Sender<Feed>,
        entry: Entry,
    ) -> Result<(), QueueClosed> {
        self.stats.diagnostics += 1;
        tx.send(Feed::Entry(entry)).await.map_err(|_| QueueClosed)
    }
}
