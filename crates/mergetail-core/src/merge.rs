//! Merge engine: time-windowed k-way merge of every source's entries.
//!
//! Readers push entries in per-source order but sources race each other, so
//! arrival order at this point is only locally sorted. Every entry is parked
//! in a min-heap keyed by `(sort_key, sequence, source)` and released once it
//! is at least `flush_delay` old, giving slower sources that long to deliver
//! anything earlier.
//!
//! ```text
//! reader ─┐
//! reader ─┼─► mpsc (bounded) ─► ReorderBuffer ─► Sink
//! reader ─┘                        ▲
//!                           poll tick / arrival
//! ```
//!
//! A source that stalls for longer than the window can still be printed out
//! of order; the window bounds latency, not correctness.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::clock::Clock;
use crate::sink::{Sink, SinkError};
use crate::types::{Entry, Feed};

// ---------------------------------------------------------------------------
// Reorder buffer
// ---------------------------------------------------------------------------

/// Heap slot ordered by `(sort_key, sequence, source)`.
///
/// Two different entries never compare equal: sequences are unique per
/// source, and the source breaks ties between sources.
#[derive(Debug)]
struct Pending(Entry);

impl Pending {
    fn key(&self) -> (&DateTime<Utc>, u64, &str) {
        (&self.0.sort_key, self.0.sequence, self.0.source.as_str())
    }
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Delay buffer that releases entries in timestamp order once they are older
/// than the flush window.
#[derive(Debug)]
pub struct ReorderBuffer {
    heap: BinaryHeap<Reverse<Pending>>,
    flush_delay: Duration,
}

impl ReorderBuffer {
    pub fn new(flush_delay: Duration) -> Self {
        Self {
            heap: BinaryHeap::new(),
            flush_delay,
        }
    }

    pub fn push(&mut self, entry: Entry) {
        self.heap.push(Reverse(Pending(entry)));
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Timestamp of the oldest buffered entry.
    pub fn oldest(&self) -> Option<DateTime<Utc>> {
        self.heap.peek().map(|Reverse(p)| p.0.sort_key)
    }

    /// Pop the oldest entry if it is at least `flush_delay` older than `now`.
    pub fn pop_ready(&mut self, now: DateTime<Utc>) -> Option<Entry> {
        let threshold = now - self.flush_delay;
        match self.oldest() {
            Some(ts) if ts <= threshold => self.pop(),
            _ => None,
        }
    }

    /// Pop the oldest entry regardless of age.
    pub fn pop(&mut self) -> Option<Entry> {
        self.heap.pop().map(|Reverse(p)| p.0)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Tuning knobs for [`MergeEngine`].
#[derive(Debug, Clone, Copy)]
pub struct MergeSettings {
    /// How long an entry is held past its own timestamp before it may be emitted.
    pub flush_delay: Duration,
    /// Upper bound on how long the engine waits for new data before running a
    /// time-based flush.
    pub poll_interval: StdDuration,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            flush_delay: Duration::seconds(1),
            poll_interval: StdDuration::from_millis(200),
        }
    }
}

/// Why the engine stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Every source finished and the buffer was drained.
    Completed,
    /// The run was cancelled; buffered entries were flushed first.
    Cancelled,
    /// The sink reported that its consumer went away.
    DownstreamClosed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub received: u64,
    pub emitted: u64,
    pub sources_finished: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    pub outcome: MergeOutcome,
    pub stats: MergeStats,
}

enum Flow {
    Continue,
    Closed,
}

/// Single consumer of the shared queue. Owns the reorder buffer outright, so
/// nothing in here needs locking.
pub struct MergeEngine<S, C> {
    buffer: ReorderBuffer,
    sink: S,
    clock: C,
    poll_interval: StdDuration,
    live_sources: usize,
    stats: MergeStats,
}

impl<S: Sink, C: Clock> MergeEngine<S, C> {
    /// `sources` is the number of readers that will each send exactly one
    /// [`Feed::Finished`] marker.
    pub fn new(sink: S, clock: C, settings: MergeSettings, sources: usize) -> Self {
        Self {
            buffer: ReorderBuffer::new(settings.flush_delay),
            sink,
            clock,
            poll_interval: settings.poll_interval,
            live_sources: sources,
            stats: MergeStats::default(),
        }
    }

    /// Consume `rx` until every source has finished, the queue closes, the
    /// sink closes, or `cancel` fires. Only non-closure sink errors are
    /// returned as `Err`.
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<Feed>,
        cancel: CancellationToken,
    ) -> Result<MergeReport, SinkError> {
        while self.live_sources > 0 {
            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                polled = tokio::time::timeout(self.poll_interval, rx.recv()) => Some(polled),
            };
            let Some(polled) = polled else {
                return self.shutdown(rx);
            };

            match polled {
                Ok(Some(feed)) => self.accept(feed),
                Ok(None) => {
                    debug!(live = self.live_sources, "queue closed before all sources finished");
                    break;
                }
                // Poll tick: nothing arrived, but time-based flushing may be due.
                Err(_) => {}
            }

            if let Flow::Closed = self.flush(false)? {
                return Ok(self.report(MergeOutcome::DownstreamClosed));
            }
        }

        let outcome = match self.flush(true)? {
            Flow::Continue => MergeOutcome::Completed,
            Flow::Closed => MergeOutcome::DownstreamClosed,
        };
        Ok(self.report(outcome))
    }

    fn accept(&mut self, feed: Feed) {
        match feed {
            Feed::Entry(entry) => {
                self.stats.received += 1;
                self.buffer.push(entry);
            }
            Feed::Finished(source) => {
                self.live_sources = self.live_sources.saturating_sub(1);
                self.stats.sources_finished += 1;
                debug!(%source, live = self.live_sources, "source finished");
            }
        }
    }

    /// Close the queue, take whatever producers already enqueued, then drain
    /// the buffer once, ignoring the delay window.
    fn shutdown(mut self, mut rx: mpsc::Receiver<Feed>) -> Result<MergeReport, SinkError> {
        rx.close();
        while let Ok(feed) = rx.try_recv() {
            self.accept(feed);
        }
        debug!(buffered = self.buffer.len(), "cancelled, forcing final flush");

        let outcome = match self.flush(true)? {
            Flow::Continue => MergeOutcome::Cancelled,
            Flow::Closed => MergeOutcome::DownstreamClosed,
        };
        Ok(self.report(outcome))
    }

    fn flush(&mut self, force: bool) -> Result<Flow, SinkError> {
        let now = self.clock.now();
        let mut emitted = 0u64;

        loop {
            let next = if force {
                self.buffer.pop()
            } else {
                self.buffer.pop_ready(now)
            };
            let Some(entry) = next else { break };

            match self.sink.emit(&entry) {
                Ok(()) => emitted += 1,
                Err(SinkError::Closed) => {
                    self.stats.emitted += emitted;
                    debug!(dropped = self.buffer.len() + 1, "downstream closed");
                    return Ok(Flow::Closed);
                }
                Err(err) => return Err(err),
            }
        }

        self.stats.emitted += emitted;
        if emitted > 0 {
            match self.sink.flush() {
                Ok(()) => {}
                Err(SinkError::Closed) => return Ok(Flow::Closed),
                Err(err) => return Err(err),
            }
        }
        Ok(Flow::Continue)
    }

    fn report(&self, outcome: MergeOutcome) -> MergeReport {
        debug!(
            ?outcome,
            received = self.stats.received,
            emitted = self.stats.emitted,
            sources_finished = self.stats.sources_finished,
            "merge engine stopped"
        );
        MergeReport {
            outcome,
            stats: self.stats,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
