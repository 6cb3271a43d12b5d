//! mergetail-core: shared types and the merge engine.
//!
//! # Architecture
//!
//! ```text
//! SourceReader ─┐
//! SourceReader ─┼──► bounded queue ──► MergeEngine ──► Sink
//! SourceReader ─┘
//! ```
//!
//! Readers live in `mergetail-feeds`, the terminal sink in `mergetail-term`.
//! This crate holds what they agree on: [`Entry`] and [`Feed`], timestamp
//! extraction, the `--since` window, configuration, and the engine itself.

pub mod clock;
pub mod config;
pub mod merge;
pub mod since;
pub mod sink;
pub mod timestamp;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use merge::{MergeEngine, MergeOutcome, MergeReport, MergeSettings, MergeStats, ReorderBuffer};
pub use sink::{Sink, SinkError};
pub use types::{Entry, Feed, Severity, SourceId, SourceKind};
