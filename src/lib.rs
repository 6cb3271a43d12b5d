//! mergetail: tail many log files at once, print one merged feed.
//!
//! # Architecture
//!
//! ```text
//! discovery ──► readers (one per source) ──► queue ──► MergeEngine ──► TerminalSink
//! ```
//!
//! Each reader owns one file and stamps its lines; the engine holds entries
//! in a min-heap for a short flush delay so that sources writing slightly out
//! of step still come out in timestamp order.
//!
//! The work happens in the `mergetail-core`, `mergetail-feeds` and
//! `mergetail-term` crates; this crate wires them into a program.

pub mod app;
pub mod cli;
