#![allow(unused)]
//! End-to-end pipeline harness: real files, real readers, the real engine.
//!
//! # What this covers
//!
//! - **Merged order**: interleaved sources come out in timestamp order, with
//!   unstamped continuation lines kept behind the line they follow.
//! - **Isolation**: a missing file yields one diagnostic line and the run
//!   still completes with every other source intact.
//! - **Since cutoff**: lines older than the window never reach the sink.
//! - **Follow + cancel**: a following run stops on cancellation after a
//!   final flush, and a closed sink stops a following run on its own.
//!
//! # Running
//!
//! ```sh
//! cargo test --test pipeline_harness
//! ```

mod common;
use common::*;

use std::time::Duration as StdDuration;

use chrono::Duration;
use mergetail::app::{supervise, PipelineSettings};
use mergetail_core::{ManualClock, MergeOutcome, MergeSettings, SourceKind, SystemClock};
use mergetail_feeds::{ReaderOptions, SourceSpec};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

const PATIENCE: StdDuration = StdDuration::from_secs(10);

fn pipeline(delay_ms: i64) -> PipelineSettings {
    PipelineSettings {
        merge: MergeSettings {
            flush_delay: Duration::milliseconds(delay_ms),
            poll_interval: StdDuration::from_millis(20),
        },
        queue_capacity: 64,
        shutdown_grace: StdDuration::from_secs(2),
    }
}

/// One-shot run with the clock parked before every fixture timestamp, so
/// nothing is emitted until the final flush and the order is fully decided
/// by the reorder buffer.
async fn run_once(
    sources: Vec<SourceSpec>,
    options: ReaderOptions,
) -> (MergeOutcome, RecordingSink) {
    let sink = RecordingSink::new();
    let record = sink.clone();
    let clock = ManualClock::new(ts("2024-01-15 00:00:00"));
    let report = tokio::time::timeout(
        PATIENCE,
        supervise(sources, options, pipeline(1_000), sink, clock, CancellationToken::new()),
    )
    .await
    .expect("one-shot run did not finish")
    .unwrap();
    (report.outcome, record)
}

// ---------------------------------------------------------------------------
// One-shot
// ---------------------------------------------------------------------------

#[tokio::test]
async fn interleaved_sources_are_merged_by_timestamp() {
    let logs = LogDir::new();
    logs.write("api.log", API_LINES);
    logs.write("worker.log", WORKER_LINES);

    let (outcome, record) = run_once(
        vec![logs.spec("api/out", "api.log"), logs.spec("worker/out", "worker.log")],
        one_shot(),
    )
    .await;

    assert_eq!(outcome, MergeOutcome::Completed);
    assert_eq!(record.lines(), API_WORKER_MERGED);
}

#[tokio::test]
async fn missing_source_does_not_disturb_the_others() {
    let logs = LogDir::new();
    logs.write("api.log", API_LINES);

    let (outcome, record) = run_once(
        vec![logs.spec("api/out", "api.log"), logs.spec("ghost/out", "ghost.log")],
        one_shot(),
    )
    .await;

    assert_eq!(outcome, MergeOutcome::Completed);
    let lines = record.lines();
    let ghost: Vec<_> = lines.iter().filter(|l| l.starts_with("[ghost/out]")).collect();
    assert_eq!(ghost.len(), 1);
    assert!(ghost[0].contains("[mergetail] missing log file:"), "{}", ghost[0]);

    let api: Vec<_> = lines.iter().filter(|l| l.starts_with("[api/out]")).collect();
    assert_eq!(api.len(), API_LINES.len());
}

#[tokio::test]
async fn lines_before_the_cutoff_are_dropped() {
    let logs = LogDir::new();
    logs.write("api.log", API_LINES);
    let mut options = one_shot();
    options.since = Some(ts("2024-01-15 10:00:02"));

    let (_, record) = run_once(vec![logs.spec("api/out", "api.log")], options).await;

    assert_eq!(
        record.lines(),
        [
            "[api/out] 2024-01-15 10:00:02 ERROR request failed: upstream reset",
            "[api/out]     at handler (server.js:42)",
            "[api/out]     at process (queue.js:7)",
            "[api/out] 2024-01-15 10:00:04 INFO  request ok",
        ]
    );
    let sequences: Vec<_> = record.entries().iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, [2, 3, 4, 5]);
}

#[tokio::test]
async fn access_log_stamps_are_normalised_before_merging() {
    let logs = LogDir::new();
    let app = logs.write(
        "app.log",
        &["2024-01-15 08:00:00 boot", "2024-01-15 08:00:05 ready"],
    );
    let access = logs.write("access.log", ACCESS_LINES);

    let sources = vec![
        spec_at("app/out", &app),
        SourceSpec::new(id("nginx/access.log"), SourceKind::WebAccess, access),
    ];
    let (_, record) = run_once(sources, one_shot()).await;

    let order: Vec<_> = record
        .entries()
        .iter()
        .map(|e| e.source.as_str().to_string())
        .collect();
    assert_eq!(order, ["app/out", "nginx/access.log", "app/out", "nginx/access.log"]);
}

// ---------------------------------------------------------------------------
// Follow mode
// ---------------------------------------------------------------------------

async fn wait_for(record: &RecordingSink, count: usize) {
    tokio::time::timeout(PATIENCE, async {
        while record.entries().len() < count {
            tokio::time::sleep(StdDuration::from_millis(20)).await;
        }
    })
    .await
    .expect("entries did not arrive");
}

#[tokio::test]
async fn cancellation_stops_a_following_run() {
    let logs = LogDir::new();
    logs.write("api.log", &["2024-01-15 10:00:00 first"]);
    let sink = RecordingSink::new();
    let record = sink.clone();
    let cancel = CancellationToken::new();

    let run = tokio::spawn(supervise(
        vec![logs.spec("api/out", "api.log")],
        following(),
        pipeline(0),
        sink,
        SystemClock,
        cancel.clone(),
    ));

    wait_for(&record, 1).await;
    logs.append("api.log", &["2024-01-15 10:00:01 second"]);
    wait_for(&record, 2).await;

    cancel.cancel();
    let report = tokio::time::timeout(PATIENCE, run)
        .await
        .expect("run did not stop")
        .unwrap()
        .unwrap();

    assert_eq!(report.outcome, MergeOutcome::Cancelled);
    assert_eq!(
        record.lines(),
        ["[api/out] 2024-01-15 10:00:00 first", "[api/out] 2024-01-15 10:00:01 second"]
    );
}

#[tokio::test]
async fn closed_sink_stops_a_following_run() {
    let logs = LogDir::new();
    logs.write("api.log", API_LINES);
    logs.write("worker.log", WORKER_LINES);

    let report = tokio::time::timeout(
        PATIENCE,
        supervise(
            vec![logs.spec("api/out", "api.log"), logs.spec("worker/out", "worker.log")],
            following(),
            pipeline(0),
            RecordingSink::closing_after(3),
            SystemClock,
            CancellationToken::new(),
        ),
    )
    .await
    .expect("run did not stop after the sink closed")
    .unwrap();

    assert_eq!(report.outcome, MergeOutcome::DownstreamClosed);
    assert_eq!(report.stats.emitted, 3);
}
