//! Static log corpora shared across harnesses.

/// An API process: timestamped lines plus a stack trace with no stamps.
pub const API_LINES: &[&str] = &[
    "2024-01-15 10:00:00 INFO  api listening on :8080",
    "2024-01-15 10:00:02 ERROR request failed: upstream reset",
    "    at handler (server.js:42)",
    "    at process (queue.js:7)",
    "2024-01-15 10:00:04 INFO  request ok",
];

/// A worker whose stamps interleave with [`API_LINES`].
pub const WORKER_LINES: &[&str] = &[
    "2024-01-15 10:00:01 picked job 17",
    "2024-01-15 10:00:03,250 job 17 done",
    "2024-01-15 10:00:05 idle",
];

/// Combined-format access log, local time +02:00 (08:00Z is 10:00+02).
pub const ACCESS_LINES: &[&str] = &[
    r#"10.0.0.1 - - [15/Jan/2024:10:00:01 +0200] "GET /health HTTP/1.1" 200 2"#,
    r#"10.0.0.2 - - [15/Jan/2024:10:00:06 +0200] "POST /api HTTP/1.1" 502 0"#,
];

/// Expected merged order of API_LINES and WORKER_LINES.
pub const API_WORKER_MERGED: &[&str] = &[
    "[api/out] 2024-01-15 10:00:00 INFO  api listening on :8080",
    "[worker/out] 2024-01-15 10:00:01 picked job 17",
    "[api/out] 2024-01-15 10:00:02 ERROR request failed: upstream reset",
    "[api/out]     at handler (server.js:42)",
    "[api/out]     at process (queue.js:7)",
    "[worker/out] 2024-01-15 10:00:03,250 job 17 done",
    "[api/out] 2024-01-15 10:00:04 INFO  request ok",
    "[worker/out] 2024-01-15 10:00:05 idle",
];
