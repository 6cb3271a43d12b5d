//! Wiring: configuration → discovery → readers + merge engine → stdout.
//!
//! [`supervise`] is the task layout on its own (N readers, one bounded queue,
//! one engine) so it can be driven with any sink and clock. [`run`] adds the
//! process concerns around it: config, discovery, header, signals.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use mergetail_core::config::Config;
use mergetail_core::since::{parse_since, SinceWindow};
use mergetail_core::{Clock, MergeEngine, MergeReport, MergeSettings, Sink, SinkError, SystemClock};
use mergetail_feeds::{
    DiscoveryPlan, NginxLogs, Pm2Apps, ReadMode, ReaderOptions, SourceReader, SourceSpec,
    StaticFiles, StreamOptions, TailCommand,
};
use mergetail_term::{RenderOptions, Renderer, TerminalSink};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cli::Cli;

/// Engine and queue settings for one run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub merge: MergeSettings,
    pub queue_capacity: usize,
    /// How long readers get to wind down after the engine stops.
    pub shutdown_grace: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            merge: config.merge.settings(),
            queue_capacity: config.merge.queue_capacity,
            shutdown_grace: config.merge.shutdown_grace(),
        }
    }
}

/// Run one reader per source and the merge engine until every source ends,
/// the sink closes, or `cancel` fires. Readers still running after the
/// engine returns are cancelled, given `shutdown_grace`, then aborted.
pub async fn supervise<S, C>(
    sources: Vec<SourceSpec>,
    reader: ReaderOptions,
    settings: PipelineSettings,
    sink: S,
    clock: C,
    cancel: CancellationToken,
) -> Result<MergeReport, SinkError>
where
    S: Sink,
    C: Clock + Clone + 'static,
{
    let (tx, rx) = mpsc::channel(settings.queue_capacity);
    let reader = Arc::new(reader);
    let stop_readers = cancel.child_token();

    let mut readers = JoinSet::new();
    let count = sources.len();
    for spec in sources {
        let task = SourceReader::new(spec, Arc::clone(&reader), clock.clone());
        readers.spawn(task.run(tx.clone(), stop_readers.clone()));
    }
    drop(tx);

    let engine = MergeEngine::new(sink, clock, settings.merge, count);
    let report = engine.run(rx, cancel).await;

    stop_readers.cancel();
    let drained = tokio::time::timeout(settings.shutdown_grace, async {
        while readers.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        warn!(remaining = readers.len(), "readers did not stop in time, aborting");
        readers.abort_all();
    }

    report
}

/// Build the discovery plan from the (already CLI-adjusted) config.
pub fn discovery_plan(config: &Config) -> DiscoveryPlan {
    let sources = &config.sources;
    let mut files = StaticFiles::new();
    for file in &sources.files {
        files.push(&file.name, &file.path, file.kind);
    }
    DiscoveryPlan {
        pm2: (!sources.pm2_apps.is_empty()).then(|| Pm2Apps::new(sources.pm2_apps.iter().cloned())),
        files,
        nginx: sources
            .include_optional
            .then(|| NginxLogs::new(&sources.nginx_dir, sources.nginx_candidates.iter().cloned())),
    }
}

pub fn reader_options(config: &Config, since: &SinceWindow) -> ReaderOptions {
    ReaderOptions {
        stream: StreamOptions {
            mode: ReadMode::from_follow(config.sources.follow),
            poll: config.sources.tail_poll(),
            privileged: config.sources.privileged_fallback.then(TailCommand::sudo),
        },
        since: since.cutoff,
    }
}

pub fn header_line(renderer: &Renderer, since: &SinceWindow) -> String {
    match since.cutoff {
        None => "mergetail: showing all available logs".to_string(),
        Some(cutoff) => format!(
            "mergetail: showing logs since {} ({})",
            renderer.timestamp(cutoff),
            since.label
        ),
    }
}

/// One `--paths` row: the label padded to a fixed column, then the path.
pub fn path_line(spec: &SourceSpec) -> String {
    format!("{:<24} {}", spec.id.as_str(), spec.path.display())
}

/// The whole program after logging is set up.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load().context("failed to load configuration")?;
    cli.apply(&mut config);
    config.validate()?;

    let clock = SystemClock;
    let render = RenderOptions::from_config(&config.output, config.output.color)?;
    let renderer = Renderer::new(render);

    let discovered = discovery_plan(&config).run().await?;

    if cli.paths {
        let mut out = io::stdout().lock();
        for spec in &discovered.sources {
            writeln!(out, "{}", path_line(spec))?;
        }
        return Ok(());
    }

    let since = parse_since(&config.sources.since, clock.now())?;

    let mut sink = TerminalSink::new(io::stdout(), renderer);
    let header = sink.renderer().header(&header_line(sink.renderer(), &since));
    if let Err(err) = sink.notice(&header) {
        return quiet_if_closed(err);
    }
    if discovered.optional_missing {
        let hint = sink.renderer().hint("mergetail: nginx logs not found or not readable");
        if let Err(err) = sink.notice(&hint) {
            return quiet_if_closed(err);
        }
    }

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let report = supervise(
        discovered.sources,
        reader_options(&config, &since),
        PipelineSettings::from_config(&config),
        sink,
        clock,
        cancel,
    )
    .await;

    match report {
        Ok(report) => {
            debug!(
                outcome = ?report.outcome,
                received = report.stats.received,
                emitted = report.stats.emitted,
                "merge finished"
            );
            Ok(())
        }
        Err(err) => quiet_if_closed(err),
    }
}

/// A closed stdout (`| head`) ends the run cleanly.
fn quiet_if_closed(err: SinkError) -> anyhow::Result<()> {
    if err.is_closed() {
        Ok(())
    } else {
        Err(err).context("failed to write output")
    }
}

async fn cancel_on_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(err) => {
                warn!(error = %err, "SIGTERM handler unavailable");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    debug!("shutdown requested");
    cancel.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mergetail_core::config::FileSourceConfig;
    use mergetail_core::{SourceId, SourceKind};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn plan_follows_config_switches() {
        let mut config = Config::defaults();
        config.sources.include_optional = false;
        config.sources.files.push(FileSourceConfig {
            name: "app".to_string(),
            path: PathBuf::from("/var/log/app.log"),
            kind: SourceKind::Generic,
        });

        let plan = discovery_plan(&config);
        assert!(plan.pm2.is_none());
        assert!(plan.nginx.is_none());
        assert!(!plan.files.is_empty());

        config.sources.pm2_apps = vec!["api".to_string()];
        config.sources.include_optional = true;
        let plan = discovery_plan(&config);
        assert_eq!(plan.pm2.map(|p| p.apps), Some(vec!["api".to_string()]));
        assert_eq!(plan.nginx.map(|n| n.dir), Some(PathBuf::from("/var/log/nginx")));
    }

    #[test]
    fn header_reports_the_window() {
        let renderer = Renderer::new(RenderOptions::new(false, "%Y-%m-%d %H:%M", true).unwrap());
        assert_eq!(
            header_line(&renderer, &SinceWindow::unbounded()),
            "mergetail: showing all available logs"
        );

        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let since = parse_since("2h", now).unwrap();
        assert_eq!(
            header_line(&renderer, &since),
            "mergetail: showing logs since 2024-01-01 10:00 (last 2h)"
        );
    }

    #[test]
    fn path_lines_align_on_the_label_column() {
        let short = SourceSpec::new(
            SourceId::new("api", "out"),
            SourceKind::Generic,
            "/var/log/api.log",
        );
        let long = SourceSpec::new(
            SourceId::new("nginx", "site-access.log"),
            SourceKind::WebAccess,
            "/var/log/nginx/site-access.log",
        );

        assert_eq!(path_line(&short), format!("{:<24} /var/log/api.log", "api/out"));
        assert_eq!(
            path_line(&long),
            "nginx/site-access.log    /var/log/nginx/site-access.log"
        );
    }

    #[test]
    fn reader_options_honour_follow_and_privilege() {
        let mut config = Config::defaults();
        config.sources.follow = false;
        config.sources.privileged_fallback = false;
        let options = reader_options(&config, &SinceWindow::unbounded());
        assert_eq!(options.stream.mode, ReadMode::OneShot);
        assert!(options.stream.privileged.is_none());
        assert!(options.since.is_none());
    }
}
