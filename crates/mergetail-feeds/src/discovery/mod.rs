//! Startup discovery: which files to tail.
//!
//! Each backend implements [`Discover`]. [`DiscoveryPlan`] runs the enabled
//! backends in a fixed order (pm2, static files, nginx), drops any path that
//! an earlier source already claimed, and fails when nothing is left.

mod files;
mod nginx;
mod pm2;

use std::collections::HashSet;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::source::SourceSpec;

pub use files::StaticFiles;
pub use nginx::NginxLogs;
pub use pm2::{parse_jlist, Pm2Apps};

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("unable to run {program} jlist: {source}")]
    Pm2Unavailable {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} jlist failed: {detail}")]
    Pm2Failed { program: String, detail: String },
    #[error("failed to parse pm2 jlist output: {0}")]
    Pm2Parse(#[from] serde_json::Error),
    #[error("no log sources found")]
    NoSources,
}

/// A backend that can list sources. May legitimately return none.
pub trait Discover {
    fn discover(&self) -> impl Future<Output = Result<Vec<SourceSpec>, DiscoveryError>> + Send;
}

/// Result of a full discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovered {
    pub sources: Vec<SourceSpec>,
    /// Whether the optional web-server backend was enabled and found nothing.
    pub optional_missing: bool,
}

/// The set of enabled backends. `None` disables one.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryPlan {
    pub pm2: Option<Pm2Apps>,
    pub files: StaticFiles,
    pub nginx: Option<NginxLogs>,
}

impl DiscoveryPlan {
    pub async fn run(&self) -> Result<Discovered, DiscoveryError> {
        let mut found = Vec::new();

        if let Some(pm2) = &self.pm2 {
            found.extend(pm2.discover().await?);
        }
        found.extend(self.files.discover().await?);

        let mut optional_missing = false;
        if let Some(nginx) = &self.nginx {
            let logs = nginx.discover().await?;
            optional_missing = logs.is_empty();
            found.extend(logs);
        }

        let sources = dedupe_paths(found);
        if sources.is_empty() {
            return Err(DiscoveryError::NoSources);
        }
        debug!(count = sources.len(), "discovery complete");
        Ok(Discovered {
            sources,
            optional_missing,
        })
    }
}

/// Keep the first source for each path.
fn dedupe_paths(specs: Vec<SourceSpec>) -> Vec<SourceSpec> {
    let mut seen = HashSet::new();
    specs
        .into_iter()
        .filter(|spec| {
            let fresh = seen.insert(spec.path.clone());
            if !fresh {
                debug!(source = %spec.id, path = %spec.path.display(), "duplicate path skipped");
            }
            fresh
        })
        .collect()
}

/// Expand a leading `~` to `$HOME`. Paths without one are returned unchanged.
pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    match (path.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => Path::new(path).to_path_buf(),
    }
}
