//! Explicitly listed files (config `[[sources.files]]` and `--file`).

use std::path::{Path, PathBuf};

use mergetail_core::{SourceId, SourceKind};

use super::{Discover, DiscoveryError};
use crate::source::SourceSpec;

/// Files are not checked here: a missing one surfaces later as a diagnostic
/// line in the feed, like any other unavailable source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticFiles {
    entries: Vec<(String, PathBuf, SourceKind)>,
}

impl StaticFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, path: impl AsRef<Path>, kind: SourceKind) -> Self {
        self.push(name, path, kind);
        self
    }

    pub fn push(&mut self, name: &str, path: impl AsRef<Path>, kind: SourceKind) {
        self.entries
            .push((name.to_string(), path.as_ref().to_path_buf(), kind));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Discover for StaticFiles {
    async fn discover(&self) -> Result<Vec<SourceSpec>, DiscoveryError> {
        Ok(self
            .entries
            .iter()
            .map(|(name, path, kind)| {
                let channel = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "file".to_string());
                SourceSpec::new(SourceId::new(name, &channel), *kind, path.clone())
            })
            .collect())
    }
}
