//! Optional web-server logs.

use std::path::PathBuf;

use mergetail_core::{SourceId, SourceKind};

use super::{Discover, DiscoveryError};
use crate::source::SourceSpec;

/// Candidate file names looked up in a log directory; each one that exists
/// becomes `nginx/<file name>` with the web-access format hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NginxLogs {
    pub dir: PathBuf,
    pub candidates: Vec<String>,
}

impl NginxLogs {
    pub fn new(
        dir: impl Into<PathBuf>,
        candidates: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            dir: dir.into(),
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }
}

impl Discover for NginxLogs {
    async fn discover(&self) -> Result<Vec<SourceSpec>, DiscoveryError> {
        if !tokio::fs::metadata(&self.dir).await.is_ok_and(|m| m.is_dir()) {
            return Ok(Vec::new());
        }

        let mut specs = Vec::new();
        for name in &self.candidates {
            let path = self.dir.join(name);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                specs.push(SourceSpec::new(
                    SourceId::new("nginx", name),
                    SourceKind::WebAccess,
                    path,
                ));
            }
        }
        Ok(specs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn only_existing_candidates_are_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("site-access.log"), "").unwrap();
        std::fs::write(dir.path().join("unrelated.log"), "").unwrap();

        let nginx = NginxLogs::new(dir.path(), ["site-access.log", "site-error.log"]);
        let specs = nginx.discover().await.unwrap();

        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].id.as_str(), "nginx/site-access.log");
        assert_eq!(specs[0].kind, SourceKind::WebAccess);
        assert_eq!(specs[0].path, dir.path().join("site-access.log"));
    }

    #[tokio::test]
    async fn missing_directory_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let nginx = NginxLogs::new(dir.path().join("absent"), ["access.log"]);
        assert!(nginx.discover().await.unwrap().is_empty());
    }
}
