//! pm2 discovery via `pm2 jlist`.

use std::process::Stdio;

use mergetail_core::{SourceId, SourceKind};
use serde::Deserialize;
use tokio::process::Command;

use super::{expand_tilde, Discover, DiscoveryError};
use crate::source::SourceSpec;

#[derive(Debug, Deserialize)]
struct Pm2Process {
    name: Option<String>,
    #[serde(default)]
    pm2_env: Pm2Env,
}

#[derive(Debug, Default, Deserialize)]
struct Pm2Env {
    pm_out_log_path: Option<String>,
    pm_err_log_path: Option<String>,
}

/// Tail the stdout/stderr logs of the named pm2 processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pm2Apps {
    pub apps: Vec<String>,
    pub program: String,
}

impl Pm2Apps {
    pub fn new(apps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            apps: apps.into_iter().map(Into::into).collect(),
            program: "pm2".to_string(),
        }
    }
}

impl Discover for Pm2Apps {
    async fn discover(&self) -> Result<Vec<SourceSpec>, DiscoveryError> {
        let output = Command::new(&self.program)
            .arg("jlist")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| DiscoveryError::Pm2Unavailable {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = match stderr.trim() {
                "" => output.status.to_string(),
                message => message.to_string(),
            };
            return Err(DiscoveryError::Pm2Failed {
                program: self.program.clone(),
                detail,
            });
        }

        parse_jlist(&String::from_utf8_lossy(&output.stdout), &self.apps)
    }
}

/// Turn `pm2 jlist` output into `<name>/out` and `<name>/err` sources for
/// the processes named in `apps`, in jlist order. Empty output counts as an
/// empty process list.
pub fn parse_jlist(json: &str, apps: &[String]) -> Result<Vec<SourceSpec>, DiscoveryError> {
    let json = json.trim();
    let processes: Vec<Pm2Process> = if json.is_empty() {
        Vec::new()
    } else {
        serde_json::from_str(json)?
    };

    let mut specs = Vec::new();
    for proc in processes {
        let Some(name) = proc.name.filter(|n| apps.contains(n)) else {
            continue;
        };
        let channels = [
            ("out", proc.pm2_env.pm_out_log_path),
            ("err", proc.pm2_env.pm_err_log_path),
        ];
        for (channel, path) in channels {
            let Some(path) = path.filter(|p| !p.is_empty()) else {
                continue;
            };
            specs.push(SourceSpec::new(
                SourceId::new(&name, channel),
                SourceKind::Generic,
                expand_tilde(&path),
            ));
        }
    }
    Ok(specs)
}
