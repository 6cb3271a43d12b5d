//! Privileged tail through a helper process (`sudo -n tail -n +1 [-F] PATH`).
//!
//! Used only for files the current user cannot open. The helper owns rotation
//! handling (`-F`); this side only splits its stdout into lines and turns a
//! non-zero exit into a [`StreamError::Read`] carrying the helper's stderr.
//! Stderr is drained while the helper runs so `tail -F` notices can never fill
//! the pipe and stall it; only the last [`STDERR_KEEP`] bytes are kept.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;

use crate::stream::{decode_line, ReadMode, StreamError};

/// Bytes of helper stderr kept for the failure diagnostic.
pub const STDERR_KEEP: usize = 4096;

/// Program and leading arguments placed before `tail`'s own arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl TailCommand {
    /// `sudo -n tail`: never prompts for a password, fails instead.
    pub fn sudo() -> Self {
        Self {
            program: "sudo".to_string(),
            args: vec!["-n".to_string(), "tail".to_string()],
        }
    }

    /// Plain `tail`, without privilege escalation.
    #[cfg(test)]
    pub(crate) fn plain() -> Self {
        Self {
            program: "tail".to_string(),
            args: Vec::new(),
        }
    }

    pub fn spawn(&self, path: &Path, mode: ReadMode) -> Result<CommandTail, StreamError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).args(["-n", "+1"]);
        if mode.is_follow() {
            cmd.arg("-F");
        }
        cmd.arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| StreamError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            StreamError::read(path, "helper process has no stdout")
        })?;
        let stderr = child
            .stderr
            .take()
            .map(|pipe| tokio::spawn(drain_stderr(pipe)));

        Ok(CommandTail {
            path: path.to_path_buf(),
            child,
            stdout: BufReader::new(stdout),
            stderr,
            buf: Vec::new(),
        })
    }
}

#[derive(Debug)]
pub struct CommandTail {
    path: PathBuf,
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    buf: Vec<u8>,
}

impl CommandTail {
    pub async fn next_line(&mut self) -> Result<Option<String>, StreamError> {
        self.buf.clear();
        let n = self
            .stdout
            .read_until(b'\n', &mut self.buf)
            .await
            .map_err(|err| StreamError::read(&self.path, err))?;
        if n > 0 {
            return Ok(Some(decode_line(&self.buf)));
        }
        self.finish().await.map(|()| None)
    }

    /// Reap the helper after its stdout closed.
    async fn finish(&mut self) -> Result<(), StreamError> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|err| StreamError::read(&self.path, err))?;
        if status.success() {
            return Ok(());
        }

        let stderr = match self.stderr.take() {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };
        let detail = match stderr.trim() {
            "" => match status.code() {
                Some(code) => format!("tail exited with code {code}"),
                None => "tail was terminated by a signal".to_string(),
            },
            message => message.to_string(),
        };
        Err(StreamError::read(&self.path, detail))
    }
}

/// Read the helper's stderr to EOF, keeping only the tail end.
async fn drain_stderr(mut pipe: ChildStderr) -> String {
    let mut kept = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                kept.extend_from_slice(&chunk[..n]);
                if kept.len() > STDERR_KEEP {
                    kept.drain(..kept.len() - STDERR_KEEP);
                }
            }
        }
    }
    String::from_utf8_lossy(&kept).into_owned()
}
