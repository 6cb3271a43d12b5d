//! Native file tail.
//!
//! Reads a file from the start and, in follow mode, keeps reading as it grows.
//! At end of file the tail sleeps until either a filesystem notification for
//! the file arrives (inotify via `notify`, watching the parent directory) or
//! the poll interval passes, then checks the path:
//!
//! - **Rotation**: the path now names a different file (device/inode changed).
//!   The old handle is drained to EOF first, then the new file is read from
//!   offset 0.
//! - **Truncation**: the file is shorter than the read offset. Reading
//!   restarts at offset 0.
//! - **Removal**: the path is gone. The tail keeps the old handle and waits
//!   for the path to reappear.
//!
//! A trailing line without `\n` is held back until its newline arrives in
//! follow mode, and returned as-is at EOF in one-shot mode.

use std::fmt;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use crate::stream::{decode_line, ReadMode, StreamError};

/// `(device, inode)` on Unix. Elsewhere rotation is not detectable and only
/// truncation is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileIdentity {
    dev: u64,
    ino: u64,
}

#[cfg(unix)]
fn identity(meta: &std::fs::Metadata) -> Option<FileIdentity> {
    use std::os::unix::fs::MetadataExt;
    Some(FileIdentity {
        dev: meta.dev(),
        ino: meta.ino(),
    })
}

#[cfg(not(unix))]
fn identity(_meta: &std::fs::Metadata) -> Option<FileIdentity> {
    None
}

enum PathState {
    Unchanged,
    Truncated,
    Rotated,
}

pub struct FileTail {
    path: PathBuf,
    reader: BufReader<File>,
    offset: u64,
    identity: Option<FileIdentity>,
    mode: ReadMode,
    poll: Duration,
    partial: Vec<u8>,
    /// Set once a rotation is seen; the old handle is drained before reopening.
    rotated: bool,
    wake: Option<mpsc::Receiver<()>>,
    _watcher: Option<RecommendedWatcher>,
}

impl fmt::Debug for FileTail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileTail")
            .field("path", &self.path)
            .field("offset", &self.offset)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl FileTail {
    #[cfg(test)]
    pub(crate) async fn open(
        path: &Path,
        mode: ReadMode,
        poll: Duration,
    ) -> Result<Self, StreamError> {
        let file = File::open(path)
            .await
            .map_err(|err| StreamError::read(path, err))?;
        Ok(Self::from_file(path, file, mode, poll).await)
    }

    pub(crate) async fn from_file(path: &Path, file: File, mode: ReadMode, poll: Duration) -> Self {
        let identity = file.metadata().await.ok().and_then(|m| identity(&m));
        let (wake, watcher) = if mode.is_follow() {
            match watch(path) {
                Ok((rx, watcher)) => (Some(rx), Some(watcher)),
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "file watch unavailable, polling");
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

        Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            offset: 0,
            identity,
            mode,
            poll,
            partial: Vec::new(),
            rotated: false,
            wake,
            _watcher: watcher,
        }
    }

    pub async fn next_line(&mut self) -> Result<Option<String>, StreamError> {
        loop {
            let n = self
                .reader
                .read_until(b'\n', &mut self.partial)
                .await
                .map_err(|err| StreamError::read(&self.path, err))?;
            self.offset += n as u64;

            if self.partial.ends_with(b"\n") {
                return Ok(Some(self.take_line()));
            }

            // At end of file, possibly holding an unterminated line.
            if !self.mode.is_follow() {
                if self.partial.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.take_line()));
            }

            if self.rotated {
                self.rotated = false;
                let leftover = (!self.partial.is_empty()).then(|| self.take_line());
                self.reopen().await;
                if leftover.is_some() {
                    return Ok(leftover);
                }
                continue;
            }

            match self.check_path().await {
                PathState::Unchanged => self.wait().await,
                PathState::Truncated => {
                    debug!(path = %self.path.display(), "file truncated, reading from start");
                    self.reader
                        .seek(SeekFrom::Start(0))
                        .await
                        .map_err(|err| StreamError::read(&self.path, err))?;
                    self.offset = 0;
                    self.partial.clear();
                }
                PathState::Rotated => {
                    debug!(path = %self.path.display(), "file rotated, draining old handle");
                    self.rotated = true;
                }
            }
        }
    }

    fn take_line(&mut self) -> String {
        let line = decode_line(&self.partial);
        self.partial.clear();
        line
    }

    async fn check_path(&self) -> PathState {
        let meta = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta,
            Err(_) => return PathState::Unchanged,
        };
        let current = identity(&meta);
        if current.is_some() && current != self.identity {
            PathState::Rotated
        } else if meta.len() < self.offset {
            PathState::Truncated
        } else {
            PathState::Unchanged
        }
    }

    async fn reopen(&mut self) {
        match File::open(&self.path).await {
            Ok(file) => {
                self.identity = file.metadata().await.ok().and_then(|m| identity(&m));
                self.reader = BufReader::new(file);
                self.offset = 0;
            }
            // Gone again between the check and the open; the next check retries.
            Err(err) => debug!(path = %self.path.display(), error = %err, "reopen failed"),
        }
    }

    async fn wait(&mut self) {
        match &mut self.wake {
            Some(rx) => {
                let _ = tokio::time::timeout(self.poll, rx.recv()).await;
                while rx.try_recv().is_ok() {}
            }
            None => tokio::time::sleep(self.poll).await,
        }
    }
}

/// Watch the parent directory (so rotations and re-creations are seen) and
/// signal on any event that touches the tailed file name.
fn watch(path: &Path) -> notify::Result<(mpsc::Receiver<()>, RecommendedWatcher)> {
    let (tx, rx) = mpsc::channel(1);
    let name = path.file_name().map(|n| n.to_os_string());
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let Ok(event) = res else { return };
        let relevant = event
            .paths
            .iter()
            .any(|p| p.file_name().map(|n| n.to_os_string()) == name);
        if relevant {
            let _ = tx.try_send(());
        }
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    Ok((rx, watcher))
}
