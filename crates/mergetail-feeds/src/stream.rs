//! Line streams over a log file.
//!
//! [`open_stream`] classifies the path first (missing, directory, not a
//! regular file), then opens it natively with [`FileTail`]. Files that exist
//! but are unreadable by the current user are handed to [`CommandTail`]
//! (`sudo -n tail`) when a privileged command is configured.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::command::{CommandTail, TailCommand};
use crate::tail::FileTail;

/// Run-wide read mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Keep waiting for appended lines; survive rotation and truncation.
    Follow,
    /// Read what exists now, then stop.
    OneShot,
}

impl ReadMode {
    pub fn from_follow(follow: bool) -> Self {
        if follow {
            ReadMode::Follow
        } else {
            ReadMode::OneShot
        }
    }

    pub fn is_follow(self) -> bool {
        matches!(self, ReadMode::Follow)
    }
}

#[derive(Debug, Clone)]
pub struct StreamOptions {
    pub mode: ReadMode,
    /// Fallback wake-up interval while waiting at end of file.
    pub poll: Duration,
    /// Command used for files the current user cannot open. `None` turns
    /// permission errors into a source failure.
    pub privileged: Option<TailCommand>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            mode: ReadMode::Follow,
            poll: Duration::from_millis(250),
            privileged: Some(TailCommand::sudo()),
        }
    }
}

/// Everything that can end a source early. The display text is what the
/// operator sees inline in the merged feed.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("missing log file: {}", .0.display())]
    Missing(PathBuf),
    #[error("{} is a directory, skipping", .0.display())]
    Directory(PathBuf),
    #[error("{} is not a regular file, skipping", .0.display())]
    NotRegular(PathBuf),
    #[error("permission denied opening {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("{program} not available: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to read {}: {detail}", .path.display())]
    Read { path: PathBuf, detail: String },
}

impl StreamError {
    pub(crate) fn read(path: &Path, detail: impl ToString) -> Self {
        StreamError::Read {
            path: path.to_path_buf(),
            detail: detail.to_string(),
        }
    }
}

/// An open source of lines, native or through a helper process.
#[derive(Debug)]
pub enum LineStream {
    File(FileTail),
    Command(CommandTail),
}

impl LineStream {
    /// Next complete line without its terminator. `Ok(None)` is a clean end of
    /// stream; a follow-mode file stream never returns it.
    pub async fn next_line(&mut self) -> Result<Option<String>, StreamError> {
        match self {
            LineStream::File(tail) => tail.next_line().await,
            LineStream::Command(tail) => tail.next_line().await,
        }
    }
}

pub async fn open_stream(
    path: &Path,
    options: &StreamOptions,
) -> Result<LineStream, StreamError> {
    let meta = match tokio::fs::metadata(path).await {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(StreamError::Missing(path.to_path_buf()))
        }
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            return privileged(path, options);
        }
        Err(err) => return Err(StreamError::read(path, err)),
    };

    if meta.is_dir() {
        return Err(StreamError::Directory(path.to_path_buf()));
    }
    if !meta.is_file() {
        return Err(StreamError::NotRegular(path.to_path_buf()));
    }

    match tokio::fs::File::open(path).await {
        Ok(file) => Ok(LineStream::File(
            FileTail::from_file(path, file, options.mode, options.poll).await,
        )),
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => privileged(path, options),
        Err(err) => Err(StreamError::read(path, err)),
    }
}

fn privileged(path: &Path, options: &StreamOptions) -> Result<LineStream, StreamError> {
    match &options.privileged {
        Some(command) => {
            tracing::debug!(
                path = %path.display(),
                program = %command.program,
                "falling back to privileged tail"
            );
            command.spawn(path, options.mode).map(LineStream::Command)
        }
        None => Err(StreamError::PermissionDenied(path.to_path_buf())),
    }
}

/// Turn raw bytes up to and including `\n` into a line: strip `\n` and a
/// preceding `\r`, replace invalid UTF-8.
pub(crate) fn decode_line(mut raw: &[u8]) -> String {
    if let Some(rest) = raw.strip_suffix(b"\n") {
        raw = rest;
    }
    if let Some(rest) = raw.strip_suffix(b"\r") {
        raw = rest;
    }
    String::from_utf8_lossy(raw).into_owned()
}
