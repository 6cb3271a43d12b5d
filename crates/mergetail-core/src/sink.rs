//! Output seam between the merge engine and whatever renders entries.

use std::io;

use crate::types::Entry;

/// Destination for globally ordered entries.
pub trait Sink: Send {
    /// Render and write one entry.
    fn emit(&mut self, entry: &Entry) -> Result<(), SinkError>;

    /// Push anything buffered to the destination. Called after each flush pass
    /// that emitted at least one entry.
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn emit(&mut self, entry: &Entry) -> Result<(), SinkError> {
        (**self).emit(entry)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        (**self).flush()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The consumer went away (e.g. stdout piped into `head`). Not a failure:
    /// the engine stops emitting and unwinds.
    #[error("downstream consumer closed")]
    Closed,
    #[error("failed to write output: {0}")]
    Io(#[source] io::Error),
}

impl SinkError {
    pub fn is_closed(&self) -> bool {
        matches!(self, SinkError::Closed)
    }
}

impl From<io::Error> for SinkError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::BrokenPipe => SinkError::Closed,
            _ => SinkError::Io(err),
        }
    }
}
