//! [`Sink`] that writes rendered lines to a byte stream (stdout in
//! production).

use std::io::{BufWriter, Write};

use mergetail_core::{Entry, Sink, SinkError};

use crate::render::Renderer;

/// Lines are buffered and pushed out on every [`Sink::flush`], which the
/// merge engine calls after each batch of emitted entries.
pub struct TerminalSink<W: Write> {
    out: BufWriter<W>,
    renderer: Renderer,
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W, renderer: Renderer) -> Self {
        Self {
            out: BufWriter::new(out),
            renderer,
        }
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Write a non-entry line (header, hint) and flush it immediately.
    pub fn notice(&mut self, line: &str) -> Result<(), SinkError> {
        writeln!(self.out, "{line}")?;
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W, SinkError> {
        self.out.into_inner().map_err(|err| SinkError::from(err.into_error()))
    }
}

impl<W: Write + Send> Sink for TerminalSink<W> {
    fn emit(&mut self, entry: &Entry) -> Result<(), SinkError> {
        let line = self.renderer.render(entry);
        writeln!(self.out, "{line}")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.out.flush()?;
        Ok(())
    }
}
