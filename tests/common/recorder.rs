//! A [`Sink`] that records what it is given.

use std::sync::{Arc, Mutex};

use mergetail_core::{Entry, Sink, SinkError};

/// Clones share one record, so a test can keep a handle while the engine
/// owns the sink.
#[derive(Clone, Default)]
pub struct RecordingSink {
    entries: Arc<Mutex<Vec<Entry>>>,
    close_after: Option<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a closed downstream once `n` entries have been accepted.
    pub fn closing_after(n: usize) -> Self {
        Self {
            close_after: Some(n),
            ..Self::default()
        }
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.entries.lock().unwrap().clone()
    }

    /// `[label] text` per entry, in emission order.
    pub fn lines(&self) -> Vec<String> {
        self.entries()
            .iter()
            .map(|e| format!("[{}] {}", e.source, e.text))
            .collect()
    }
}

impl Sink for RecordingSink {
    fn emit(&mut self, entry: &Entry) -> Result<(), SinkError> {
        let mut entries = self.entries.lock().unwrap();
        if self.close_after.is_some_and(|n| entries.len() >= n) {
            return Err(SinkError::Closed);
        }
        entries.push(entry.clone());
        Ok(())
    }
}
