//! mergetail-feeds: log sources for mergetail.
//!
//! Discovery decides what to tail, [`stream`] opens each file (natively or via
//! a privileged `tail`), and [`reader::SourceReader`] stamps every line and
//! pushes it onto the shared queue consumed by the merge engine.

pub mod command;
pub mod discovery;
pub mod reader;
pub mod source;
pub mod stream;
pub mod tail;

pub use command::TailCommand;
pub use discovery::{
    Discover, Discovered, DiscoveryError, DiscoveryPlan, NginxLogs, Pm2Apps, StaticFiles,
};
pub use reader::{ReaderOptions, ReaderStats, SourceReader};
pub use source::{Source, SourceSpec, DIAGNOSTIC_PREFIX};
pub use stream::{open_stream, LineStream, ReadMode, StreamError, StreamOptions};
