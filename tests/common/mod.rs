//! Shared test utilities for mergetail integration harnesses.
//!
//! Import everything via `mod common; use common::*;` at the top of each
//! harness file.

pub mod builders;
pub mod fixtures;
pub mod recorder;

pub use builders::*;
pub use fixtures::*;
pub use recorder::*;
