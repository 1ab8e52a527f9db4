//! Domain types and pure logic shared by the imagegen crates.
//!
//! Nothing in here performs I/O: job records and their lifecycle, the
//! mapping from UI-level options to workflow-engine parameters, and
//! history ordering.

pub mod error;
pub mod history;
pub mod job;
pub mod types;
pub mod workflow;
