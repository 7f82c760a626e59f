//! Structured logging to stderr and NDJSON verdict output.

mod format;

pub use format::StructuredLogger;
