//! Structured logging for AgroLens binaries.
//!
//! Console output (plain or JSON), optional daily-rolling NDJSON files, and
//! scrubbing of credentials before they reach a log line.

pub mod logger;
pub mod redact;

pub use logger::{LogOptions, init_logger};
pub use redact::{redact_sensitive_data, token_hint};
