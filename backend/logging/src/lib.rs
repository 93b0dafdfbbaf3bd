//! Structured logging for chatmark.
//!
//! Console plus rotating JSON file output, and redaction of per-user file
//! paths before they reach a log line.

pub mod logger;
pub mod redact;

pub use logger::init_logger;
pub use redact::redact_user_paths;
