pub mod log_entry;

pub use log_entry::{LogEntry, LogInput, NewLogEntry, DEFAULT_HOST, DEFAULT_LOG_LEVEL};
