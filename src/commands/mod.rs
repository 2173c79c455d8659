//! Command implementations for the CLI
//!
//! - start: Start the aggregation server
//! - migrate: Create the log table
//! - config: Configuration display and validation
//! - logs: Query stored logs
//! - send: Submit a log entry through the client
//! - health: Check a running server

pub mod config;
pub mod health;
pub mod logs;
pub mod migrate;
pub mod send;
pub mod start;
