//! Command-line interface for the sales warehouse
//!
//! Each subcommand lives in [`commands`] as an `XxxArgs` struct and a
//! `handle_xxx` function; the binary in `main.rs` only parses arguments and
//! dispatches.

pub mod commands;
pub mod error;

pub use error::CliError;
