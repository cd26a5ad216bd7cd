//! CLI module - command-line interface
//!
//! Contains the REPL and command parsing.

pub mod commands;
pub mod repl;

pub use commands::{format_messages, format_outcome, format_thread_list, Session};
pub use repl::Repl;
