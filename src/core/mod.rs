//! Core module - shared infrastructure for Threadkeep
//!
//! This module contains foundational types, configuration, and error handling
//! used throughout the application.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AgentConfig, Config, ProviderType, ToolsConfig};
pub use error::{Result, ThreadkeepError};
pub use types::*;
