//! Threadkeep - resumable tool-using chat agent
//!
//! Routes user messages through a language model, runs the tools the model
//! asks for, and checkpoints every step per thread so conversations can be
//! resumed and enumerated later.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Provider abstraction with Gemini and Ollama implementations
//! - **Tools**: Tool registry with calculator, web search and stock price tools
//! - **Checkpoint**: Thread-keyed snapshot storage (SQLite and in-memory)
//! - **Agent**: The model/tool loop and per-thread serialization
//! - **CLI**: Command-line interface and REPL
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use threadkeep::{
//!     create_provider, AgentController, Config, Message, SqliteCheckpointer, ToolRegistry,
//! };
//!
//! #[tokio::main]
//! async fn main() -> threadkeep::Result<()> {
//!     let config = Config::load();
//!     config.validate()?;
//!
//!     let controller = AgentController::new(
//!         create_provider(&config)?,
//!         Arc::new(ToolRegistry::with_builtin_tools(&config.tools)?),
//!         Arc::new(SqliteCheckpointer::open(&config.storage.database_path)?),
//!         config.agent.clone(),
//!     );
//!
//!     let outcome = controller.run_turn("demo", Message::user("What is 10 times 5?")).await?;
//!     println!("{:?}", outcome.final_text());
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod checkpoint;
pub mod cli;
pub mod core;
pub mod llm;
pub mod tools;

// Re-export commonly used items
pub use agent::{AgentController, ConversationState, StopReason, TurnOutcome};
pub use checkpoint::{
    Checkpoint, CheckpointMeta, Checkpointer, MemoryCheckpointer, SqliteCheckpointer,
};
pub use cli::Repl;
pub use core::{
    Config, Message, ProviderType, Result, Role, ThreadkeepError, ToolCall, ToolCallResult,
    ToolDefinition,
};
pub use llm::{create_provider, LLMProvider, LLMResponse};
pub use tools::ToolRegistry;
