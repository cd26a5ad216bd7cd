//! Agent module - turn control and conversation state
//!
//! Contains the controller that alternates model and tool steps and
//! checkpoints each one.

pub mod controller;
pub mod conversation;
pub mod locks;
pub mod loop_state;

pub use controller::{AgentController, TurnOutcome};
pub use conversation::ConversationState;
pub use locks::ThreadLocks;
pub use loop_state::{AgentPhase, LoopState, StopReason};
