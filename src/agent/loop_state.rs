//! Agent loop state management
//!
//! The AGENT → TOOLS → AGENT … → DONE state machine driven by
//! [`AgentController`](super::AgentController), plus the step budget that
//! keeps a model/tool ping-pong from running forever.

use serde::{Deserialize, Serialize};

use crate::core::Message;

/// Where the loop is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentPhase {
    /// About to call the model
    Agent,
    /// About to execute the pending tool calls
    Tools,
    /// Terminal
    Done,
}

/// Why a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum StopReason {
    /// The model answered without requesting tools
    Completed,
    /// The step budget ran out before the model finished
    StepLimit { max_steps: usize },
}

/// State of the agent loop for one turn
#[derive(Debug, Clone)]
pub struct LoopState {
    phase: AgentPhase,
    /// Model and tool steps executed so far
    steps: usize,
    max_steps: usize,
}

impl LoopState {
    /// Create a new loop state with the given step budget
    pub fn new(max_steps: usize) -> Self {
        Self {
            phase: AgentPhase::Agent,
            steps: 0,
            max_steps,
        }
    }

    pub fn phase(&self) -> AgentPhase {
        self.phase
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Check if the loop should run another step
    pub fn should_continue(&self) -> bool {
        self.phase != AgentPhase::Done && self.steps < self.max_steps
    }

    /// Apply the transition out of AGENT for the model's response
    pub fn after_model(&mut self, response: &Message) {
        debug_assert_eq!(self.phase, AgentPhase::Agent);
        self.steps += 1;
        self.phase = if response.has_tool_calls() {
            AgentPhase::Tools
        } else {
            AgentPhase::Done
        };
    }

    /// Apply the unconditional TOOLS → AGENT transition
    pub fn after_tools(&mut self) {
        debug_assert_eq!(self.phase, AgentPhase::Tools);
        self.steps += 1;
        self.phase = AgentPhase::Agent;
    }

    /// Why the loop stopped; only meaningful once `should_continue` is false
    pub fn stop_reason(&self) -> StopReason {
        if self.phase == AgentPhase::Done {
            StopReason::Completed
        } else {
            StopReason::StepLimit {
                max_steps: self.max_steps,
            }
        }
    }
}
