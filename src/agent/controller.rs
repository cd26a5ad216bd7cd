//! Agent controller
//!
//! Drives the model/tool alternation for one thread and checkpoints every
//! transition before moving on. A failed checkpoint write or model call aborts
//! the turn; the last successful checkpoint stays the resumable state.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;

use crate::agent::conversation::ConversationState;
use crate::agent::locks::ThreadLocks;
use crate::agent::loop_state::{AgentPhase, LoopState, StopReason};
use crate::checkpoint::{validate_thread_id, CheckpointMeta, Checkpointer};
use crate::core::{AgentConfig, Message, Result, Role, ThreadkeepError, ToolCall};
use crate::llm::{GenerateOptions, LLMProvider};
use crate::tools::ToolRegistry;

/// What one call to [`AgentController::run_turn`] produced
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub thread_id: String,
    /// Messages appended after the user message, in order
    pub messages: Vec<Message>,
    pub stop_reason: StopReason,
    /// Version of the last checkpoint written by the turn
    pub checkpoint_version: u64,
}

impl TurnOutcome {
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Text of the final assistant message, if the turn produced one
    pub fn final_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role() == Role::Assistant && !m.has_tool_calls())
            .map(|m| m.content())
    }
}

/// Runs turns against injected model, tools and storage
pub struct AgentController {
    llm: Arc<dyn LLMProvider>,
    tools: Arc<ToolRegistry>,
    checkpointer: Arc<dyn Checkpointer>,
    config: AgentConfig,
    locks: ThreadLocks,
}

impl AgentController {
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        tools: Arc<ToolRegistry>,
        checkpointer: Arc<dyn Checkpointer>,
        config: AgentConfig,
    ) -> Self {
        Self {
            llm,
            tools,
            checkpointer,
            config,
            locks: ThreadLocks::new(),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn provider(&self) -> &dyn LLMProvider {
        self.llm.as_ref()
    }

    pub fn checkpointer(&self) -> &dyn Checkpointer {
        self.checkpointer.as_ref()
    }

    /// Process one user message on a thread.
    ///
    /// Turns on the same thread run one after another; turns on different
    /// threads run concurrently.
    pub async fn run_turn(&self, thread_id: &str, user_message: Message) -> Result<TurnOutcome> {
        validate_thread_id(thread_id)?;
        if user_message.role() != Role::User {
            return Err(ThreadkeepError::invalid_input(format!(
                "run_turn expects a user message, got {}",
                user_message.role()
            )));
        }

        let _guard = self.locks.acquire(thread_id).await;

        let mut state = self.checkpointer.load_latest(thread_id).await?;
        tracing::info!(
            thread = %thread_id,
            history = state.len(),
            provider = self.llm.name(),
            active_threads = self.locks.active(),
            "turn started"
        );

        if !state.pending_tool_calls().is_empty() {
            // A previous turn stopped between the model step and its tool batch.
            let calls = state.pending_tool_calls().to_vec();
            tracing::warn!(
                thread = %thread_id,
                calls = calls.len(),
                "completing interrupted tool batch"
            );
            let results = self.execute_batch(&calls).await;
            state.extend(results);
            self.persist(&state).await?;
        }

        state.push(user_message);
        let mut last = self.persist(&state).await?;
        let turn_start = state.len();

        let definitions = self.tools.definitions();
        let options = GenerateOptions {
            system_prompt: self.config.system_prompt.clone(),
            ..Default::default()
        };

        let mut loop_state = LoopState::new(self.config.max_steps);
        while loop_state.should_continue() {
            match loop_state.phase() {
                AgentPhase::Agent => {
                    let response = self
                        .llm
                        .chat(state.messages(), &definitions, &options)
                        .await?;
                    let message = response.into_message();
                    tracing::debug!(
                        thread = %thread_id,
                        step = loop_state.steps() + 1,
                        budget = loop_state.max_steps(),
                        tool_calls = message.tool_calls().len(),
                        "model step"
                    );
                    loop_state.after_model(&message);
                    state.push(message);
                }
                AgentPhase::Tools => {
                    let calls = state.pending_tool_calls().to_vec();
                    tracing::debug!(
                        thread = %thread_id,
                        step = loop_state.steps() + 1,
                        budget = loop_state.max_steps(),
                        calls = calls.len(),
                        "tool step"
                    );
                    let results = self.execute_batch(&calls).await;
                    loop_state.after_tools();
                    state.extend(results);
                }
                AgentPhase::Done => break,
            }
            last = self.persist(&state).await?;
        }

        let stop_reason = loop_state.stop_reason();
        if let StopReason::StepLimit { max_steps } = stop_reason {
            tracing::warn!(
                thread = %thread_id,
                max_steps,
                "turn stopped at step limit before the model finished"
            );
        }

        let messages = state.since(turn_start).to_vec();
        tracing::info!(
            thread = %thread_id,
            steps = loop_state.steps(),
            new_messages = messages.len(),
            version = last.version,
            "turn finished"
        );

        Ok(TurnOutcome {
            thread_id: thread_id.to_string(),
            messages,
            stop_reason,
            checkpoint_version: last.version,
        })
    }

    /// Run one tool batch; result messages come back in request order
    async fn execute_batch(&self, calls: &[ToolCall]) -> Vec<Message> {
        if self.config.parallel_tools && calls.len() > 1 {
            join_all(calls.iter().map(|call| self.execute_call(call))).await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.execute_call(call).await);
            }
            results
        }
    }

    async fn execute_call(&self, call: &ToolCall) -> Message {
        let result = self.tools.invoke(&call.name, call.arguments.clone()).await;
        tracing::debug!(tool = %call.name, id = %call.id, error = result.is_error(), "tool call");
        Message::tool_result(call, &result)
    }

    async fn persist(&self, state: &ConversationState) -> Result<CheckpointMeta> {
        self.checkpointer.save(state).await.map_err(|e| {
            tracing::error!(thread = %state.thread_id(), error = %e, "checkpoint write failed");
            e
        })
    }

    /// Every thread with at least one checkpoint
    pub async fn list_thread_ids(&self) -> Result<Vec<String>> {
        self.checkpointer.list_thread_ids().await
    }

    /// Latest persisted history of a thread
    pub async fn history(&self, thread_id: &str) -> Result<ConversationState> {
        validate_thread_id(thread_id)?;
        self.checkpointer.load_latest(thread_id).await
    }

    pub async fn checkpoints(&self, thread_id: &str) -> Result<Vec<CheckpointMeta>> {
        validate_thread_id(thread_id)?;
        self.checkpointer.checkpoints(thread_id).await
    }
}
