//! Shared fakes for integration tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use threadkeep::agent::ConversationState;
use threadkeep::checkpoint::{Checkpoint, CheckpointMeta, Checkpointer, MemoryCheckpointer};
use threadkeep::core::{AgentConfig, Message, Result, ThreadkeepError, ToolCall, ToolDefinition};
use threadkeep::llm::{GenerateOptions, LLMProvider, LLMResponse};
use threadkeep::tools::ToolRegistry;
use threadkeep::AgentController;

/// One scripted model reply
pub enum Step {
    Respond(LLMResponse),
    Fail(String),
}

/// Model fake that replays a fixed script and records what it was sent
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    /// Returned once the script is exhausted
    fallback: Option<LLMResponse>,
    delay: Option<Duration>,
    seen: Mutex<Vec<Vec<Message>>>,
    options: Mutex<Vec<GenerateOptions>>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            fallback: None,
            delay: None,
            seen: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(responses: Vec<LLMResponse>) -> Self {
        Self::new(responses.into_iter().map(Step::Respond).collect())
    }

    /// A model that requests the same tool call forever
    pub fn looping(call: ToolCall) -> Self {
        let mut provider = Self::new(Vec::new());
        provider.fallback = Some(LLMResponse::with_tool_calls(vec![call]));
        provider
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Message histories the model was called with, in call order
    pub fn seen(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }

    pub fn options(&self) -> Vec<GenerateOptions> {
        self.options.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
        options: &GenerateOptions,
    ) -> Result<LLMResponse> {
        self.seen.lock().unwrap().push(messages.to_vec());
        self.options.lock().unwrap().push(options.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Fail(message)) => Err(ThreadkeepError::model(message)),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| ThreadkeepError::model("script exhausted")),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// In-memory store whose n-th `save` (1-based) fails once
pub struct FailingCheckpointer {
    inner: MemoryCheckpointer,
    saves: AtomicUsize,
    fail_on: usize,
}

impl FailingCheckpointer {
    pub fn failing_on(fail_on: usize) -> Self {
        Self {
            inner: MemoryCheckpointer::new(),
            saves: AtomicUsize::new(0),
            fail_on,
        }
    }
}

#[async_trait]
impl Checkpointer for FailingCheckpointer {
    async fn save(&self, state: &ConversationState) -> Result<CheckpointMeta> {
        let n = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on {
            return Err(ThreadkeepError::storage("disk full"));
        }
        self.inner.save(state).await
    }

    async fn load_latest(&self, thread_id: &str) -> Result<ConversationState> {
        self.inner.load_latest(thread_id).await
    }

    async fn load_version(&self, thread_id: &str, version: u64) -> Result<Option<Checkpoint>> {
        self.inner.load_version(thread_id, version).await
    }

    async fn checkpoints(&self, thread_id: &str) -> Result<Vec<CheckpointMeta>> {
        self.inner.checkpoints(thread_id).await
    }

    async fn list_thread_ids(&self) -> Result<Vec<String>> {
        self.inner.list_thread_ids().await
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.inner.delete_thread(thread_id).await
    }

    fn name(&self) -> &str {
        "failing"
    }
}

pub fn calculator_call(id: &str, first: f64, second: f64, operation: &str) -> ToolCall {
    ToolCall::new(
        id,
        "calculator",
        json!({ "first_num": first, "second_num": second, "operation": operation }),
    )
}

pub fn agent_config(max_steps: usize) -> AgentConfig {
    AgentConfig {
        max_steps,
        parallel_tools: true,
        system_prompt: None,
        debug: false,
    }
}

/// Registry with only the network-free calculator
pub fn calculator_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(threadkeep::tools::CalculatorTool::new());
    registry
}

pub fn controller(
    provider: Arc<ScriptedProvider>,
    checkpointer: Arc<dyn Checkpointer>,
    max_steps: usize,
) -> AgentController {
    AgentController::new(
        provider,
        Arc::new(calculator_registry()),
        checkpointer,
        agent_config(max_steps),
    )
}
