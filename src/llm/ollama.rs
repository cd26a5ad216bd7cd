//! Local Ollama provider
//!
//! Talks to `/api/chat` in non-streaming mode so tool calls arrive in one
//! piece. Runs locally, so no credential is required.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Config, Message, Result, ThreadkeepError, ToolCall, ToolDefinition};
use crate::llm::traits::{GenerateOptions, LLMProvider, LLMResponse, TokenUsage};

const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDefinition],
    options: WireOptions,
    stream: bool,
}

fn no_tools(tools: &&[ToolDefinition]) -> bool {
    tools.is_empty()
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_name: Option<&'a str>,
}

impl<'a> WireMessage<'a> {
    fn system(prompt: &'a str) -> Self {
        Self {
            role: "system",
            content: prompt,
            tool_calls: Vec::new(),
            tool_name: None,
        }
    }
}

impl<'a> From<&'a Message> for WireMessage<'a> {
    fn from(message: &'a Message) -> Self {
        Self {
            role: message.role().as_str(),
            content: message.content(),
            tool_calls: message
                .tool_calls()
                .iter()
                .map(|call| WireCall {
                    function: WireFunction {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect(),
            tool_name: message.name(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireCall {
    function: WireFunction,
}

#[derive(Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Serialize)]
struct WireOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct WireReply {
    model: String,
    message: WireReplyMessage,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct WireReplyMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<WireCall>,
}

impl From<WireReply> for LLMResponse {
    fn from(reply: WireReply) -> Self {
        let usage = reply
            .prompt_eval_count
            .zip(reply.eval_count)
            .map(|(prompt, completion)| TokenUsage::new(prompt, completion));

        LLMResponse {
            content: reply.message.content,
            tool_calls: reply
                .message
                .tool_calls
                .into_iter()
                .map(|call| {
                    ToolCall::with_generated_id(call.function.name, call.function.arguments)
                })
                .collect(),
            usage,
            model: reply.model,
        }
    }
}

impl OllamaClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::build(
            config.ollama_url(),
            config.ollama.model.clone(),
            config.ollama.timeout_secs,
        )
    }

    /// Point at an explicit server, e.g. a mock in tests
    pub fn with_base_url(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::build(base_url.into(), model.into(), DEFAULT_TIMEOUT_SECS)
    }

    fn build(base_url: String, model: String, timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    fn request<'a>(
        &'a self,
        messages: &'a [Message],
        tools: &'a [ToolDefinition],
        options: &'a GenerateOptions,
    ) -> WireRequest<'a> {
        let system = options.system_prompt.as_deref().map(WireMessage::system);
        WireRequest {
            model: &self.model,
            messages: system
                .into_iter()
                .chain(messages.iter().map(WireMessage::from))
                .collect(),
            tools,
            options: WireOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
            },
            stream: false,
        }
    }

    fn send_error(&self, err: reqwest::Error) -> ThreadkeepError {
        if err.is_connect() {
            ThreadkeepError::model(format!(
                "Cannot connect to Ollama at {}. Is it running?",
                self.base_url
            ))
        } else {
            err.into()
        }
    }

    fn status_error(&self, status: StatusCode, body: String) -> ThreadkeepError {
        if status == StatusCode::NOT_FOUND && body.contains("not found") {
            ThreadkeepError::ModelNotFound(self.model.clone())
        } else {
            ThreadkeepError::model(format!("Ollama returned {}: {}", status, body))
        }
    }
}

#[async_trait]
impl LLMProvider for OllamaClient {
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &GenerateOptions,
    ) -> Result<LLMResponse> {
        let body = self.request(messages, tools, options);
        tracing::debug!(
            model = %self.model,
            messages = messages.len(),
            tools = tools.len(),
            "ollama chat"
        );

        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(self.status_error(status, text));
        }
        tracing::trace!(body = %text, "ollama reply");

        let reply: WireReply = serde_json::from_str(&text)
            .map_err(|e| ThreadkeepError::model(format!("Unreadable Ollama reply: {}", e)))?;
        Ok(reply.into())
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
