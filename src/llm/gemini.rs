//! Google Gemini provider
//!
//! Calls the `generateContent` REST endpoint with function declarations.
//! Gemini does not return call ids, so one is generated per function call.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::core::config::GOOGLE_API_KEY;
use crate::core::{Config, Message, Result, Role, ThreadkeepError, ToolCall, ToolDefinition};
use crate::llm::traits::{GenerateOptions, LLMProvider, LLMResponse, TokenUsage};

/// Gemini API client
#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
}

impl GeminiProvider {
    /// Create a provider from configuration; fails without GOOGLE_API_KEY
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .gemini
            .api_key
            .clone()
            .ok_or_else(|| ThreadkeepError::MissingCredential(GOOGLE_API_KEY.to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.gemini.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: config.gemini.model.clone(),
            base_url: config.gemini.base_url.trim_end_matches('/').to_string(),
            temperature: config.gemini.temperature,
        })
    }

    /// Build the `generateContent` request body
    fn build_request_body(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &GenerateOptions,
    ) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert("contents".into(), Value::Array(to_gemini_contents(messages)));

        if let Some(ref prompt) = options.system_prompt {
            obj.insert(
                "systemInstruction".into(),
                json!({ "parts": [{ "text": prompt }] }),
            );
        }

        let mut gen_config = serde_json::Map::new();
        gen_config.insert(
            "temperature".into(),
            json!(options.temperature.unwrap_or(self.temperature)),
        );
        if let Some(max) = options.max_tokens {
            gen_config.insert("maxOutputTokens".into(), json!(max));
        }
        obj.insert("generationConfig".into(), Value::Object(gen_config));

        if !tools.is_empty() {
            let declarations: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.function.name,
                        "description": t.function.description,
                        "parameters": t.function.parameters,
                    })
                })
                .collect();
            obj.insert(
                "tools".into(),
                json!([{ "functionDeclarations": declarations }]),
            );
        }

        Value::Object(obj)
    }
}

/// Map thread messages to Gemini `contents`.
///
/// Consecutive tool results are grouped into one content entry so each batch
/// of function responses answers the function calls of the preceding turn.
fn to_gemini_contents(messages: &[Message]) -> Vec<Value> {
    let mut contents: Vec<Value> = Vec::new();
    let mut pending_responses: Vec<Value> = Vec::new();

    for msg in messages {
        if msg.role() != Role::Tool && !pending_responses.is_empty() {
            contents.push(json!({
                "role": "function",
                "parts": std::mem::take(&mut pending_responses),
            }));
        }

        match msg.role() {
            Role::User => contents.push(json!({
                "role": "user",
                "parts": [{ "text": msg.content() }],
            })),
            Role::Assistant => {
                let mut parts = Vec::new();
                if !msg.content().is_empty() {
                    parts.push(json!({ "text": msg.content() }));
                }
                for call in msg.tool_calls() {
                    parts.push(json!({
                        "functionCall": { "name": call.name, "args": call.arguments }
                    }));
                }
                if parts.is_empty() {
                    parts.push(json!({ "text": "" }));
                }
                contents.push(json!({ "role": "model", "parts": parts }));
            }
            Role::Tool => {
                let response = match msg.tool_payload() {
                    Some(Value::Object(map)) => Value::Object(map),
                    Some(other) => json!({ "result": other }),
                    None => json!({ "result": msg.content() }),
                };
                pending_responses.push(json!({
                    "functionResponse": {
                        "name": msg.name().unwrap_or_default(),
                        "response": response,
                    }
                }));
            }
        }
    }

    if !pending_responses.is_empty() {
        contents.push(json!({ "role": "function", "parts": pending_responses }));
    }

    contents
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &GenerateOptions,
    ) -> Result<LLMResponse> {
        let body = self.build_request_body(messages, tools, options);
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        tracing::debug!(
            model = %self.model,
            messages = messages.len(),
            tools = tools.len(),
            "gemini generateContent"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ThreadkeepError::model(format!("Cannot connect to Gemini at {}", self.base_url))
                } else {
                    ThreadkeepError::from(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 404 {
                return Err(ThreadkeepError::ModelNotFound(self.model.clone()));
            }

            return Err(ThreadkeepError::model(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        let data: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ThreadkeepError::model(format!("Failed to parse response: {}", e)))?;

        let candidate = data
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ThreadkeepError::model("No candidates in Gemini response"))?;

        let mut content = String::new();
        let mut tool_calls = Vec::new();
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if let Some(text) = part.text {
                content.push_str(&text);
            }
            if let Some(call) = part.function_call {
                tool_calls.push(ToolCall::with_generated_id(
                    call.name,
                    call.args.unwrap_or_else(|| json!({})),
                ));
            }
        }

        Ok(LLMResponse {
            content,
            tool_calls,
            usage: data
                .usage_metadata
                .map(|u| TokenUsage::new(u.prompt_token_count, u.candidates_token_count)),
            model: data.model_version.unwrap_or_else(|| self.model.clone()),
        })
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
    model_version: Option<String>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: Option<String>,
    function_call: Option<GeminiFunctionCall>,
}

#[derive(Deserialize)]
struct GeminiFunctionCall {
    name: String,
    args: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ToolCallResult;

    fn provider() -> GeminiProvider {
        let mut config = Config::default();
        config.gemini.api_key = Some("test-key".to_string());
        GeminiProvider::from_config(&config).unwrap()
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let mut config = Config::default();
        config.gemini.api_key = None;
        let err = GeminiProvider::from_config(&config).err().unwrap();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_tool_round_trip_contents() {
        let call = ToolCall::new(
            "c1",
            "calculator",
            json!({"first_num": 2, "second_num": 2, "operation": "add"}),
        );
        let messages = vec![
            Message::user("2 plus 2"),
            Message::assistant_with_tools("", vec![call.clone()]),
            Message::tool_result(&call, &ToolCallResult::success(json!({"result": 4}))),
            Message::assistant("4"),
        ];

        let contents = to_gemini_contents(&messages);
        assert_eq!(contents.len(), 4);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["functionCall"]["name"], "calculator");
        assert_eq!(contents[2]["role"], "function");
        assert_eq!(contents[2]["parts"][0]["functionResponse"]["response"]["result"], 4);
        assert_eq!(contents[3]["parts"][0]["text"], "4");
    }

    #[test]
    fn test_batched_tool_results_grouped() {
        let a = ToolCall::new("a", "web_search", json!({"query": "x"}));
        let b = ToolCall::new("b", "get_stock_price", json!({"symbol": "AAPL"}));
        let messages = vec![
            Message::user("hi"),
            Message::assistant_with_tools("", vec![a.clone(), b.clone()]),
            Message::tool_result(&a, &ToolCallResult::success(json!("plain text"))),
            Message::tool_result(&b, &ToolCallResult::error("boom")),
        ];

        let contents = to_gemini_contents(&messages);
        assert_eq!(contents.len(), 3);
        let parts = contents[2]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["functionResponse"]["response"]["result"], "plain text");
        assert_eq!(parts[1]["functionResponse"]["response"]["error"], "boom");
    }

    #[test]
    fn test_request_body_has_tools_and_system() {
        let tools = vec![ToolDefinition::function("calculator", "math", json!({"type": "object"}))];
        let options = GenerateOptions {
            system_prompt: Some("be brief".to_string()),
            ..Default::default()
        };
        let body = provider().build_request_body(&[Message::user("hi")], &tools, &options);

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(body["tools"][0]["functionDeclarations"][0]["name"], "calculator");
        assert_eq!(body["generationConfig"]["temperature"], 0.0);
    }
}
