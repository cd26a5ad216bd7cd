//! Web search tool
//!
//! Queries the DuckDuckGo instant answer API and flattens the abstract,
//! direct results and related topics into a ranked snippet list.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use crate::core::{Result, ThreadkeepError, ToolDefinition, ToolsConfig};
use crate::tools::registry::Tool;

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// DuckDuckGo-backed search tool
pub struct WebSearchTool {
    definition: ToolDefinition,
    client: Client,
    endpoint: String,
    region: String,
    max_results: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct InstantAnswer {
    heading: String,
    abstract_text: String,
    #[serde(rename = "AbstractURL")]
    abstract_url: String,
    results: Vec<Topic>,
    related_topics: Vec<Topic>,
}

/// A topic is either a leaf with text or a named group of topics
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct Topic {
    text: String,
    #[serde(rename = "FirstURL")]
    first_url: String,
    topics: Vec<Topic>,
}

impl WebSearchTool {
    pub fn from_config(config: &ToolsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("threadkeep/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            definition: ToolDefinition::function(
                "web_search",
                "Search the web and return short result snippets for a query",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The search query"
                        }
                    },
                    "required": ["query"]
                }),
            ),
            client,
            endpoint: config.search_url.clone(),
            region: config.search_region.clone(),
            max_results: config.max_search_results,
        })
    }

    /// Run a search and return at most `max_results` hits
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let url = Url::parse_with_params(
            &self.endpoint,
            &[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
                ("kl", self.region.as_str()),
            ],
        )
        .map_err(|e| ThreadkeepError::config(format!("Invalid search URL: {}", e)))?;

        tracing::debug!(%query, "web search");

        let answer: InstantAnswer = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ThreadkeepError::tool(format!("Search failed: {}", e)))?
            .json()
            .await
            .map_err(|e| ThreadkeepError::tool(format!("Search failed: {}", e)))?;

        Ok(flatten(answer, self.max_results))
    }
}

fn flatten(answer: InstantAnswer, limit: usize) -> Vec<SearchResult> {
    let mut hits = Vec::new();

    if !answer.abstract_text.is_empty() {
        hits.push(SearchResult {
            title: answer.heading,
            snippet: answer.abstract_text,
            url: answer.abstract_url,
        });
    }

    let mut stack: Vec<Topic> = answer.results;
    stack.extend(answer.related_topics);
    collect_topics(stack, &mut hits);

    hits.truncate(limit);
    hits
}

fn collect_topics(topics: Vec<Topic>, out: &mut Vec<SearchResult>) {
    for topic in topics {
        if !topic.topics.is_empty() {
            collect_topics(topic.topics, out);
            continue;
        }
        if topic.text.is_empty() {
            continue;
        }
        let title = topic
            .text
            .split(" - ")
            .next()
            .unwrap_or(&topic.text)
            .to_string();
        out.push(SearchResult {
            title,
            snippet: topic.text,
            url: topic.first_url,
        });
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ThreadkeepError::tool("query must be a string"))?;

        let results = self.search(query).await?;
        Ok(json!({ "query": query, "results": results }))
    }
}
