//! Stock price tool
//!
//! Latest quote for a ticker symbol via Alpha Vantage `GLOBAL_QUOTE`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::ALPHA_VANTAGE_API_KEY;
use crate::core::{Result, ThreadkeepError, ToolDefinition, ToolsConfig};
use crate::tools::registry::Tool;

/// Keys Alpha Vantage uses to report failures inside a 200 response
const PROVIDER_ERROR_KEYS: [&str; 3] = ["Error Message", "Information", "Note"];

pub struct StockPriceTool {
    definition: ToolDefinition,
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl StockPriceTool {
    pub fn from_config(config: &ToolsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            definition: ToolDefinition::function(
                "get_stock_price",
                "Fetch the latest stock price for a given symbol (e.g. 'AAPL', 'TSLA')",
                json!({
                    "type": "object",
                    "properties": {
                        "symbol": {
                            "type": "string",
                            "description": "Ticker symbol"
                        }
                    },
                    "required": ["symbol"]
                }),
            ),
            client,
            endpoint: config.alpha_vantage_url.clone(),
            api_key: config.alpha_vantage_api_key.clone(),
        })
    }

    /// Errors come back without the request URL, which carries the key
    async fn fetch(&self, symbol: &str, api_key: &str) -> reqwest::Result<Value> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol),
                ("apikey", api_key),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(reqwest::Error::without_url)?;
        response.json().await.map_err(reqwest::Error::without_url)
    }
}

#[async_trait]
impl Tool for StockPriceTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ThreadkeepError::tool(format!(
                "{} not set. Please configure it.",
                ALPHA_VANTAGE_API_KEY
            ))
        })?;

        let symbol = args
            .get("symbol")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ThreadkeepError::tool("symbol must be a non-empty string"))?;

        tracing::debug!(%symbol, "fetching stock quote");

        let body = self
            .fetch(&symbol, api_key)
            .await
            .map_err(|e| ThreadkeepError::tool(format!("Failed to fetch stock price: {}", e)))?;

        for key in PROVIDER_ERROR_KEYS {
            if let Some(message) = body.get(key).and_then(|v| v.as_str()) {
                return Err(ThreadkeepError::tool(format!(
                    "Failed to fetch stock price: {}",
                    message
                )));
            }
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key() {
        let mut config = ToolsConfig::default();
        config.alpha_vantage_api_key = None;
        let tool = StockPriceTool::from_config(&config).unwrap();

        let err = tool.call(json!({"symbol": "AAPL"})).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Tool execution error: ALPHA_VANTAGE_API_KEY not set. Please configure it."
        );
    }
}
