//! Tools module - Tool implementations for the agent
//!
//! Contains the tool registry and the built-in calculator, web search and
//! stock price tools.

pub mod calculator;
pub mod registry;
pub mod search;
pub mod stock;
pub mod validation;

pub use calculator::CalculatorTool;
pub use registry::{FnTool, Tool, ToolRegistry};
pub use search::{SearchResult, WebSearchTool};
pub use stock::StockPriceTool;
