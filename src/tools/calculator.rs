//! Calculator tool
//!
//! Basic arithmetic on two numbers.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::{Result, ThreadkeepError, ToolDefinition};
use crate::tools::registry::Tool;

#[derive(Debug, Deserialize)]
struct CalculatorArgs {
    first_num: f64,
    second_num: f64,
    operation: String,
}

/// Tool performing add, sub, mul and div
pub struct CalculatorTool {
    definition: ToolDefinition,
}

impl CalculatorTool {
    pub fn new() -> Self {
        Self {
            definition: ToolDefinition::function(
                "calculator",
                "Perform a basic arithmetic operation on two numbers. \
                 Supported operations: add, sub, mul, div",
                json!({
                    "type": "object",
                    "properties": {
                        "first_num": {
                            "type": "number",
                            "description": "First operand"
                        },
                        "second_num": {
                            "type": "number",
                            "description": "Second operand"
                        },
                        "operation": {
                            "type": "string",
                            "description": "One of add, sub, mul, div"
                        }
                    },
                    "required": ["first_num", "second_num", "operation"]
                }),
            ),
        }
    }

    /// Apply an operation, returning the error text on failure
    pub fn compute(first: f64, second: f64, operation: &str) -> std::result::Result<f64, String> {
        match operation {
            "add" => Ok(first + second),
            "sub" | "subtract" => Ok(first - second),
            "mul" | "multiply" => Ok(first * second),
            "div" | "divide" => {
                if second == 0.0 {
                    Err("Division by zero is not allowed".to_string())
                } else {
                    Ok(first / second)
                }
            }
            other => Err(format!("Unsupported operation '{}'", other)),
        }
    }
}

impl Default for CalculatorTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let args: CalculatorArgs = serde_json::from_value(args)
            .map_err(|e| ThreadkeepError::tool(format!("Invalid calculator arguments: {}", e)))?;

        let result = Self::compute(args.first_num, args.second_num, &args.operation)
            .map_err(ThreadkeepError::tool)?;

        Ok(json!({
            "first_num": number(args.first_num),
            "second_num": number(args.second_num),
            "operation": args.operation,
            "result": number(result),
        }))
    }
}

/// Integral values within the exact f64 range render as JSON integers
fn number(value: f64) -> Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_EXACT {
        json!(value as i64)
    } else {
        json!(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn call(args: Value) -> Result<Value> {
        CalculatorTool::new().call(args).await
    }

    #[tokio::test]
    async fn test_multiply_integral() {
        let out = call(json!({"first_num": 10, "second_num": 5, "operation": "mul"}))
            .await
            .unwrap();
        assert_eq!(
            out,
            json!({"first_num": 10, "second_num": 5, "operation": "mul", "result": 50})
        );
    }

    #[tokio::test]
    async fn test_fractional_division() {
        let out = call(json!({"first_num": 1, "second_num": 4, "operation": "div"}))
            .await
            .unwrap();
        assert_eq!(out["result"], json!(0.25));
    }

    #[tokio::test]
    async fn test_aliases() {
        let out = call(json!({"first_num": 7, "second_num": 2, "operation": "subtract"}))
            .await
            .unwrap();
        assert_eq!(out["result"], json!(5));
        assert_eq!(out["operation"], "subtract");
    }

    #[tokio::test]
    async fn test_division_by_zero() {
        let err = call(json!({"first_num": 1, "second_num": 0, "operation": "div"}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ThreadkeepError::ToolExecution(ref m) if m == "Division by zero is not allowed"
        ));
    }

    #[test]
    fn test_unsupported_operation() {
        assert_eq!(
            CalculatorTool::compute(1.0, 2.0, "pow").unwrap_err(),
            "Unsupported operation 'pow'"
        );
    }
}
