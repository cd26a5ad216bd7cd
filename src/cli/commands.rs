//! CLI commands
//!
//! Special commands that can be executed in the REPL, plus the message
//! rendering shared with the one-shot subcommands.

use std::sync::Arc;

use uuid::Uuid;

use crate::agent::{AgentController, StopReason, TurnOutcome};
use crate::checkpoint::validate_thread_id;
use crate::core::{Message, Result, Role};

/// Result of parsing a command
pub enum CommandResult {
    /// Continue processing as normal input
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// Exit the REPL
    Exit,
}

/// The controller plus the thread the REPL is currently talking on
pub struct Session {
    controller: Arc<AgentController>,
    thread_id: String,
}

impl Session {
    /// Start on `thread_id`, or on a fresh thread when none is given
    pub fn new(controller: Arc<AgentController>, thread_id: Option<String>) -> Self {
        Self {
            controller,
            thread_id: thread_id.unwrap_or_else(new_thread_id),
        }
    }

    pub fn controller(&self) -> &AgentController {
        &self.controller
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub async fn send(&self, input: &str) -> Result<TurnOutcome> {
        self.controller
            .run_turn(&self.thread_id, Message::user(input))
            .await
    }
}

/// A fresh random thread id
pub fn new_thread_id() -> String {
    Uuid::new_v4().to_string()
}

/// Parse and handle special commands
pub async fn handle_command(input: &str, session: &mut Session) -> Result<CommandResult> {
    let input = input.trim();
    let mut parts = input.splitn(2, ' ');
    let cmd = parts.next().unwrap_or_default().to_lowercase();
    let args = parts.next().map(str::trim).unwrap_or("");

    match cmd.as_str() {
        "exit" | "quit" | "q" => Ok(CommandResult::Exit),

        "help" | "?" => Ok(CommandResult::Handled(help_text())),

        "new" => {
            session.thread_id = new_thread_id();
            Ok(CommandResult::Handled(format!(
                "Started new thread: {}",
                session.thread_id
            )))
        }

        "threads" => {
            let ids = session.controller.list_thread_ids().await?;
            Ok(CommandResult::Handled(format_thread_list(
                &ids,
                Some(&session.thread_id),
            )))
        }

        "switch" => {
            if args.is_empty() {
                return Ok(CommandResult::Handled("Usage: switch <thread-id>".to_string()));
            }
            validate_thread_id(args)?;
            session.thread_id = args.to_string();
            let history = session.controller.history(args).await?;
            Ok(CommandResult::Handled(format!(
                "Switched to thread {} ({} messages)",
                args,
                history.len()
            )))
        }

        "history" => {
            let history = session.controller.history(&session.thread_id).await?;
            if history.is_empty() {
                return Ok(CommandResult::Handled("No messages yet.".to_string()));
            }
            Ok(CommandResult::Handled(format_messages(history.messages())))
        }

        "status" => {
            let controller = &session.controller;
            let checkpoints = controller.checkpoints(&session.thread_id).await?;
            let status = format!(
                "Threadkeep Status:\n\
                 ─────────────────────────────\n\
                 Thread:       {}\n\
                 Provider:     {} ({})\n\
                 Storage:      {}\n\
                 Checkpoints:  {}\n\
                 Max steps:    {}\n\
                 Debug:        {}",
                session.thread_id,
                controller.provider().name(),
                controller.provider().model(),
                controller.checkpointer().name(),
                checkpoints.len(),
                controller.config().max_steps,
                if controller.config().debug { "on" } else { "off" }
            );
            Ok(CommandResult::Handled(status))
        }

        _ => {
            if input.starts_with('/') {
                Ok(CommandResult::Handled(format!(
                    "Unknown command: {}. Type 'help' for available commands.",
                    cmd
                )))
            } else {
                Ok(CommandResult::Continue(input.to_string()))
            }
        }
    }
}

/// One line per thread id, marking the current one
pub fn format_thread_list(ids: &[String], current: Option<&str>) -> String {
    if ids.is_empty() {
        return "No threads yet.".to_string();
    }
    ids.iter()
        .map(|id| {
            if Some(id.as_str()) == current {
                format!("* {}", id)
            } else {
                format!("  {}", id)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a message sequence for the terminal
pub fn format_messages(messages: &[Message]) -> String {
    messages
        .iter()
        .map(format_message)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_message(message: &Message) -> String {
    match message.role() {
        Role::User => format!("You: {}", message.content()),
        Role::Assistant if message.has_tool_calls() => {
            let calls: Vec<String> = message
                .tool_calls()
                .iter()
                .map(|c| format!("{}({})", c.name, c.arguments))
                .collect();
            format!("Assistant → {}", calls.join(", "))
        }
        Role::Assistant => format!("Assistant: {}", message.content()),
        Role::Tool => format!(
            "  [{}] {}",
            message.name().unwrap_or("tool"),
            message.content()
        ),
    }
}

/// Summary printed after a turn: tool activity, then the answer
pub fn format_outcome(outcome: &TurnOutcome) -> String {
    let mut output = String::new();
    for message in outcome.messages.iter().filter(|m| m.role() == Role::Tool) {
        let failed = message
            .tool_payload()
            .map(|p| p.get("error").is_some())
            .unwrap_or(false);
        let status = if failed { "✗" } else { "✓" };
        output.push_str(&format!(
            "  {} {}\n",
            status,
            message.name().unwrap_or("tool")
        ));
    }

    match outcome.final_text() {
        Some(text) => output.push_str(&format!("\nAssistant:\n{}", text)),
        None => output.push_str("\nAssistant: (no answer)"),
    }

    if let StopReason::StepLimit { max_steps } = outcome.stop_reason {
        output.push_str(&format!(
            "\n\n[stopped after {} steps without a final answer]",
            max_steps
        ));
    }

    output
}

/// Generate help text
fn help_text() -> String {
    r#"Threadkeep Commands:
─────────────────────────────────────────────
  help, ?          Show this help message
  exit, quit, q    Exit Threadkeep
  new              Start a new thread
  threads          List all saved threads
  switch <id>      Continue an existing thread
  history          Show the current thread's messages
  status           Show current configuration

Keyboard Shortcuts:
  Ctrl+D           Exit Threadkeep

Anything else is sent to the assistant on the current thread.
─────────────────────────────────────────────"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ToolCall, ToolCallResult};
    use serde_json::json;

    #[test]
    fn test_thread_list_marks_current() {
        let ids = vec!["a".to_string(), "b".to_string()];
        assert_eq!(format_thread_list(&ids, Some("b")), "  a\n* b");
        assert_eq!(format_thread_list(&[], None), "No threads yet.");
    }

    #[test]
    fn test_format_tool_messages() {
        let call = ToolCall::new("c1", "calculator", json!({"operation": "add"}));
        let request = Message::assistant_with_tools("", vec![call.clone()]);
        let result = Message::tool_result(&call, &ToolCallResult::success(json!({"result": 4})));

        assert!(format_message(&request).contains("calculator("));
        assert_eq!(format_message(&result), r#"  [calculator] {"result":4}"#);
    }

    #[test]
    fn test_new_thread_ids_are_unique() {
        assert_ne!(new_thread_id(), new_thread_id());
    }

    fn session() -> Session {
        use crate::checkpoint::MemoryCheckpointer;
        use crate::core::AgentConfig;
        use crate::llm::OllamaClient;
        use crate::tools::ToolRegistry;

        let llm = OllamaClient::with_base_url("http://127.0.0.1:9", "none").unwrap();
        let controller = AgentController::new(
            Arc::new(llm),
            Arc::new(ToolRegistry::new()),
            Arc::new(MemoryCheckpointer::new()),
            AgentConfig::default(),
        );
        Session::new(Arc::new(controller), Some("start".to_string()))
    }

    #[test]
    fn test_repl_commands() {
        let mut session = session();

        let result = tokio_test::block_on(handle_command("new", &mut session)).unwrap();
        assert!(matches!(result, CommandResult::Handled(_)));
        assert_ne!(session.thread_id(), "start");

        tokio_test::block_on(handle_command("switch other", &mut session)).unwrap();
        assert_eq!(session.thread_id(), "other");

        let result = tokio_test::block_on(handle_command("history", &mut session)).unwrap();
        assert!(matches!(result, CommandResult::Handled(ref s) if s == "No messages yet."));

        let result = tokio_test::block_on(handle_command("What is 2+2?", &mut session)).unwrap();
        assert!(matches!(result, CommandResult::Continue(ref s) if s == "What is 2+2?"));

        let result = tokio_test::block_on(handle_command("quit", &mut session)).unwrap();
        assert!(matches!(result, CommandResult::Exit));
    }
}
