//! Interactive REPL for Threadkeep
//!
//! Provides the main user interaction loop.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::agent::AgentController;
use crate::cli::commands::{format_outcome, handle_command, CommandResult, Session};
use crate::core::Result;

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    session: Session,
}

impl Repl {
    /// Create a REPL on `thread_id`, or on a new thread
    pub fn new(controller: Arc<AgentController>, thread_id: Option<String>) -> Self {
        Self {
            session: Session::new(controller, thread_id),
        }
    }

    /// Run the REPL
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner().await;

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("You: ");
            stdout.flush()?;

            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    // EOF (Ctrl+D)
                    println!("\nGoodbye!");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            }

            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            match handle_command(input, &mut self.session).await {
                Ok(CommandResult::Exit) => {
                    println!("\nGoodbye!");
                    break;
                }
                Ok(CommandResult::Handled(output)) => {
                    println!("{}\n", output);
                }
                Ok(CommandResult::Continue(input)) => match self.session.send(&input).await {
                    Ok(outcome) => println!("{}\n", format_outcome(&outcome)),
                    Err(e) if e.is_fatal() => {
                        eprintln!("\nFatal: {}", e);
                        return Err(e);
                    }
                    Err(e) => {
                        // The thread keeps its last checkpoint; the user can retry.
                        eprintln!("\nError: {}\n", e);
                    }
                },
                Err(e) => {
                    eprintln!("Command error: {}\n", e);
                }
            }
        }

        Ok(())
    }

    async fn print_banner(&self) {
        let controller = self.session.controller();
        let history = controller
            .history(self.session.thread_id())
            .await
            .map(|h| h.len())
            .unwrap_or(0);

        println!("\nThreadkeep - resumable tool-using chat\n");
        println!(
            "Model:   {} ({})",
            controller.provider().model(),
            controller.provider().name()
        );
        println!("Storage: {}", controller.checkpointer().name());
        println!(
            "Thread:  {} ({} messages)",
            self.session.thread_id(),
            history
        );
        println!();
        println!("Commands: help, new, threads, switch, history, status, exit");
        println!("─────────────────────────────────────────────────────────────");
    }
}
