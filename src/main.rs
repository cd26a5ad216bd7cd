//! Threadkeep - resumable tool-using chat agent
//!
//! Main entry point for the CLI application.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use threadkeep::checkpoint::validate_thread_id;
use threadkeep::cli::{format_messages, format_outcome, format_thread_list};
use threadkeep::{
    create_provider, AgentController, Checkpointer, Config, Message, ProviderType, Repl,
    SqliteCheckpointer, ToolRegistry,
};

/// Threadkeep - resumable tool-using chat agent
#[derive(Parser, Debug)]
#[command(name = "threadkeep")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// SQLite checkpoint database
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Model provider (gemini or ollama)
    #[arg(long, global = true)]
    provider: Option<ProviderType>,

    /// Model name for the selected provider
    #[arg(long, short = 'm', global = true)]
    model: Option<String>,

    /// Maximum model and tool steps per turn
    #[arg(long, global = true)]
    max_steps: Option<usize>,

    /// Enable debug output
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive chat (default)
    Chat {
        /// Thread to resume; a new one is started when omitted
        #[arg(long, short = 't')]
        thread: Option<String>,
    },
    /// Send one message and print the new messages
    Ask {
        #[arg(long, short = 't')]
        thread: String,
        prompt: String,
    },
    /// List every saved thread
    Threads,
    /// Print the stored messages of a thread
    History {
        #[arg(long, short = 't')]
        thread: String,
    },
    /// Print the effective configuration, or write it with --init
    Config {
        #[arg(long)]
        init: bool,
    },
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if debug {
        "threadkeep=debug,warn"
    } else {
        "threadkeep=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(provider) = args.provider {
        config.provider = provider;
    }
    if let Some(ref model) = args.model {
        config.set_model(model.clone());
    }
    if let Some(ref db) = args.db {
        config.storage.database_path = db.clone();
    }
    if let Some(max_steps) = args.max_steps {
        config.agent.max_steps = max_steps;
    }
    if args.debug {
        config.agent.debug = true;
    }

    init_tracing(config.agent.debug);
    tracing::debug!(
        provider = %config.provider,
        model = config.model_name(),
        db = %config.storage.database_path.display(),
        "configuration loaded"
    );

    let command = args.command.unwrap_or(Command::Chat { thread: None });

    if let Command::Config { init } = command {
        if init {
            let path = config.save()?;
            println!("Wrote {}", path.display());
        } else {
            print!("{}", toml::to_string_pretty(&config)?);
        }
        return Ok(());
    }

    let checkpointer = Arc::new(
        SqliteCheckpointer::open(&config.storage.database_path).with_context(|| {
            format!(
                "could not open checkpoint store {}",
                config.storage.database_path.display()
            )
        })?,
    );

    // Listing and reading threads needs storage only
    match command {
        Command::Threads => {
            let ids = checkpointer.list_thread_ids().await?;
            println!("{}", format_thread_list(&ids, None));
            return Ok(());
        }
        Command::History { ref thread } => {
            validate_thread_id(thread)?;
            let state = checkpointer.load_latest(thread).await?;
            if state.is_empty() {
                println!("No messages on thread {}", thread);
            } else {
                println!("{}", format_messages(state.messages()));
            }
            return Ok(());
        }
        _ => {}
    }

    config.validate()?;
    let provider = create_provider(&config)?;
    let tools = Arc::new(ToolRegistry::with_builtin_tools(&config.tools)?);
    let controller = Arc::new(AgentController::new(
        provider,
        tools,
        checkpointer,
        config.agent.clone(),
    ));

    match command {
        Command::Ask { thread, prompt } => {
            let outcome = controller.run_turn(&thread, Message::user(prompt)).await?;
            if config.agent.debug {
                println!("{}\n", format_messages(&outcome.messages));
            }
            println!("{}", format_outcome(&outcome));
        }
        Command::Chat { thread } => {
            let mut repl = Repl::new(controller, thread);
            repl.run().await?;
        }
        Command::Threads | Command::History { .. } | Command::Config { .. } => {}
    }

    Ok(())
}
