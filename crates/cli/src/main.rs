//! ClawLoop CLI: the main entry point.
//!
//! Commands:
//! - `run`    : Process a single message and exit
//! - `chat`   : Interactive session with tool approval prompts
//! - `todos`  : Show persisted todo lists
//! - `config` : Print the effective configuration
//! - `doctor` : Diagnose configuration and backend health

use clap::{Parser, Subcommand};

mod commands;
mod prompt;

#[derive(Parser)]
#[command(
    name = "clawloop",
    about = "ClawLoop — a tiered-model coding agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one message and print the final answer
    Run {
        /// The message to send
        #[arg(short, long)]
        message: String,

        /// Reuse a session id (todo lists are kept per session)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Start an interactive session
    Chat {
        /// Reuse a session id (todo lists are kept per session)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Show the latest todo list of a session, or list sessions
    Todos {
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Print the effective configuration (secrets omitted)
    Config {
        /// Print only the config file path
        #[arg(long)]
        path: bool,
    },

    /// Diagnose system health
    Doctor,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Run { message, session } => commands::run::once(message, session).await,
        Commands::Chat { session } => commands::run::chat(session).await,
        Commands::Todos { session } => commands::todos::run(session).await,
        Commands::Config { path } => {
            if path {
                commands::config_cmd::path()
            } else {
                commands::config_cmd::show()
            }
        }
        Commands::Doctor => commands::doctor::run().await,
    };

    if let Err(e) = result {
        eprintln!("  {e}");
        std::process::exit(1);
    }
}
