//! Routefab CLI.
//!
//! Subcommands: init, keygen, controller, agent.

mod commands;

use clap::{Parser, Subcommand};

/// Software-defined routing fabric: central path controller and hop-by-hop
/// forwarding agents.
#[derive(Parser, Debug)]
#[command(name = "routefab", version, about, long_about = None)]
struct Cli {
    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write template controller and agent configuration files.
    Init(commands::init::InitArgs),
    /// Generate a key seed and print the derived keys.
    Keygen(commands::keygen::KeygenArgs),
    /// Run the controller.
    Controller(commands::controller::ControllerArgs),
    /// Run a node agent.
    Agent(commands::agent::AgentArgs),
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match &cli.command {
        Commands::Init(args) => commands::init::run(args),
        Commands::Keygen(args) => commands::keygen::run(args),
        Commands::Controller(args) => commands::controller::run(args).await,
        Commands::Agent(args) => commands::agent::run(args).await,
    }
}
