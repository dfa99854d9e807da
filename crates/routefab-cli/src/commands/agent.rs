//! `routefab agent`: run a node agent.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use routefab_agent::{AgentConfig, NodeAgent};

#[derive(Args, Debug)]
pub struct AgentArgs {
    /// Path to the agent config file.
    #[arg(short, long, default_value = "agent.toml")]
    pub config: PathBuf,

    /// Hex-encoded 32-byte key seed. A random key is generated when absent.
    #[arg(long)]
    pub seed: Option<String>,
}

pub async fn run(args: &AgentArgs) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.config)
        .with_context(|| format!("reading {}", args.config.display()))?;
    let config: AgentConfig =
        toml::from_str(&raw).with_context(|| format!("parsing {}", args.config.display()))?;
    config.validate()?;
    tracing::info!(name = %config.name, listen_addr = %config.listen_addr, "starting agent");

    let keypair = super::keypair_from_seed(args.seed.as_deref())?;
    let (agent, mut deliveries) = NodeAgent::new(config, keypair);

    // Peers need this in their address books to originate messages here.
    println!("sealing key: {}", hex::encode(agent.sealing_key()));

    tokio::spawn(async move {
        while let Some(delivery) = deliveries.recv().await {
            println!(
                "from {}: {}",
                delivery.origin,
                String::from_utf8_lossy(&delivery.payload)
            );
        }
    });

    agent.run().await?;
    Ok(())
}
