//! `routefab controller`: run the controller.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use routefab_controller::{Controller, ControllerConfig};

#[derive(Args, Debug)]
pub struct ControllerArgs {
    /// Path to the controller config file.
    #[arg(short, long, default_value = "controller.toml")]
    pub config: PathBuf,

    /// Hex-encoded 32-byte key seed. A random key is generated when absent.
    #[arg(long)]
    pub seed: Option<String>,
}

pub async fn run(args: &ControllerArgs) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.config)
        .with_context(|| format!("reading {}", args.config.display()))?;
    let config: ControllerConfig =
        toml::from_str(&raw).with_context(|| format!("parsing {}", args.config.display()))?;
    tracing::info!(listen_addr = %config.listen_addr, algorithm = %config.algorithm, "starting controller");

    let keypair = super::keypair_from_seed(args.seed.as_deref())?;
    let controller = Controller::new(config, keypair)?;

    // Agents need this in their config to seal registration identities.
    println!("sealing key: {}", hex::encode(controller.sealing_key()));

    // Publish the seed topology before the first agent connects.
    controller.recompute_now().await?;
    controller.run().await?;
    Ok(())
}
