//! `routefab init`: write template configuration files.

use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (defaults to current directory).
    #[arg(default_value = ".")]
    pub dir: PathBuf,
}

pub fn run(args: &InitArgs) -> anyhow::Result<()> {
    let controller_path = args.dir.join("controller.toml");
    let agent_path = args.dir.join("agent.toml");

    if controller_path.exists() || agent_path.exists() {
        anyhow::bail!(
            "configuration already exists in {}",
            args.dir.display()
        );
    }

    std::fs::create_dir_all(&args.dir)?;

    let controller_config = r#"# Routefab controller configuration

listen_addr = "127.0.0.1:4700"
algorithm = "dijkstra"          # or "bellman_ford"
liveness_ttl_secs = 30
recompute_period_secs = 30
max_connections = 64
io_timeout_ms = 5000
snapshot_path = "routing_tables.json"

[[topology.nodes]]
id = 1
name = "r1"
kind = "router"

[[topology.nodes]]
id = 2
name = "r2"
kind = "router"

[[topology.links]]
source = 1
destination = 2
bandwidth = 2100.0
"#;

    let agent_config = r#"# Routefab agent configuration

name = "r1"
listen_addr = "127.0.0.1:4801"
controller_addr = "127.0.0.1:4700"
# Printed by the controller at startup (or by `routefab keygen`).
controller_sealing_key = "0000000000000000000000000000000000000000000000000000000000000000"
register_interval_secs = 5
io_timeout_ms = 5000
chunk_size = 1024

[address_book.r2]
addr = "127.0.0.1:4802"
# Required only for peers this agent originates messages to.
# sealing_key = "..."
"#;

    std::fs::write(&controller_path, controller_config)?;
    std::fs::write(&agent_path, agent_config)?;

    println!("Wrote {}", controller_path.display());
    println!("Wrote {}", agent_path.display());
    println!("Run 'routefab keygen' to generate key seeds, then edit the sealing keys.");
    Ok(())
}
