use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::NodeConfig;

#[derive(Parser, Debug)]
#[command(name = "strata-node")]
#[command(about = "Strata uniform consensus node")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the nodes described by a config file
    Run(RunArgs),
    /// Local rendezvous: waits for registrations and proposes one value
    Hub(HubArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[arg(long, value_name = "FILE", default_value = "config.json")]
    pub config: PathBuf,
    #[arg(long)]
    pub owner: Option<String>,
    #[arg(long)]
    pub base_port: Option<u16>,
    #[arg(long)]
    pub nodes: Option<u32>,
    #[arg(long)]
    pub hub_host: Option<String>,
    #[arg(long)]
    pub hub_port: Option<u16>,
}

impl RunArgs {
    /// Flags given on the command line win over the file.
    pub fn apply(&self, config: &mut NodeConfig) {
        if let Some(owner) = &self.owner {
            config.owner = owner.clone();
        }
        if let Some(base_port) = self.base_port {
            config.base_port = base_port;
        }
        if let Some(nodes) = self.nodes {
            config.nodes = nodes;
        }
        if let Some(hub_host) = &self.hub_host {
            config.hub_host = hub_host.clone();
        }
        if let Some(hub_port) = self.hub_port {
            config.hub_port = hub_port;
        }
    }
}

#[derive(Args, Debug)]
pub struct HubArgs {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    #[arg(long, default_value_t = 5000)]
    pub port: u16,
    #[arg(long, default_value_t = 3)]
    pub nodes: usize,
    #[arg(long, allow_hyphen_values = true)]
    pub value: i32,
}
