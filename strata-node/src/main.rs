use std::sync::Arc;

use clap::Parser;
use strata_common::Value;
use strata_node::{
    cli::{Cli, Commands, HubArgs, RunArgs},
    launch_nodes,
    setup::ensure_config,
    telemetry::init_tracing,
    Hub,
};
use strata_p2p::{listen, TcpTransport};
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run_nodes(args).await,
        Commands::Hub(args) => run_hub(args).await,
    }
}

async fn run_nodes(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ensure_config(&args.config)?;
    args.apply(&mut config);
    config.validate()?;

    let _guard = init_tracing(&config.owner)?;
    info!("--- INICIANDO NÓS STRATA ---");
    info!("Config: {}", args.config.display());
    info!("Hub: {}:{}", config.hub_host, config.hub_port);

    let tasks = match launch_nodes(&config).await {
        Ok(tasks) => tasks,
        Err(e) => {
            error!("Falha ao iniciar nós: {}", e);
            return Err(e.into());
        }
    };

    tokio::signal::ctrl_c().await?;
    info!("🛑 encerrando {} nós", config.nodes);
    for task in tasks {
        task.abort();
    }
    Ok(())
}

async fn run_hub(args: HubArgs) -> Result<(), Box<dyn std::error::Error>> {
    let _guard = init_tracing("hub")?;

    let (tx, mut inbound) = mpsc::unbounded_channel();
    let (addr, _listener) = listen(&format!("{}:{}", args.host, args.port), tx).await?;
    info!("--- HUB STRATA em {} aguardando {} nós ---", addr, args.nodes);

    let transport = Arc::new(TcpTransport::new(args.host.clone(), addr.port()));
    let hub = Hub::new(transport, args.nodes, Value::new(args.value));
    let decisions = hub.run(&mut inbound).await?;

    for decision in &decisions {
        println!("{} {} -> {}", decision.system_id, decision.port, decision.value);
    }
    Ok(())
}
