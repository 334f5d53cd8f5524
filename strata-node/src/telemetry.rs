use strata_common::{Result, StrataError};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;

/// Instala o subscriber global.
///
/// Audit events (`target: "consensus"`) go only to `logs/audit-<owner>.log`;
/// everything else goes to stdout, filtered by `RUST_LOG`.
pub fn init_tracing(owner: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all("logs")?;
    let file_appender = tracing_appender::rolling::never("logs", format!("audit-{owner}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let consensus_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target() == "consensus"
        }));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,strata_node=debug".into()),
        )
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target() != "consensus"
        }));

    tracing_subscriber::registry()
        .with(consensus_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| StrataError::Other(format!("tracing já inicializado: {e}")))?;

    Ok(guard)
}
