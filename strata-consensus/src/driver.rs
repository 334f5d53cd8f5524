use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use strata_common::{Message, Result, StrataError};
use strata_p2p::Transport;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::effects::{Outbound, Timer};
use crate::instance::ConsensusInstance;

/// Alça para enfileirar mensagens numa instância em execução.
#[derive(Debug, Clone)]
pub struct InstanceHandle {
    system_id: String,
    tx: UnboundedSender<Message>,
}

impl InstanceHandle {
    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    /// Thread-safe enqueue into the instance's event bus.
    pub fn enqueue(&self, message: Message) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_| StrataError::Consensus(format!("instância {} encerrada", self.system_id)))
    }
}

/// Spawns the dispatch task of one instance and returns its handle.
///
/// The task lives as long as the runtime: instances are never torn down.
pub fn spawn_instance(instance: ConsensusInstance, transport: Arc<dyn Transport>) -> InstanceHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = InstanceHandle {
        system_id: instance.system_id().to_string(),
        tx: tx.clone(),
    };

    tokio::spawn(run(instance, transport, tx, rx));
    handle
}

async fn run(
    mut instance: ConsensusInstance,
    transport: Arc<dyn Transport>,
    tx: UnboundedSender<Message>,
    mut rx: UnboundedReceiver<Message>,
) {
    let pass_interval = instance.config().pass_interval;
    let system_id = instance.system_id().to_string();
    debug!("🚀 [{}] instância iniciada", system_id);

    loop {
        if instance.queue_len() == 0 && !instance.has_pending_effects() {
            match rx.recv().await {
                Some(message) => instance.trigger(message),
                None => return,
            }
        }
        while let Ok(message) = rx.try_recv() {
            instance.trigger(message);
        }

        let report = instance.run_pass(Instant::now());

        let system_id = system_id.as_str();
        let sends = report.outbound.into_iter().map(|Outbound { host, port, message }| {
            let transport = Arc::clone(&transport);
            async move {
                let kind = message.message_type();
                if let Err(e) = transport.send(&host, port, message).await {
                    warn!("⚠️ [{}] falha ao enviar {} para {}:{}: {}", system_id, kind, host, port, e);
                }
            }
        });
        join_all(sends).await;

        for Timer { delay, message } in report.timers {
            let tx = tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = tx.send(message);
            });
        }

        if report.handled == 0 {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(message) => instance.trigger(message),
                    None => return,
                },
                _ = tokio::time::sleep(pass_interval) => {}
            }
        }
    }
}
