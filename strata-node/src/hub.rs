use std::sync::Arc;

use strata_common::{abstraction, Message, Payload, ProcessId, Result, StrataError, Value};
use strata_p2p::Transport;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

/// Decision reported by one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub system_id: String,
    pub port: u16,
    pub value: Value,
}

/// Rendezvous local: espera `nodes` registros, propõe `value` a todos e
/// coleta as decisões.
///
/// O rank de cada nó é o seu índice. Os nós rejeitam rosters cujos ranks
/// colidem módulo N (ver `Roster::new`), então os índices registrados devem
/// ser distintos módulo `nodes`; `1..=nodes` sempre serve.
pub struct Hub {
    transport: Arc<dyn Transport>,
    nodes: usize,
    value: Value,
}

impl Hub {
    pub fn new(transport: Arc<dyn Transport>, nodes: usize, value: Value) -> Self {
        Self { transport, nodes, value }
    }

    pub async fn run(&self, inbound: &mut UnboundedReceiver<Message>) -> Result<Vec<Decision>> {
        let processes = self.collect_registrations(inbound).await?;
        let system_id = format!("sys-{}", uuid::Uuid::new_v4());
        info!("📣 propondo {} para {} nós em {}", self.value, processes.len(), system_id);

        for process in &processes {
            let proposal = Message::new(
                abstraction::HUB,
                Payload::AppPropose {
                    value: self.value,
                    processes: processes.clone(),
                },
            )
            .with_system_id(system_id.clone());
            self.transport.send(&process.host, process.port, proposal).await?;
        }

        self.collect_decisions(inbound, &system_id).await
    }

    async fn collect_registrations(&self, inbound: &mut UnboundedReceiver<Message>) -> Result<Vec<ProcessId>> {
        let mut processes: Vec<ProcessId> = Vec::with_capacity(self.nodes);
        while processes.len() < self.nodes {
            let envelope = next(inbound).await?;
            let Payload::NetworkMessage {
                sender_host,
                sender_listening_port,
                message,
            } = envelope.payload
            else {
                continue;
            };
            let Payload::AppRegistration { owner, index } = message.payload else {
                debug!("hub ignorando {} antes da proposta", message);
                continue;
            };
            if processes.iter().any(|p| p.port == sender_listening_port) {
                warn!("⚠️ registro duplicado de {}:{}", sender_host, sender_listening_port);
                continue;
            }
            info!("📝 registrado {}-{} em {}:{}", owner, index, sender_host, sender_listening_port);
            processes.push(ProcessId::new(sender_host, sender_listening_port, owner, index, index));
        }
        Ok(processes)
    }

    async fn collect_decisions(
        &self,
        inbound: &mut UnboundedReceiver<Message>,
        system_id: &str,
    ) -> Result<Vec<Decision>> {
        let mut decisions: Vec<Decision> = Vec::with_capacity(self.nodes);
        while decisions.len() < self.nodes {
            let envelope = next(inbound).await?;
            if envelope.system_id != system_id {
                continue;
            }
            let Payload::NetworkMessage {
                sender_listening_port,
                message,
                ..
            } = envelope.payload
            else {
                continue;
            };
            let Payload::AppDecide { value } = message.payload else {
                continue;
            };
            if decisions.iter().any(|d| d.port == sender_listening_port) {
                continue;
            }
            info!("✅ nó {} decidiu {}", sender_listening_port, value);
            info!(target: "consensus", "EVENT:HUB_DECISION system={} node={} value={}", system_id, sender_listening_port, value);
            decisions.push(Decision {
                system_id: system_id.to_string(),
                port: sender_listening_port,
                value,
            });
        }
        Ok(decisions)
    }
}

async fn next(inbound: &mut UnboundedReceiver<Message>) -> Result<Message> {
    inbound
        .recv()
        .await
        .ok_or_else(|| StrataError::Network("canal do hub fechado".to_string()))
}
