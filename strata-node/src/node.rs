use std::collections::HashMap;
use std::sync::Arc;

use strata_common::{abstraction, Message, Payload, Result};
use strata_consensus::{spawn_instance, ConsensusInstance, HubAddress, InstanceHandle, RuntimeConfig};
use strata_p2p::{listen, TcpTransport, Transport};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::NodeConfig;

const MAX_PENDING_PER_SYSTEM: usize = 1024;
const MAX_PENDING_SYSTEMS: usize = 64;

/// Routes network traffic to the consensus instances of this node.
///
/// Each `system_id` gets its own instance, created by the first
/// `APP_PROPOSE` that names it. Traffic for a system whose proposal has not
/// arrived yet is held back, within bounds, and replayed once it does.
pub struct HubNode {
    owner: String,
    index: u32,
    port: u16,
    hub: HubAddress,
    runtime: RuntimeConfig,
    transport: Arc<dyn Transport>,
    instances: HashMap<String, InstanceHandle>,
    pending: HashMap<String, Vec<Message>>,
}

impl HubNode {
    pub fn new(
        owner: impl Into<String>,
        index: u32,
        hub: HubAddress,
        runtime: RuntimeConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let port = transport.listening_port();
        Self {
            owner: owner.into(),
            index,
            port,
            hub,
            runtime,
            transport,
            instances: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn pending_messages(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    /// Announces `(owner, index)` to the hub.
    pub async fn register(&self) -> Result<()> {
        let registration = Message::new(
            abstraction::APP,
            Payload::AppRegistration {
                owner: self.owner.clone(),
                index: self.index,
            },
        );
        self.transport
            .send(&self.hub.host, self.hub.port, registration)
            .await?;
        info!("📝 {}-{} registrado no hub {}:{}", self.owner, self.index, self.hub.host, self.hub.port);
        Ok(())
    }

    pub async fn run(mut self, mut inbound: UnboundedReceiver<Message>) {
        while let Some(envelope) = inbound.recv().await {
            self.route(envelope);
        }
        debug!("canal de entrada do nó {} fechado", self.port);
    }

    pub fn route(&mut self, envelope: Message) {
        let Payload::NetworkMessage { message: inner, .. } = &envelope.payload else {
            debug!("🔇 nó {} ignorando {} fora de envelope", self.port, envelope);
            return;
        };

        if matches!(inner.payload, Payload::AppPropose { .. }) {
            let proposal = (**inner).clone().with_system_id(envelope.system_id.clone());
            self.on_proposal(proposal);
            return;
        }

        let system_id = envelope.system_id.clone();
        match self.instances.get(&system_id) {
            Some(handle) => {
                if let Err(e) = handle.enqueue(envelope) {
                    warn!("⚠️ nó {}: {}", self.port, e);
                }
            }
            None => self.hold(system_id, envelope),
        }
    }

    fn on_proposal(&mut self, proposal: Message) {
        let system_id = proposal.system_id.clone();
        if let Some(handle) = self.instances.get(&system_id) {
            if let Err(e) = handle.enqueue(proposal) {
                warn!("⚠️ nó {}: {}", self.port, e);
            }
            return;
        }

        let instance = match ConsensusInstance::from_proposal(&proposal, self.port, Some(self.hub.clone()), self.runtime) {
            Ok(instance) => instance,
            Err(e) => {
                error!("❌ nó {}: proposta rejeitada para {}: {}", self.port, system_id, e);
                return;
            }
        };

        info!(
            "🆕 nó {} criou instância {} (rank {})",
            self.port,
            system_id,
            instance.me().rank
        );
        let handle = spawn_instance(instance, Arc::clone(&self.transport));
        for held in self.pending.remove(&system_id).unwrap_or_default() {
            if let Err(e) = handle.enqueue(held) {
                warn!("⚠️ nó {}: {}", self.port, e);
            }
        }
        self.instances.insert(system_id, handle);
    }

    fn hold(&mut self, system_id: String, envelope: Message) {
        if !self.pending.contains_key(&system_id) && self.pending.len() >= MAX_PENDING_SYSTEMS {
            debug!("🔇 nó {}: sistema desconhecido {}, descartando", self.port, system_id);
            return;
        }
        let held = self.pending.entry(system_id).or_default();
        if held.len() >= MAX_PENDING_PER_SYSTEM {
            debug!("🔇 nó {}: fila de espera cheia, descartando {}", self.port, envelope);
            return;
        }
        held.push(envelope);
    }
}

/// Starts every node of `config` on TCP and registers each one with the hub.
pub async fn launch_nodes(config: &NodeConfig) -> Result<Vec<JoinHandle<()>>> {
    let mut tasks = Vec::new();
    for (index, port) in (1..).zip(config.node_ports()) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (addr, listener) = listen(&format!("{}:{}", config.host, port), tx).await?;
        info!("🌐 nó {}-{} escutando em {}", config.owner, index, addr);

        let transport: Arc<dyn Transport> = Arc::new(TcpTransport::new(config.host.clone(), port));
        let node = HubNode::new(config.owner.clone(), index, config.hub(), config.runtime(), transport);
        if let Err(e) = node.register().await {
            warn!("⚠️ registro de {}-{} falhou: {}", config.owner, index, e);
        }

        tasks.push(listener);
        tasks.push(tokio::spawn(node.run(rx)));
    }
    Ok(tasks)
}
