use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use strata_common::Message;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::trace;

use crate::codec::{decode_frame, encode_frame, envelope};
use crate::error::NetworkError;
use crate::transport::Transport;

#[derive(Default)]
struct Registry {
    peers: HashMap<u16, UnboundedSender<Message>>,
    crashed: HashSet<u16>,
}

/// In-memory network; each endpoint is keyed by its listening port.
///
/// Messages still go through the wire codec so tests see exactly what a TCP
/// peer would decode.
#[derive(Clone, Default)]
pub struct InMemoryNetwork {
    registry: Arc<Mutex<Registry>>,
}

impl InMemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an endpoint and returns its transport plus inbound queue.
    pub fn endpoint(&self, host: impl Into<String>, port: u16) -> (InMemoryTransport, UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut registry) = self.registry.lock() {
            registry.crashed.remove(&port);
            registry.peers.insert(port, tx);
        }

        let transport = InMemoryTransport {
            host: host.into(),
            port,
            network: self.clone(),
        };
        (transport, rx)
    }

    /// Crash-stop: the endpoint stops receiving, and whatever it sends is discarded.
    pub fn crash(&self, port: u16) {
        if let Ok(mut registry) = self.registry.lock() {
            registry.peers.remove(&port);
            registry.crashed.insert(port);
        }
    }

    pub fn is_crashed(&self, port: u16) -> bool {
        self.registry
            .lock()
            .map(|r| r.crashed.contains(&port))
            .unwrap_or(false)
    }

    fn deliver(&self, from: u16, port: u16, frame: &[u8]) -> Result<(), NetworkError> {
        let sender = {
            let registry = self
                .registry
                .lock()
                .map_err(|_| NetworkError::Send("registry envenenado".to_string()))?;
            if registry.crashed.contains(&from) || registry.crashed.contains(&port) {
                trace!("mensagem {} -> {} descartada (processo parado)", from, port);
                return Ok(());
            }
            registry.peers.get(&port).cloned()
        };

        let sender = sender.ok_or_else(|| NetworkError::PeerNotFound(port.to_string()))?;
        let message = decode_frame(frame)?;
        sender
            .send(message)
            .map_err(|_| NetworkError::Send(format!("porta {port} fechada")))
    }
}

#[derive(Clone)]
pub struct InMemoryTransport {
    host: String,
    port: u16,
    network: InMemoryNetwork,
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, _host: &str, port: u16, message: Message) -> Result<(), NetworkError> {
        let wrapped = envelope(message, &self.host, self.port);
        let frame = encode_frame(&wrapped)?;
        self.network.deliver(self.port, port, &frame)
    }

    fn listening_port(&self) -> u16 {
        self.port
    }
}
