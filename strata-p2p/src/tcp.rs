use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use strata_common::Message;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::codec::{envelope, read_frame, write_frame};
use crate::error::NetworkError;
use crate::transport::Transport;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Transporte TCP: uma conexão curta por mensagem.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    host: String,
    listening_port: u16,
    connect_timeout: Duration,
}

impl TcpTransport {
    pub fn new(host: impl Into<String>, listening_port: u16) -> Self {
        Self {
            host: host.into(),
            listening_port,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&self, host: &str, port: u16, message: Message) -> Result<(), NetworkError> {
        let addr = format!("{host}:{port}");
        let wrapped = envelope(message, &self.host, self.listening_port);

        let mut stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| NetworkError::Send(format!("timeout conectando em {addr}")))?
            .map_err(|e| NetworkError::Send(format!("{addr}: {e}")))?;

        write_frame(&mut stream, &wrapped).await?;
        stream.shutdown().await?;
        Ok(())
    }

    fn listening_port(&self) -> u16 {
        self.listening_port
    }
}

/// Binds `addr` and forwards every decoded frame to `inbound`.
///
/// Returns the bound address (useful with port 0) and the accept loop task.
pub async fn listen(
    addr: &str,
    inbound: UnboundedSender<Message>,
) -> Result<(SocketAddr, JoinHandle<()>), NetworkError> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    debug!("👂 Escutando em {}", local);

    let handle = tokio::spawn(async move {
        loop {
            let (mut socket, peer) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("⚠️ Falha no accept: {}", e);
                    continue;
                }
            };

            let inbound = inbound.clone();
            tokio::spawn(async move {
                loop {
                    match read_frame(&mut socket).await {
                        Ok(Some(msg)) => {
                            if inbound.send(msg).is_err() {
                                return;
                            }
                        }
                        Ok(None) => return,
                        Err(e) => {
                            warn!("⚠️ Frame inválido de {}: {}", peer, e);
                            return;
                        }
                    }
                }
            });
        }
    });

    Ok((local, handle))
}
