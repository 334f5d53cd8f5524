use async_trait::async_trait;
use strata_common::Message;

use crate::error::NetworkError;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a message to `host:port`.
    ///
    /// The transport wraps it in a `NETWORK_MESSAGE` envelope stamped with
    /// its own host and listening port before it leaves the process.
    async fn send(&self, host: &str, port: u16, message: Message) -> Result<(), NetworkError>;

    /// Port this endpoint listens on; identifies the sender on the other side.
    fn listening_port(&self) -> u16;
}
