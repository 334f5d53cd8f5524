use std::sync::Arc;

use strata_common::{Message, Payload, Roster};
use tracing::debug;

use crate::effects::Context;

/// Perfect link: entrega ponto a ponto sobre o transporte.
///
/// No retransmission: reliability is whatever the transport gives.
#[derive(Debug)]
pub struct PerfectLink {
    roster: Arc<Roster>,
}

impl PerfectLink {
    pub fn new(roster: Arc<Roster>) -> Self {
        Self { roster }
    }

    pub fn handle(&mut self, message: &Message, ctx: &mut Context<'_>) -> bool {
        match &message.payload {
            Payload::PlSend { destination, .. } => {
                ctx.send(destination.host.clone(), destination.port, message.clone());
                true
            }
            Payload::NetworkMessage {
                sender_listening_port,
                message: inner,
                ..
            } => {
                match self.roster.by_port(*sender_listening_port) {
                    Some(sender) => ctx.trigger(Message::new(
                        message.abstraction_id.clone(),
                        Payload::PlDeliver {
                            sender: sender.clone(),
                            message: inner.clone(),
                        },
                    )),
                    None => debug!(
                        "🔇 [{}] remetente desconhecido na porta {}, descartando {}",
                        ctx.system_id(),
                        sender_listening_port,
                        inner
                    ),
                }
                true
            }
            _ => false,
        }
    }
}
