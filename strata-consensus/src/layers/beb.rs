use std::sync::Arc;

use strata_common::{abstraction, Message, Payload, Roster};

use crate::effects::Context;

/// Best-effort broadcast: um PL_SEND por membro do roster, inclusive para si.
#[derive(Debug)]
pub struct BestEffortBroadcast {
    roster: Arc<Roster>,
}

impl BestEffortBroadcast {
    pub fn new(roster: Arc<Roster>) -> Self {
        Self { roster }
    }

    pub fn handle(&mut self, message: &Message, ctx: &mut Context<'_>) -> bool {
        match &message.payload {
            Payload::BebBroadcast { message: inner } => {
                for member in self.roster.iter() {
                    ctx.trigger(Message::pl_send(abstraction::BEB, member.clone(), (**inner).clone()));
                }
                true
            }
            Payload::PlDeliver { sender, message: inner } if message.abstraction_id == abstraction::BEB => {
                ctx.trigger(Message::new(
                    abstraction::BEB,
                    Payload::BebDeliver {
                        sender: sender.clone(),
                        message: inner.clone(),
                    },
                ));
                true
            }
            _ => false,
        }
    }
}
