use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use strata_common::{abstraction, EpochState, Message, Payload, ProcessId, Roster, Timestamp, Value};
use tracing::debug;

use crate::effects::Context;

/// Consenso de época read/write, restrito a uma única época.
///
/// Só reage ao tráfego marcado com o seu próprio id (`ep.<ets>`). Depois
/// de um `EP_ABORT` a instância fica inerte para sempre.
#[derive(Debug)]
pub struct EpochConsensus {
    id: String,
    ets: Timestamp,
    leader: ProcessId,
    roster: Arc<Roster>,
    state: EpochState,
    tmp_val: Value,
    states: HashMap<u16, EpochState>,
    accepted: HashSet<u16>,
    halted: bool,
}

impl EpochConsensus {
    pub fn new(ets: Timestamp, leader: ProcessId, state: EpochState, roster: Arc<Roster>) -> Self {
        Self {
            id: abstraction::ep(ets),
            ets,
            leader,
            roster,
            state,
            tmp_val: Value::undefined(),
            states: HashMap::new(),
            accepted: HashSet::new(),
            halted: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn ets(&self) -> Timestamp {
        self.ets
    }

    pub fn leader(&self) -> &ProcessId {
        &self.leader
    }

    pub fn state(&self) -> EpochState {
        self.state
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn handle(&mut self, message: &Message, ctx: &mut Context<'_>) -> bool {
        if self.halted {
            return false;
        }

        match &message.payload {
            Payload::EpPropose { value } if message.abstraction_id == self.id => {
                self.tmp_val = *value;
                let read = Message::new(self.id.clone(), Payload::EpRead);
                ctx.trigger(Message::beb_broadcast(self.id.clone(), read));
                true
            }
            Payload::EpAbort if message.abstraction_id == self.id => {
                self.halted = true;
                ctx.trigger(Message::new(
                    self.id.clone(),
                    Payload::EpAborted {
                        ets: self.ets,
                        value_timestamp: self.state.value_timestamp,
                        value: self.state.value,
                    },
                ));
                true
            }
            Payload::BebDeliver { sender, message: inner } if inner.abstraction_id == self.id => {
                self.on_broadcast(sender, inner, ctx)
            }
            Payload::PlDeliver { sender, message: inner } if message.abstraction_id == self.id => {
                self.on_reply(sender, inner, ctx)
            }
            _ => false,
        }
    }

    fn on_broadcast(&mut self, sender: &ProcessId, inner: &Message, ctx: &mut Context<'_>) -> bool {
        match inner.payload {
            Payload::EpRead => {
                let reply = Message::new(
                    self.id.clone(),
                    Payload::EpState {
                        value_timestamp: self.state.value_timestamp,
                        value: self.state.value,
                    },
                );
                ctx.trigger(Message::pl_send(self.id.clone(), sender.clone(), reply));
                true
            }
            Payload::EpWrite { value } => {
                self.state = EpochState::new(self.ets, value);
                let accept = Message::new(self.id.clone(), Payload::EpAccept);
                ctx.trigger(Message::pl_send(self.id.clone(), sender.clone(), accept));
                true
            }
            Payload::EpDecided { value } => {
                ctx.trigger(Message::new(self.id.clone(), Payload::EpDecide { ets: self.ets, value }));
                true
            }
            _ => false,
        }
    }

    fn on_reply(&mut self, sender: &ProcessId, inner: &Message, ctx: &mut Context<'_>) -> bool {
        match inner.payload {
            Payload::EpState { value_timestamp, value } => {
                self.states.insert(sender.port, EpochState::new(value_timestamp, value));
                if self.states.len() >= self.roster.majority() {
                    self.on_read_quorum(ctx);
                }
                true
            }
            Payload::EpAccept => {
                self.accepted.insert(sender.port);
                if self.accepted.len() >= self.roster.majority() {
                    self.accepted.clear();
                    debug!("✅ [{}] {} com quorum de ACCEPT, decidindo {}", ctx.system_id(), self.id, self.tmp_val);
                    let decided = Message::new(self.id.clone(), Payload::EpDecided { value: self.tmp_val });
                    ctx.trigger(Message::beb_broadcast(self.id.clone(), decided));
                }
                true
            }
            _ => false,
        }
    }

    fn on_read_quorum(&mut self, ctx: &mut Context<'_>) {
        let highest = self
            .states
            .values()
            .max_by_key(|s| s.value_timestamp)
            .copied()
            .unwrap_or_default();
        if highest.value.is_defined() {
            self.tmp_val = highest.value;
        }
        self.states.clear();

        let write = Message::new(self.id.clone(), Payload::EpWrite { value: self.tmp_val });
        ctx.trigger(Message::beb_broadcast(self.id.clone(), write));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::Effects;
    use crate::layers::testing::{beb_deliver, broadcasts, pl_deliver, pl_sends, process, roster, run};
    use strata_common::MessageType;

    fn ep(ets: Timestamp, n: u32) -> EpochConsensus {
        EpochConsensus::new(ets, process(n), EpochState::default(), roster(n))
    }

    fn state_from(ets: Timestamp, rank: u32, value_timestamp: Timestamp, value: Value) -> Message {
        pl_deliver(
            &abstraction::ep(ets),
            process(rank),
            Message::new(abstraction::ep(ets), Payload::EpState { value_timestamp, value }),
        )
    }

    fn accept_from(ets: Timestamp, rank: u32) -> Message {
        pl_deliver(
            &abstraction::ep(ets),
            process(rank),
            Message::new(abstraction::ep(ets), Payload::EpAccept),
        )
    }

    fn written(effects: &Effects) -> Option<Value> {
        broadcasts(effects).into_iter().find_map(|m| match m.payload {
            Payload::EpWrite { value } => Some(value),
            _ => None,
        })
    }

    fn decided(effects: &Effects) -> Option<Value> {
        broadcasts(effects).into_iter().find_map(|m| match m.payload {
            Payload::EpDecided { value } => Some(value),
            _ => None,
        })
    }

    #[test]
    fn test_propose_broadcasts_read() {
        let mut ep = ep(3, 3);
        let propose = Message::new(abstraction::ep(3), Payload::EpPropose { value: Value::new(7) });

        let (handled, effects) = run(|ctx| ep.handle(&propose, ctx));

        assert!(handled);
        let sent = broadcasts(&effects);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message_type(), MessageType::EpRead);
        assert_eq!(sent[0].abstraction_id, "ep.3");
    }

    #[test]
    fn test_other_epochs_are_ignored() {
        let mut ep = ep(3, 3);
        let propose = Message::new(abstraction::ep(6), Payload::EpPropose { value: Value::new(7) });
        let (handled, _) = run(|ctx| ep.handle(&propose, ctx));
        assert!(!handled);

        let (handled, _) = run(|ctx| ep.handle(&accept_from(6, 1), ctx));
        assert!(!handled);
    }

    #[test]
    fn test_read_quorum_adopts_highest_timestamp() {
        let mut ep = ep(6, 3);
        let propose = Message::new(abstraction::ep(6), Payload::EpPropose { value: Value::new(9) });
        run(|ctx| ep.handle(&propose, ctx));

        let (_, effects) = run(|ctx| ep.handle(&state_from(6, 1, 3, Value::new(7)), ctx));
        assert!(written(&effects).is_none());

        let (_, effects) = run(|ctx| ep.handle(&state_from(6, 2, 0, Value::undefined()), ctx));
        assert_eq!(written(&effects), Some(Value::new(7)));
    }

    #[test]
    fn test_read_quorum_keeps_proposal_when_nothing_written() {
        let mut ep = ep(3, 3);
        let propose = Message::new(abstraction::ep(3), Payload::EpPropose { value: Value::new(4) });
        run(|ctx| ep.handle(&propose, ctx));

        run(|ctx| ep.handle(&state_from(3, 1, 0, Value::undefined()), ctx));
        let (_, effects) = run(|ctx| ep.handle(&state_from(3, 2, 0, Value::undefined()), ctx));
        assert_eq!(written(&effects), Some(Value::new(4)));
    }

    #[test]
    fn test_accept_quorum_with_four_processes() {
        let mut ep = ep(4, 4);
        let propose = Message::new(abstraction::ep(4), Payload::EpPropose { value: Value::new(1) });
        run(|ctx| ep.handle(&propose, ctx));

        let (_, first) = run(|ctx| ep.handle(&accept_from(4, 1), ctx));
        let (_, second) = run(|ctx| ep.handle(&accept_from(4, 2), ctx));
        assert!(decided(&first).is_none());
        assert!(decided(&second).is_none());

        // ACCEPT repetido do mesmo processo não conta
        let (_, repeated) = run(|ctx| ep.handle(&accept_from(4, 2), ctx));
        assert!(decided(&repeated).is_none());

        let (_, third) = run(|ctx| ep.handle(&accept_from(4, 3), ctx));
        assert_eq!(decided(&third), Some(Value::new(1)));
    }

    #[test]
    fn test_read_write_and_decided_from_leader() {
        let mut ep = EpochConsensus::new(6, process(3), EpochState::new(3, Value::new(5)), roster(3));

        let read = beb_deliver(process(3), Message::new(abstraction::ep(6), Payload::EpRead));
        let (_, effects) = run(|ctx| ep.handle(&read, ctx));
        let sends = pl_sends(&effects);
        assert_eq!(sends[0].0, 5003);
        assert!(matches!(
            sends[0].1.payload,
            Payload::EpState { value_timestamp: 3, value } if value == Value::new(5)
        ));

        let write = beb_deliver(process(3), Message::new(abstraction::ep(6), Payload::EpWrite { value: Value::new(8) }));
        let (_, effects) = run(|ctx| ep.handle(&write, ctx));
        assert_eq!(ep.state(), EpochState::new(6, Value::new(8)));
        assert_eq!(pl_sends(&effects)[0].1.message_type(), MessageType::EpAccept);

        let decided = beb_deliver(process(3), Message::new(abstraction::ep(6), Payload::EpDecided { value: Value::new(8) }));
        let (_, effects) = run(|ctx| ep.handle(&decided, ctx));
        assert!(matches!(
            effects.triggered[0].payload,
            Payload::EpDecide { ets: 6, value } if value == Value::new(8)
        ));
    }

    #[test]
    fn test_abort_is_terminal() {
        let mut ep = EpochConsensus::new(3, process(3), EpochState::new(3, Value::new(7)), roster(3));
        let abort = Message::new(abstraction::ep(3), Payload::EpAbort);

        let (handled, effects) = run(|ctx| ep.handle(&abort, ctx));
        assert!(handled);
        assert!(ep.is_halted());
        assert!(matches!(
            effects.triggered[0].payload,
            Payload::EpAborted { ets: 3, value_timestamp: 3, value } if value == Value::new(7)
        ));

        let read = beb_deliver(process(3), Message::new(abstraction::ep(3), Payload::EpRead));
        let (handled, effects) = run(|ctx| ep.handle(&read, ctx));
        assert!(!handled);
        assert!(effects.is_empty());
    }
}
