use std::sync::Arc;

use strata_common::{abstraction, Message, Payload, ProcessId, Roster, Timestamp};
use tracing::debug;

use crate::effects::Context;

/// Leader-driven epoch change.
///
/// `ts` starts at the process rank and only ever grows by `N`, so the
/// timestamps issued by distinct processes never collide.
#[derive(Debug)]
pub struct EpochChange {
    me: ProcessId,
    roster: Arc<Roster>,
    trusted: ProcessId,
    ts: Timestamp,
    last_ts: Timestamp,
}

impl EpochChange {
    pub fn new(me: ProcessId, roster: Arc<Roster>) -> Self {
        let trusted = roster.min_rank().clone();
        let ts = me.rank as Timestamp;
        Self {
            me,
            roster,
            trusted,
            ts,
            last_ts: 0,
        }
    }

    pub fn ts(&self) -> Timestamp {
        self.ts
    }

    pub fn last_ts(&self) -> Timestamp {
        self.last_ts
    }

    pub fn trusted(&self) -> &ProcessId {
        &self.trusted
    }

    pub fn handle(&mut self, message: &Message, ctx: &mut Context<'_>) -> bool {
        match &message.payload {
            Payload::EldTrust { process } => {
                self.trusted = process.clone();
                if *process == self.me {
                    self.new_epoch(ctx);
                }
                true
            }
            Payload::BebDeliver { sender, message: inner } => match inner.payload {
                Payload::EcNewEpoch { timestamp } => {
                    self.on_new_epoch(sender, timestamp, ctx);
                    true
                }
                _ => false,
            },
            Payload::PlDeliver { message: inner, .. } if message.abstraction_id == abstraction::EC => {
                match inner.payload {
                    Payload::EcNack => {
                        if self.trusted == self.me {
                            self.new_epoch(ctx);
                        }
                        true
                    }
                    _ => false,
                }
            }
            _ => false,
        }
    }

    fn new_epoch(&mut self, ctx: &mut Context<'_>) {
        self.ts += self.roster.len() as Timestamp;
        debug!("🗳️ [{}] rank {} anunciando época {}", ctx.system_id(), self.me.rank, self.ts);
        let announce = Message::new(abstraction::EC, Payload::EcNewEpoch { timestamp: self.ts });
        ctx.trigger(Message::beb_broadcast(abstraction::EC, announce));
    }

    fn on_new_epoch(&mut self, sender: &ProcessId, new_ts: Timestamp, ctx: &mut Context<'_>) {
        if new_ts > self.last_ts && *sender == self.trusted {
            self.last_ts = new_ts;
            tracing::info!(target: "consensus", "EVENT:EC_START_EPOCH system={} ts={} leader={}", ctx.system_id(), new_ts, sender.rank);
            ctx.trigger(Message::new(
                abstraction::EC,
                Payload::EcStartEpoch {
                    new_timestamp: new_ts,
                    new_leader: sender.clone(),
                },
            ));
        } else {
            debug!(
                "🚫 [{}] NACK para rank {} (ts={} last_ts={} trusted={})",
                ctx.system_id(),
                sender.rank,
                new_ts,
                self.last_ts,
                self.trusted.rank
            );
            let nack = Message::new(abstraction::EC, Payload::EcNack);
            ctx.trigger(Message::pl_send(abstraction::EC, sender.clone(), nack));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::Effects;
    use crate::layers::testing::{beb_deliver, broadcasts, pl_deliver, pl_sends, process, roster, run};
    use strata_common::MessageType;

    fn trust(rank: u32) -> Message {
        Message::new(abstraction::ELD, Payload::EldTrust { process: process(rank) })
    }

    fn new_epoch_from(rank: u32, timestamp: Timestamp) -> Message {
        beb_deliver(
            process(rank),
            Message::new(abstraction::EC, Payload::EcNewEpoch { timestamp }),
        )
    }

    fn nack_from(rank: u32) -> Message {
        pl_deliver(abstraction::EC, process(rank), Message::new(abstraction::EC, Payload::EcNack))
    }

    fn announced(effects: &Effects) -> Vec<Timestamp> {
        broadcasts(effects)
            .into_iter()
            .filter_map(|m| match m.payload {
                Payload::EcNewEpoch { timestamp } => Some(timestamp),
                _ => None,
            })
            .collect()
    }

    fn started(effects: &Effects) -> Vec<(Timestamp, u32)> {
        effects
            .triggered
            .iter()
            .filter_map(|m| match &m.payload {
                Payload::EcStartEpoch {
                    new_timestamp,
                    new_leader,
                } => Some((*new_timestamp, new_leader.rank)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_timestamps_advance_by_roster_size() {
        let mut ec = EpochChange::new(process(2), roster(3));
        assert_eq!(ec.ts(), 2);
        assert_eq!(ec.trusted().rank, 1);

        let (_, effects) = run(|ctx| ec.handle(&trust(2), ctx));
        assert_eq!(announced(&effects), vec![5]);

        let (_, effects) = run(|ctx| ec.handle(&nack_from(3), ctx));
        assert_eq!(announced(&effects), vec![8]);

        let (_, effects) = run(|ctx| ec.handle(&nack_from(1), ctx));
        assert_eq!(announced(&effects), vec![11]);
    }

    #[test]
    fn test_no_two_processes_share_a_timestamp() {
        let n = 4;
        let mut issued = std::collections::HashSet::new();
        for rank in 1..=n {
            let mut ec = EpochChange::new(process(rank), roster(n));
            run(|ctx| ec.handle(&trust(rank), ctx));
            for _ in 0..5 {
                assert!(issued.insert(ec.ts()), "ts {} repetido", ec.ts());
                run(|ctx| ec.handle(&nack_from(1), ctx));
            }
        }
    }

    #[test]
    fn test_trusting_someone_else_does_not_announce() {
        let mut ec = EpochChange::new(process(1), roster(3));
        let (handled, effects) = run(|ctx| ec.handle(&trust(3), ctx));
        assert!(handled);
        assert!(effects.is_empty());

        // NACK quando não sou o líder: consumido sem efeito
        let (handled, effects) = run(|ctx| ec.handle(&nack_from(3), ctx));
        assert!(handled);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_new_epoch_gating() {
        let mut ec = EpochChange::new(process(1), roster(3));
        run(|ctx| ec.handle(&trust(3), ctx));

        let (_, effects) = run(|ctx| ec.handle(&new_epoch_from(3, 6), ctx));
        assert_eq!(started(&effects), vec![(6, 3)]);
        assert_eq!(ec.last_ts(), 6);

        // timestamp não maior que last_ts
        let (_, effects) = run(|ctx| ec.handle(&new_epoch_from(3, 6), ctx));
        assert!(started(&effects).is_empty());
        let sends = pl_sends(&effects);
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].0, 5003);
        assert_eq!(sends[0].1.message_type(), MessageType::EcNack);

        // remetente não é o líder confiado
        let (_, effects) = run(|ctx| ec.handle(&new_epoch_from(2, 8), ctx));
        assert!(started(&effects).is_empty());
        assert_eq!(pl_sends(&effects)[0].0, 5002);

        run(|ctx| ec.handle(&trust(2), ctx));
        let (_, effects) = run(|ctx| ec.handle(&new_epoch_from(2, 8), ctx));
        assert_eq!(started(&effects), vec![(8, 2)]);
    }
}
