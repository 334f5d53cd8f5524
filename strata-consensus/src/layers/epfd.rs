use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use strata_common::{abstraction, Message, Payload, Roster};
use tracing::{debug, info};

use crate::effects::Context;

/// Heartbeat-based eventually perfect failure detector.
///
/// Each timeout suspects whoever stayed silent for a whole round and
/// restores whoever answered while suspected. A restore means the delay
/// was too short, so it grows by Δ.
#[derive(Debug)]
pub struct EventuallyPerfectFailureDetector {
    roster: Arc<Roster>,
    delta: Duration,
    delay: Duration,
    alive: HashSet<u16>,
    suspected: HashSet<u16>,
}

impl EventuallyPerfectFailureDetector {
    pub fn new(roster: Arc<Roster>, delta: Duration) -> Self {
        Self {
            roster,
            delta,
            delay: delta,
            alive: HashSet::new(),
            suspected: HashSet::new(),
        }
    }

    pub fn on_start(&mut self, ctx: &mut Context<'_>) {
        self.alive = self.roster.iter().map(|p| p.port).collect();
        self.suspected.clear();
        self.delay = self.delta;
        ctx.schedule(self.delay, Message::new(abstraction::EPFD, Payload::EpfdTimeout));
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn suspected(&self) -> &HashSet<u16> {
        &self.suspected
    }

    pub fn handle(&mut self, message: &Message, ctx: &mut Context<'_>) -> bool {
        match &message.payload {
            Payload::EpfdTimeout if message.abstraction_id == abstraction::EPFD => {
                self.on_timeout(ctx);
                true
            }
            Payload::PlDeliver { sender, message: inner } if message.abstraction_id == abstraction::EPFD => {
                match inner.payload {
                    Payload::EpfdHeartbeatRequest => {
                        let reply = Message::new(abstraction::EPFD, Payload::EpfdHeartbeatReply);
                        ctx.trigger(Message::pl_send(abstraction::EPFD, sender.clone(), reply));
                        true
                    }
                    Payload::EpfdHeartbeatReply => {
                        self.alive.insert(sender.port);
                        true
                    }
                    _ => false,
                }
            }
            _ => false,
        }
    }

    fn on_timeout(&mut self, ctx: &mut Context<'_>) {
        if self.alive.intersection(&self.suspected).next().is_some() {
            self.delay += self.delta;
            debug!("⏱️ [{}] EPFD delay aumentado para {:?}", ctx.system_id(), self.delay);
        }

        for process in self.roster.iter() {
            let alive = self.alive.contains(&process.port);
            let suspected = self.suspected.contains(&process.port);

            if !alive && !suspected {
                self.suspected.insert(process.port);
                info!(target: "consensus", "EVENT:EPFD_SUSPECT system={} port={} rank={}", ctx.system_id(), process.port, process.rank);
                ctx.trigger(Message::new(
                    abstraction::EPFD,
                    Payload::EpfdSuspect {
                        process: process.clone(),
                    },
                ));
            } else if alive && suspected {
                self.suspected.remove(&process.port);
                info!(target: "consensus", "EVENT:EPFD_RESTORE system={} port={} rank={}", ctx.system_id(), process.port, process.rank);
                ctx.trigger(Message::new(
                    abstraction::EPFD,
                    Payload::EpfdRestore {
                        process: process.clone(),
                    },
                ));
            }

            let request = Message::new(abstraction::EPFD, Payload::EpfdHeartbeatRequest);
            ctx.trigger(Message::pl_send(abstraction::EPFD, process.clone(), request));
        }

        self.alive.clear();
        ctx.schedule(self.delay, Message::new(abstraction::EPFD, Payload::EpfdTimeout));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::testing::{pl_deliver, pl_sends, process, roster, run};
    use strata_common::MessageType;

    const DELTA: Duration = Duration::from_millis(100);

    fn timeout() -> Message {
        Message::new(abstraction::EPFD, Payload::EpfdTimeout)
    }

    fn reply_from(rank: u32) -> Message {
        pl_deliver(
            abstraction::EPFD,
            process(rank),
            Message::new(abstraction::EPFD, Payload::EpfdHeartbeatReply),
        )
    }

    fn kinds(effects: &crate::effects::Effects, kind: MessageType) -> Vec<u32> {
        effects
            .triggered
            .iter()
            .filter(|m| m.message_type() == kind)
            .filter_map(|m| match &m.payload {
                Payload::EpfdSuspect { process } | Payload::EpfdRestore { process } => Some(process.rank),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_start_schedules_first_timeout() {
        let mut epfd = EventuallyPerfectFailureDetector::new(roster(3), DELTA);
        let (_, effects) = run(|ctx| {
            epfd.on_start(ctx);
            true
        });
        assert_eq!(effects.timers.len(), 1);
        assert_eq!(effects.timers[0].delay, DELTA);
    }

    #[test]
    fn test_silent_process_is_suspected_then_restored() {
        let mut epfd = EventuallyPerfectFailureDetector::new(roster(3), DELTA);
        run(|ctx| {
            epfd.on_start(ctx);
            true
        });

        // primeira rodada: todos vivos desde o start
        let (_, effects) = run(|ctx| epfd.handle(&timeout(), ctx));
        assert!(kinds(&effects, MessageType::EpfdSuspect).is_empty());
        assert_eq!(pl_sends(&effects).len(), 3);

        // só 1 e 2 respondem
        run(|ctx| epfd.handle(&reply_from(1), ctx));
        run(|ctx| epfd.handle(&reply_from(2), ctx));
        let (_, effects) = run(|ctx| epfd.handle(&timeout(), ctx));
        assert_eq!(kinds(&effects, MessageType::EpfdSuspect), vec![3]);
        assert_eq!(epfd.delay(), DELTA);

        // 3 volta: restore e backoff
        for rank in 1..=3 {
            run(|ctx| epfd.handle(&reply_from(rank), ctx));
        }
        let (_, effects) = run(|ctx| epfd.handle(&timeout(), ctx));
        assert_eq!(kinds(&effects, MessageType::EpfdRestore), vec![3]);
        assert_eq!(epfd.delay(), DELTA * 2);
        assert!(epfd.suspected().is_empty());
        assert_eq!(effects.timers[0].delay, DELTA * 2);
    }

    #[test]
    fn test_suspect_is_emitted_once() {
        let mut epfd = EventuallyPerfectFailureDetector::new(roster(2), DELTA);
        run(|ctx| {
            epfd.on_start(ctx);
            true
        });
        run(|ctx| epfd.handle(&timeout(), ctx));

        run(|ctx| epfd.handle(&reply_from(1), ctx));
        let (_, first) = run(|ctx| epfd.handle(&timeout(), ctx));
        run(|ctx| epfd.handle(&reply_from(1), ctx));
        let (_, second) = run(|ctx| epfd.handle(&timeout(), ctx));

        assert_eq!(kinds(&first, MessageType::EpfdSuspect), vec![2]);
        assert!(kinds(&second, MessageType::EpfdSuspect).is_empty());
    }

    #[test]
    fn test_request_gets_reply() {
        let mut epfd = EventuallyPerfectFailureDetector::new(roster(3), DELTA);
        let request = pl_deliver(
            abstraction::EPFD,
            process(2),
            Message::new(abstraction::EPFD, Payload::EpfdHeartbeatRequest),
        );

        let (handled, effects) = run(|ctx| epfd.handle(&request, ctx));

        assert!(handled);
        let sends = pl_sends(&effects);
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].0, 5002);
        assert_eq!(sends[0].1.message_type(), MessageType::EpfdHeartbeatReply);
    }
}
