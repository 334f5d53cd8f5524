use std::collections::HashSet;
use std::sync::Arc;

use strata_common::{abstraction, Message, Payload, ProcessId, Roster};

use crate::effects::Context;

/// Detector de líder monárquico: o processo de maior rank não suspeito.
#[derive(Debug)]
pub struct EventualLeaderDetector {
    roster: Arc<Roster>,
    suspected: HashSet<u16>,
    leader: Option<ProcessId>,
}

impl EventualLeaderDetector {
    pub fn new(roster: Arc<Roster>) -> Self {
        Self {
            roster,
            suspected: HashSet::new(),
            leader: None,
        }
    }

    pub fn on_start(&mut self, ctx: &mut Context<'_>) {
        self.suspected.clear();
        self.leader = None;
        self.update_leader(ctx);
    }

    pub fn leader(&self) -> Option<&ProcessId> {
        self.leader.as_ref()
    }

    pub fn handle(&mut self, message: &Message, ctx: &mut Context<'_>) -> bool {
        match &message.payload {
            Payload::EpfdSuspect { process } => {
                self.suspected.insert(process.port);
                self.update_leader(ctx);
                true
            }
            Payload::EpfdRestore { process } => {
                self.suspected.remove(&process.port);
                self.update_leader(ctx);
                true
            }
            _ => false,
        }
    }

    fn update_leader(&mut self, ctx: &mut Context<'_>) {
        // Sem elegíveis, mantém o último líder conhecido.
        let Some(candidate) = self
            .roster
            .iter()
            .filter(|p| !self.suspected.contains(&p.port))
            .max_by_key(|p| p.rank)
        else {
            return;
        };

        if self.leader.as_ref().map(|l| l.rank) == Some(candidate.rank) {
            return;
        }

        self.leader = Some(candidate.clone());
        tracing::info!(target: "consensus", "EVENT:ELD_TRUST system={} leader={} port={}", ctx.system_id(), candidate.rank, candidate.port);
        ctx.trigger(Message::new(
            abstraction::ELD,
            Payload::EldTrust {
                process: candidate.clone(),
            },
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::Effects;
    use crate::layers::testing::{process, roster, run};

    fn trusted(effects: &Effects) -> Vec<u32> {
        effects
            .triggered
            .iter()
            .filter_map(|m| match &m.payload {
                Payload::EldTrust { process } => Some(process.rank),
                _ => None,
            })
            .collect()
    }

    fn suspect(rank: u32) -> Message {
        Message::new(abstraction::EPFD, Payload::EpfdSuspect { process: process(rank) })
    }

    fn restore(rank: u32) -> Message {
        Message::new(abstraction::EPFD, Payload::EpfdRestore { process: process(rank) })
    }

    #[test]
    fn test_initial_leader_is_highest_rank() {
        let mut eld = EventualLeaderDetector::new(roster(3));
        let (_, effects) = run(|ctx| {
            eld.on_start(ctx);
            true
        });
        assert_eq!(trusted(&effects), vec![3]);
    }

    #[test]
    fn test_leader_follows_suspicions() {
        let mut eld = EventualLeaderDetector::new(roster(3));
        run(|ctx| {
            eld.on_start(ctx);
            true
        });

        let (_, effects) = run(|ctx| eld.handle(&suspect(3), ctx));
        assert_eq!(trusted(&effects), vec![2]);

        // suspeitar alguém abaixo do líder não muda nada
        let (handled, effects) = run(|ctx| eld.handle(&suspect(1), ctx));
        assert!(handled);
        assert!(trusted(&effects).is_empty());

        let (_, effects) = run(|ctx| eld.handle(&restore(3), ctx));
        assert_eq!(trusted(&effects), vec![3]);
    }

    #[test]
    fn test_everyone_suspected_keeps_last_leader() {
        let mut eld = EventualLeaderDetector::new(roster(2));
        run(|ctx| {
            eld.on_start(ctx);
            true
        });
        run(|ctx| eld.handle(&suspect(2), ctx));
        let (_, effects) = run(|ctx| eld.handle(&suspect(1), ctx));

        assert!(trusted(&effects).is_empty());
        assert_eq!(eld.leader().map(|p| p.rank), Some(1));
    }
}
