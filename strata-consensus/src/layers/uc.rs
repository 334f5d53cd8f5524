use std::sync::Arc;

use strata_common::{abstraction, EpochState, Message, Payload, ProcessId, Roster, Timestamp, Value};
use tracing::info;

use crate::effects::Context;
use crate::layers::{EpochConsensus, Layer};

/// Consenso uniforme: encadeia instâncias de EP, uma por época.
#[derive(Debug)]
pub struct UniformConsensus {
    me: ProcessId,
    roster: Arc<Roster>,
    val: Value,
    proposed: bool,
    decided: Option<Value>,
    ets: Timestamp,
    leader: ProcessId,
    new_ts: Timestamp,
    new_leader: ProcessId,
}

impl UniformConsensus {
    pub fn new(me: ProcessId, roster: Arc<Roster>) -> Self {
        let leader = roster.min_rank().clone();
        Self {
            me,
            roster,
            val: Value::undefined(),
            proposed: false,
            decided: None,
            ets: 0,
            new_ts: 0,
            new_leader: leader.clone(),
            leader,
        }
    }

    /// Starts epoch 0 under the lowest ranked process.
    pub fn on_start(&mut self, ctx: &mut Context<'_>) {
        ctx.push_layer(Layer::EpochConsensus(EpochConsensus::new(
            self.ets,
            self.leader.clone(),
            EpochState::default(),
            Arc::clone(&self.roster),
        )));
    }

    pub fn decision(&self) -> Option<Value> {
        self.decided
    }

    pub fn ets(&self) -> Timestamp {
        self.ets
    }

    pub fn leader(&self) -> &ProcessId {
        &self.leader
    }

    pub fn handle(&mut self, message: &Message, ctx: &mut Context<'_>) -> bool {
        match &message.payload {
            Payload::UcPropose { value } => {
                self.val = *value;
                self.try_propose(ctx);
                true
            }
            Payload::EcStartEpoch {
                new_timestamp,
                new_leader,
            } => {
                self.new_ts = *new_timestamp;
                self.new_leader = new_leader.clone();
                ctx.trigger(Message::new(abstraction::ep(self.ets), Payload::EpAbort));
                true
            }
            Payload::EpAborted {
                ets,
                value_timestamp,
                value,
            } if *ets == self.ets => {
                self.ets = self.new_ts;
                self.leader = self.new_leader.clone();
                self.proposed = false;
                ctx.push_layer(Layer::EpochConsensus(EpochConsensus::new(
                    self.ets,
                    self.leader.clone(),
                    EpochState::new(*value_timestamp, *value),
                    Arc::clone(&self.roster),
                )));
                self.try_propose(ctx);
                true
            }
            Payload::EpDecide { ets, value } if *ets == self.ets => {
                if self.decided.is_none() {
                    self.decided = Some(*value);
                    info!("🎯 [{}] decidido {} na época {}", ctx.system_id(), value, ets);
                    info!(target: "consensus", "EVENT:UC_DECIDE system={} value={} ets={}", ctx.system_id(), value, ets);
                    ctx.trigger(Message::new(abstraction::UC, Payload::UcDecide { value: *value }));
                }
                true
            }
            _ => false,
        }
    }

    fn try_propose(&mut self, ctx: &mut Context<'_>) {
        if self.leader == self.me && self.val.is_defined() && !self.proposed {
            self.proposed = true;
            ctx.trigger(Message::new(abstraction::ep(self.ets), Payload::EpPropose { value: self.val }));
        }
    }
}
