use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strata_common::{abstraction, Message, Payload, ProcessId, Roster};
use tracing::{debug, info};

use crate::effects::Context;
use crate::layers::{
    BestEffortBroadcast, EpochChange, EventualLeaderDetector, EventuallyPerfectFailureDetector, Layer, PerfectLink,
    UniformConsensus,
};

/// Endereço do hub que recebe os `APP_DECIDE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubAddress {
    pub host: String,
    pub port: u16,
}

impl HubAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

/// Application end of the instance.
///
/// The first `APP_PROPOSE` builds the protocol stack; every proposal then
/// becomes a `UC_PROPOSE`, and the decision goes back to the hub.
#[derive(Debug)]
pub struct App {
    me: ProcessId,
    roster: Arc<Roster>,
    hub: Option<HubAddress>,
    delta: Duration,
    started: bool,
}

impl App {
    pub fn new(me: ProcessId, roster: Arc<Roster>, hub: Option<HubAddress>, delta: Duration) -> Self {
        Self {
            me,
            roster,
            hub,
            delta,
            started: false,
        }
    }

    pub fn handle(&mut self, message: &Message, ctx: &mut Context<'_>) -> bool {
        match &message.payload {
            Payload::AppPropose { value, .. } => {
                if !self.started {
                    self.start_stack(ctx);
                }
                info!(target: "consensus", "EVENT:APP_PROPOSE system={} rank={} value={}", ctx.system_id(), self.me.rank, value);
                ctx.trigger(Message::new(abstraction::APP, Payload::UcPropose { value: *value }));
                true
            }
            Payload::UcDecide { value } => {
                info!("📣 [{}] rank {} decidiu {}", ctx.system_id(), self.me.rank, value);
                match &self.hub {
                    Some(hub) => {
                        let decide = Message::new(abstraction::APP, Payload::AppDecide { value: *value });
                        ctx.send(hub.host.clone(), hub.port, decide);
                    }
                    None => debug!("sem hub configurado, decisão fica local"),
                }
                true
            }
            _ => false,
        }
    }

    fn start_stack(&mut self, ctx: &mut Context<'_>) {
        self.started = true;
        debug!(
            "🧱 [{}] montando pilha para rank {} com {} processos",
            ctx.system_id(),
            self.me.rank,
            self.roster.len()
        );

        let roster = &self.roster;
        ctx.push_layer(Layer::PerfectLink(PerfectLink::new(Arc::clone(roster))));
        ctx.push_layer(Layer::Beb(BestEffortBroadcast::new(Arc::clone(roster))));
        ctx.push_layer(Layer::Epfd(EventuallyPerfectFailureDetector::new(
            Arc::clone(roster),
            self.delta,
        )));
        ctx.push_layer(Layer::Eld(EventualLeaderDetector::new(Arc::clone(roster))));
        ctx.push_layer(Layer::EpochChange(EpochChange::new(self.me.clone(), Arc::clone(roster))));
        ctx.push_layer(Layer::UniformConsensus(UniformConsensus::new(
            self.me.clone(),
            Arc::clone(roster),
        )));
    }
}
