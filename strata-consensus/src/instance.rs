use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use strata_common::{EpochState, Message, Payload, ProcessId, Result, Roster, StrataError, Timestamp, Value};
use tracing::debug;

use crate::config::RuntimeConfig;
use crate::effects::{Context, Effects, Outbound, Timer};
use crate::layers::{App, Layer};
use crate::HubAddress;

#[derive(Debug)]
struct Queued {
    message: Message,
    enqueued_at: Instant,
}

/// What one dispatch pass produced for the driver.
#[derive(Debug, Default)]
pub struct PassReport {
    pub handled: usize,
    pub dropped: usize,
    pub outbound: Vec<Outbound>,
    pub timers: Vec<Timer>,
}

/// Núcleo síncrono de uma instância de consenso (um `system_id`).
///
/// Guarda o roster, a lista ordenada de camadas e a fila FIFO de eventos.
/// Cada mensagem da fila é oferecida a todas as camadas e sai da fila
/// quando pelo menos uma a tratou.
#[derive(Debug)]
pub struct ConsensusInstance {
    system_id: String,
    me: ProcessId,
    roster: Arc<Roster>,
    config: RuntimeConfig,
    layers: Vec<Layer>,
    queue: VecDeque<Queued>,
    pending_outbound: Vec<Outbound>,
    pending_timers: Vec<Timer>,
}

impl ConsensusInstance {
    /// Configures the roster and registers the application layer.
    ///
    /// `local_port` must belong to the roster: it is how this process finds
    /// its own identity and rank.
    pub fn new(
        system_id: impl Into<String>,
        local_port: u16,
        processes: Vec<ProcessId>,
        hub: Option<HubAddress>,
        config: RuntimeConfig,
    ) -> Result<Self> {
        let system_id = system_id.into();
        let roster = Arc::new(Roster::new(processes)?);
        let me = roster
            .by_port(local_port)
            .cloned()
            .ok_or_else(|| StrataError::Roster(format!("porta local {local_port} fora do roster de {system_id}")))?;

        let mut instance = Self {
            system_id,
            me: me.clone(),
            roster: Arc::clone(&roster),
            config,
            layers: Vec::new(),
            queue: VecDeque::new(),
            pending_outbound: Vec::new(),
            pending_timers: Vec::new(),
        };
        instance.push_layer(Layer::App(App::new(me, roster, hub, config.delta)));
        Ok(instance)
    }

    /// Builds the instance named by an `APP_PROPOSE` and enqueues the proposal.
    pub fn from_proposal(
        proposal: &Message,
        local_port: u16,
        hub: Option<HubAddress>,
        config: RuntimeConfig,
    ) -> Result<Self> {
        let Payload::AppPropose { processes, .. } = &proposal.payload else {
            return Err(StrataError::Consensus(format!("esperava APP_PROPOSE, veio {}", proposal.message_type())));
        };

        let mut instance = Self::new(proposal.system_id.clone(), local_port, processes.clone(), hub, config)?;
        instance.trigger(proposal.clone());
        Ok(instance)
    }

    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    pub fn me(&self) -> &ProcessId {
        &self.me
    }

    pub fn roster(&self) -> &Arc<Roster> {
        &self.roster
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Outbound frames or timers produced outside a pass, waiting for the driver.
    pub fn has_pending_effects(&self) -> bool {
        !self.pending_outbound.is_empty() || !self.pending_timers.is_empty()
    }

    /// Registers a layer and runs its start hook.
    pub fn push_layer(&mut self, layer: Layer) {
        let mut report = PassReport::default();
        let mut effects = Effects::default();
        effects.layers.push(layer);
        self.apply(effects, Instant::now(), &mut report);
        self.pending_outbound.append(&mut report.outbound);
        self.pending_timers.append(&mut report.timers);
    }

    pub fn trigger(&mut self, message: Message) {
        self.trigger_at(message, Instant::now());
    }

    /// Enqueues a message as if it arrived at `now`, stamping the instance id.
    pub fn trigger_at(&mut self, message: Message, now: Instant) {
        let message = message.with_system_id(self.system_id.clone());
        self.queue.push_back(Queued {
            message,
            enqueued_at: now,
        });
    }

    /// One pass over the messages queued when the pass began.
    ///
    /// Messages produced during the pass wait for the next one. An
    /// unhandled message goes back to the queue unless it has been waiting
    /// longer than the configured retention.
    pub fn run_pass(&mut self, now: Instant) -> PassReport {
        let mut report = PassReport {
            outbound: std::mem::take(&mut self.pending_outbound),
            timers: std::mem::take(&mut self.pending_timers),
            ..PassReport::default()
        };

        let pending = self.queue.len();
        for _ in 0..pending {
            let Some(queued) = self.queue.pop_front() else {
                break;
            };

            let mut effects = Effects::default();
            let mut handled = false;
            {
                let mut ctx = Context::new(&self.system_id, &mut effects);
                for layer in self.layers.iter_mut() {
                    handled |= layer.handle(&queued.message, &mut ctx);
                }
            }

            if handled {
                report.handled += 1;
            } else if self.expired(&queued, now) {
                report.dropped += 1;
                debug!(
                    "🗑️ [{}] {} sem handler há mais de {:?}, descartando",
                    self.system_id, queued.message, self.config.unhandled_retention
                );
            } else {
                self.queue.push_back(queued);
            }

            self.apply(effects, now, &mut report);
        }

        report
    }

    fn expired(&self, queued: &Queued, now: Instant) -> bool {
        match self.config.unhandled_retention {
            Some(retention) => now.saturating_duration_since(queued.enqueued_at) > retention,
            None => false,
        }
    }

    fn apply(&mut self, effects: Effects, now: Instant, report: &mut PassReport) {
        let Effects {
            triggered,
            outbound,
            timers,
            layers,
        } = effects;

        for message in triggered {
            self.trigger_at(message, now);
        }
        report.outbound.extend(outbound);
        report.timers.extend(timers);

        let mut spawned: VecDeque<Layer> = layers.into();
        while let Some(mut layer) = spawned.pop_front() {
            let mut started = Effects::default();
            {
                let mut ctx = Context::new(&self.system_id, &mut started);
                layer.on_start(&mut ctx);
            }
            debug!("🧩 [{}] camada {} registrada", self.system_id, layer.name());
            self.layers.push(layer);

            for message in started.triggered {
                self.trigger_at(message, now);
            }
            report.outbound.extend(started.outbound);
            report.timers.extend(started.timers);
            spawned.extend(started.layers);
        }
    }

    fn uc(&self) -> Option<&crate::layers::UniformConsensus> {
        self.layers.iter().find_map(|l| match l {
            Layer::UniformConsensus(uc) => Some(uc),
            _ => None,
        })
    }

    pub fn decision(&self) -> Option<Value> {
        self.uc().and_then(|uc| uc.decision())
    }

    /// Epoch the uniform consensus driver is currently running.
    pub fn current_epoch(&self) -> Option<Timestamp> {
        self.uc().map(|uc| uc.ets())
    }

    /// Leader of the current epoch, as seen by the consensus driver.
    pub fn epoch_leader(&self) -> Option<&ProcessId> {
        self.uc().map(|uc| uc.leader())
    }

    /// Leader currently trusted by the leader detector.
    pub fn trusted_leader(&self) -> Option<&ProcessId> {
        self.layers.iter().find_map(|l| match l {
            Layer::Eld(eld) => eld.leader(),
            _ => None,
        })
    }

    /// Ports currently suspected by the failure detector, sorted.
    pub fn suspected(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self
            .layers
            .iter()
            .find_map(|l| match l {
                Layer::Epfd(epfd) => Some(epfd.suspected().iter().copied().collect()),
                _ => None,
            })
            .unwrap_or_default();
        ports.sort_unstable();
        ports
    }

    /// State held by the epoch consensus instance of epoch `ets`.
    pub fn epoch_state(&self, ets: Timestamp) -> Option<EpochState> {
        self.layers.iter().find_map(|l| match l {
            Layer::EpochConsensus(ep) if ep.ets() == ets => Some(ep.state()),
            _ => None,
        })
    }

    /// Number of epoch consensus instances registered, retired ones included.
    pub fn epoch_instances(&self) -> usize {
        self.layers
            .iter()
            .filter(|l| matches!(l, Layer::EpochConsensus(_)))
            .count()
    }
}
