//! Deterministic simulation of a cluster of instances.
//!
//! Drives several `ConsensusInstance` cores in lock step over a fake network
//! that uses the real wire codec. Time is virtual: timers only fire once
//! nothing else can make progress, so message delays never exceed a timeout
//! unless a test drops or crashes something on purpose.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use strata_common::{abstraction, Message, Payload, ProcessId, Value};
use strata_consensus::{ConsensusInstance, RuntimeConfig};
use strata_p2p::codec::{decode_frame, encode_frame, envelope};

pub const SYSTEM: &str = "sim-1";
const HOST: &str = "127.0.0.1";
const MAX_ROUNDS: usize = 100_000;

type DropFilter = Box<dyn FnMut(u16, u16, &Message) -> bool>;

pub fn port(rank: u32) -> u16 {
    5000 + rank as u16
}

pub struct Cluster {
    processes: Vec<ProcessId>,
    instances: BTreeMap<u16, ConsensusInstance>,
    network: VecDeque<(u16, Message)>,
    timers: Vec<(Duration, u16, Message)>,
    crashed: HashSet<u16>,
    filter: Option<DropFilter>,
    config: RuntimeConfig,
    base: Instant,
    clock: Duration,
}

impl Cluster {
    pub fn new(n: u32) -> Self {
        let processes = (1..=n)
            .map(|rank| ProcessId::new(HOST, port(rank), "sim", rank, rank))
            .collect();
        Self {
            processes,
            instances: BTreeMap::new(),
            network: VecDeque::new(),
            timers: Vec::new(),
            crashed: HashSet::new(),
            filter: None,
            config: RuntimeConfig::default(),
            base: Instant::now(),
            clock: Duration::ZERO,
        }
    }

    /// Hands `APP_PROPOSE` to every process; `values[i]` is the proposal of rank `i + 1`.
    pub fn propose(&mut self, values: &[Option<i32>]) {
        assert_eq!(values.len(), self.processes.len());
        for (process, value) in self.processes.clone().iter().zip(values) {
            let proposal = Message::new(
                abstraction::HUB,
                Payload::AppPropose {
                    value: Value::from(*value),
                    processes: self.processes.clone(),
                },
            )
            .with_system_id(SYSTEM);

            let instance = ConsensusInstance::from_proposal(&proposal, process.port, None, self.config)
                .expect("proposal builds an instance");
            self.instances.insert(process.port, instance);
        }
    }

    pub fn crash(&mut self, rank: u32) {
        self.crashed.insert(port(rank));
    }

    /// Drops every network message for which `filter(from, to, envelope)` is true.
    pub fn drop_when(&mut self, filter: impl FnMut(u16, u16, &Message) -> bool + 'static) {
        self.filter = Some(Box::new(filter));
    }

    pub fn clear_filter(&mut self) {
        self.filter = None;
    }

    pub fn elapsed(&self) -> Duration {
        self.clock
    }

    pub fn instance(&self, rank: u32) -> &ConsensusInstance {
        &self.instances[&port(rank)]
    }

    pub fn live_ranks(&self) -> Vec<u32> {
        self.processes
            .iter()
            .filter(|p| !self.crashed.contains(&p.port))
            .map(|p| p.rank)
            .collect()
    }

    pub fn decision(&self, rank: u32) -> Option<Value> {
        self.instance(rank).decision()
    }

    pub fn all_live_decided(&self) -> bool {
        self.live_ranks().into_iter().all(|rank| self.decision(rank).is_some())
    }

    /// Runs lock-step rounds until no process handles anything and the network is empty.
    pub fn run_until_quiet(&mut self) {
        for _ in 0..MAX_ROUNDS {
            if !self.round() {
                return;
            }
        }
        panic!("cluster did not settle after {MAX_ROUNDS} rounds");
    }

    /// Alternates settling and firing timers until `done` holds or `limit` of virtual time passes.
    pub fn run_until(&mut self, limit: Duration, done: impl Fn(&Cluster) -> bool) -> bool {
        loop {
            self.run_until_quiet();
            if done(self) {
                return true;
            }
            if self.clock >= limit || !self.fire_next_timers() {
                return false;
            }
        }
    }

    fn now(&self) -> Instant {
        self.base + self.clock
    }

    fn round(&mut self) -> bool {
        let now = self.now();
        let mut progress = false;
        let mut outgoing = Vec::new();

        for (&from, instance) in self.instances.iter_mut() {
            if self.crashed.contains(&from) {
                continue;
            }
            let report = instance.run_pass(now);
            progress |= report.handled > 0;
            for out in report.outbound {
                outgoing.push((from, out.port, out.message));
            }
            for timer in report.timers {
                self.timers.push((self.clock + timer.delay, from, timer.message));
            }
        }

        for (from, to, message) in outgoing {
            self.transmit(from, to, message);
        }

        progress |= !self.network.is_empty();
        while let Some((to, message)) = self.network.pop_front() {
            if let Some(instance) = self.instances.get_mut(&to) {
                instance.trigger_at(message, now);
            }
        }
        progress
    }

    fn transmit(&mut self, from: u16, to: u16, message: Message) {
        if self.crashed.contains(&from) || self.crashed.contains(&to) {
            return;
        }
        let wrapped = envelope(message, HOST, from);
        let frame = encode_frame(&wrapped).expect("frame encodes");
        let decoded = decode_frame(&frame).expect("frame decodes");

        if let Some(filter) = self.filter.as_mut() {
            if filter(from, to, &decoded) {
                return;
            }
        }
        self.network.push_back((to, decoded));
    }

    fn fire_next_timers(&mut self) -> bool {
        self.timers.retain(|(_, port, _)| !self.crashed.contains(port));
        let Some(next) = self.timers.iter().map(|(at, _, _)| *at).min() else {
            return false;
        };

        self.clock = next;
        let now = self.now();
        let (due, later): (Vec<_>, Vec<_>) = self.timers.drain(..).partition(|(at, _, _)| *at <= next);
        self.timers = later;
        for (_, port, message) in due {
            if let Some(instance) = self.instances.get_mut(&port) {
                instance.trigger_at(message, now);
            }
        }
        true
    }
}

/// True when `envelope` carries an `EP_DECIDED` broadcast.
pub fn is_ep_decided(envelope: &Message) -> bool {
    matches!(
        &envelope.payload,
        Payload::NetworkMessage { message, .. } if matches!(message.payload, Payload::EpDecided { .. })
    )
}
