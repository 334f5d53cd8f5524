use std::time::Duration;

use strata_common::Message;

use crate::layers::Layer;

/// A frame the driver must hand to the transport.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub host: String,
    pub port: u16,
    pub message: Message,
}

/// A message to be enqueued back into the instance after `delay`.
#[derive(Debug, Clone)]
pub struct Timer {
    pub delay: Duration,
    pub message: Message,
}

/// Everything a layer asked for while handling one message.
#[derive(Debug, Default)]
pub struct Effects {
    pub triggered: Vec<Message>,
    pub outbound: Vec<Outbound>,
    pub timers: Vec<Timer>,
    pub layers: Vec<Layer>,
}

impl Effects {
    pub fn is_empty(&self) -> bool {
        self.triggered.is_empty() && self.outbound.is_empty() && self.timers.is_empty() && self.layers.is_empty()
    }
}

/// O que uma camada enxerga da instância durante o `handle`.
///
/// Toda mensagem que sai pelo contexto leva o `system_id` da instância.
pub struct Context<'a> {
    system_id: &'a str,
    effects: &'a mut Effects,
}

impl<'a> Context<'a> {
    pub fn new(system_id: &'a str, effects: &'a mut Effects) -> Self {
        Self { system_id, effects }
    }

    pub fn system_id(&self) -> &str {
        self.system_id
    }

    /// Enqueues a message on this instance's own event bus.
    pub fn trigger(&mut self, message: Message) {
        let message = message.with_system_id(self.system_id);
        self.effects.triggered.push(message);
    }

    pub fn send(&mut self, host: impl Into<String>, port: u16, message: Message) {
        let message = message.with_system_id(self.system_id);
        self.effects.outbound.push(Outbound {
            host: host.into(),
            port,
            message,
        });
    }

    pub fn schedule(&mut self, delay: Duration, message: Message) {
        let message = message.with_system_id(self.system_id);
        self.effects.timers.push(Timer { delay, message });
    }

    pub fn push_layer(&mut self, layer: Layer) {
        self.effects.layers.push(layer);
    }
}
