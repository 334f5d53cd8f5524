use std::fmt;

use serde::{Deserialize, Serialize};

use crate::process::ProcessId;
use crate::value::{Timestamp, Value};

/// Envelope that flows through an instance's event queue and over the wire.
///
/// `abstraction_id` names the layer that produced the message; for
/// `EP_*` traffic it is the `ep.<ets>` id of the originating epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub system_id: String,
    pub abstraction_id: String,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    // Aplicação / hub
    AppRegistration { owner: String, index: u32 },
    AppPropose { value: Value, processes: Vec<ProcessId> },
    AppDecide { value: Value },

    // Uniform consensus
    UcPropose { value: Value },
    UcDecide { value: Value },

    // Perfect link
    PlSend { destination: ProcessId, message: Box<Message> },
    PlDeliver { sender: ProcessId, message: Box<Message> },

    // Best-effort broadcast
    BebBroadcast { message: Box<Message> },
    BebDeliver { sender: ProcessId, message: Box<Message> },

    // Eventually perfect failure detector
    EpfdTimeout,
    EpfdHeartbeatRequest,
    EpfdHeartbeatReply,
    EpfdSuspect { process: ProcessId },
    EpfdRestore { process: ProcessId },

    // Eventual leader detector
    EldTrust { process: ProcessId },

    // Epoch change
    EcNewEpoch { timestamp: Timestamp },
    EcNack,
    EcStartEpoch { new_timestamp: Timestamp, new_leader: ProcessId },

    // Epoch consensus
    EpPropose { value: Value },
    EpRead,
    EpState { value_timestamp: Timestamp, value: Value },
    EpWrite { value: Value },
    EpAccept,
    EpDecided { value: Value },
    EpDecide { ets: Timestamp, value: Value },
    EpAbort,
    EpAborted { ets: Timestamp, value_timestamp: Timestamp, value: Value },

    // Entrada vinda da rede
    NetworkMessage { sender_host: String, sender_listening_port: u16, message: Box<Message> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    AppRegistration,
    AppPropose,
    AppDecide,
    UcPropose,
    UcDecide,
    PlSend,
    PlDeliver,
    BebBroadcast,
    BebDeliver,
    EpfdTimeout,
    EpfdHeartbeatRequest,
    EpfdHeartbeatReply,
    EpfdSuspect,
    EpfdRestore,
    EldTrust,
    EcNewEpoch,
    EcNack,
    EcStartEpoch,
    EpPropose,
    EpRead,
    EpState,
    EpWrite,
    EpAccept,
    EpDecided,
    EpDecide,
    EpAbort,
    EpAborted,
    NetworkMessage,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::AppRegistration => "APP_REGISTRATION",
            MessageType::AppPropose => "APP_PROPOSE",
            MessageType::AppDecide => "APP_DECIDE",
            MessageType::UcPropose => "UC_PROPOSE",
            MessageType::UcDecide => "UC_DECIDE",
            MessageType::PlSend => "PL_SEND",
            MessageType::PlDeliver => "PL_DELIVER",
            MessageType::BebBroadcast => "BEB_BROADCAST",
            MessageType::BebDeliver => "BEB_DELIVER",
            MessageType::EpfdTimeout => "EPFD_TIMEOUT",
            MessageType::EpfdHeartbeatRequest => "EPFD_HEARTBEAT_REQUEST",
            MessageType::EpfdHeartbeatReply => "EPFD_HEARTBEAT_REPLY",
            MessageType::EpfdSuspect => "EPFD_SUSPECT",
            MessageType::EpfdRestore => "EPFD_RESTORE",
            MessageType::EldTrust => "ELD_TRUST",
            MessageType::EcNewEpoch => "EC_NEW_EPOCH",
            MessageType::EcNack => "EC_NACK",
            MessageType::EcStartEpoch => "EC_START_EPOCH",
            MessageType::EpPropose => "EP_PROPOSE",
            MessageType::EpRead => "EP_READ",
            MessageType::EpState => "EP_STATE",
            MessageType::EpWrite => "EP_WRITE",
            MessageType::EpAccept => "EP_ACCEPT",
            MessageType::EpDecided => "EP_DECIDED",
            MessageType::EpDecide => "EP_DECIDE",
            MessageType::EpAbort => "EP_ABORT",
            MessageType::EpAborted => "EP_ABORTED",
            MessageType::NetworkMessage => "NETWORK_MESSAGE",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Payload {
    pub fn message_type(&self) -> MessageType {
        match self {
            Payload::AppRegistration { .. } => MessageType::AppRegistration,
            Payload::AppPropose { .. } => MessageType::AppPropose,
            Payload::AppDecide { .. } => MessageType::AppDecide,
            Payload::UcPropose { .. } => MessageType::UcPropose,
            Payload::UcDecide { .. } => MessageType::UcDecide,
            Payload::PlSend { .. } => MessageType::PlSend,
            Payload::PlDeliver { .. } => MessageType::PlDeliver,
            Payload::BebBroadcast { .. } => MessageType::BebBroadcast,
            Payload::BebDeliver { .. } => MessageType::BebDeliver,
            Payload::EpfdTimeout => MessageType::EpfdTimeout,
            Payload::EpfdHeartbeatRequest => MessageType::EpfdHeartbeatRequest,
            Payload::EpfdHeartbeatReply => MessageType::EpfdHeartbeatReply,
            Payload::EpfdSuspect { .. } => MessageType::EpfdSuspect,
            Payload::EpfdRestore { .. } => MessageType::EpfdRestore,
            Payload::EldTrust { .. } => MessageType::EldTrust,
            Payload::EcNewEpoch { .. } => MessageType::EcNewEpoch,
            Payload::EcNack => MessageType::EcNack,
            Payload::EcStartEpoch { .. } => MessageType::EcStartEpoch,
            Payload::EpPropose { .. } => MessageType::EpPropose,
            Payload::EpRead => MessageType::EpRead,
            Payload::EpState { .. } => MessageType::EpState,
            Payload::EpWrite { .. } => MessageType::EpWrite,
            Payload::EpAccept => MessageType::EpAccept,
            Payload::EpDecided { .. } => MessageType::EpDecided,
            Payload::EpDecide { .. } => MessageType::EpDecide,
            Payload::EpAbort => MessageType::EpAbort,
            Payload::EpAborted { .. } => MessageType::EpAborted,
            Payload::NetworkMessage { .. } => MessageType::NetworkMessage,
        }
    }
}

impl Message {
    /// New message with an empty system id; the instance stamps it on trigger.
    pub fn new(abstraction_id: impl Into<String>, payload: Payload) -> Self {
        Self {
            system_id: String::new(),
            abstraction_id: abstraction_id.into(),
            payload,
        }
    }

    pub fn with_system_id(mut self, system_id: impl Into<String>) -> Self {
        self.system_id = system_id.into();
        self
    }

    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }

    pub fn pl_send(abstraction_id: impl Into<String>, destination: ProcessId, inner: Message) -> Self {
        Self::new(
            abstraction_id,
            Payload::PlSend {
                destination,
                message: Box::new(inner),
            },
        )
    }

    pub fn beb_broadcast(abstraction_id: impl Into<String>, inner: Message) -> Self {
        Self::new(abstraction_id, Payload::BebBroadcast { message: Box::new(inner) })
    }

    /// Inner message of a wrapper payload, if any.
    pub fn inner(&self) -> Option<&Message> {
        match &self.payload {
            Payload::PlSend { message, .. }
            | Payload::PlDeliver { message, .. }
            | Payload::BebBroadcast { message }
            | Payload::BebDeliver { message, .. }
            | Payload::NetworkMessage { message, .. } => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.message_type(), self.abstraction_id)?;
        if let Some(inner) = self.inner() {
            write!(f, " <{inner}>")?;
        }
        Ok(())
    }
}
