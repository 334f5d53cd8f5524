//! Tipos compartilhados por todas as camadas do strata.
//!
//! Identidade de processos, roster, valores, estados de época e o envelope
//! de mensagens que circula pelo event bus de cada instância de consenso.

pub mod abstraction;
pub mod error;
pub mod message;
pub mod process;
pub mod value;

pub use error::{Result, StrataError};
pub use message::{Message, MessageType, Payload};
pub use process::{ProcessId, Roster};
pub use value::{EpochState, Timestamp, Value};
