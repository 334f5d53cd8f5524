//! Transporte ponto a ponto do strata.
//!
//! Frames com prefixo de tamanho (u32 big-endian) e corpo bincode, um
//! transporte TCP real e uma rede em memória usada nos testes.

pub mod codec;
pub mod error;
pub mod in_memory;
pub mod tcp;
pub mod transport;

pub use error::NetworkError;
pub use in_memory::{InMemoryNetwork, InMemoryTransport};
pub use tcp::{listen, TcpTransport};
pub use transport::Transport;
