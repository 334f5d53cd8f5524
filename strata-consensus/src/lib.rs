//! Pilha de consenso uniforme em camadas.
//!
//! Cada instância (um `system_id`) tem a sua fila de eventos e o seu
//! conjunto de camadas. As camadas são síncronas e não fazem I/O: registram
//! efeitos que o driver executa.

pub mod config;
pub mod driver;
pub mod effects;
pub mod instance;
pub mod layers;

pub use config::RuntimeConfig;
pub use driver::{spawn_instance, InstanceHandle};
pub use effects::{Context, Effects, Outbound, Timer};
pub use instance::{ConsensusInstance, PassReport};
pub use layers::{app::HubAddress, Layer};
