pub mod cli;
pub mod config;
pub mod hub;
pub mod node;
pub mod setup;
pub mod telemetry;

pub use config::NodeConfig;
pub use hub::{Decision, Hub};
pub use node::{launch_nodes, HubNode};
