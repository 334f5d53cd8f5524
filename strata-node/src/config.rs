use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strata_common::{Result, StrataError};
use strata_consensus::{HubAddress, RuntimeConfig};

/// Configuração de um processo `strata-node`.
///
/// Um processo hospeda `nodes` nós escutando em `base_port + i`, `i` em `1..=nodes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub owner: String,
    pub host: String,
    pub base_port: u16,
    pub nodes: u32,
    pub hub_host: String,
    pub hub_port: u16,
    pub delta_ms: u64,
    pub pass_interval_ms: u64,
    /// `null`, o padrão, mantém mensagens não tratadas na fila para sempre.
    pub unhandled_retention_ms: Option<u64>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            owner: "strata".to_string(),
            host: "127.0.0.1".to_string(),
            base_port: 5100,
            nodes: 3,
            hub_host: "127.0.0.1".to_string(),
            hub_port: 5000,
            delta_ms: 100,
            pass_interval_ms: 15,
            unhandled_retention_ms: None,
        }
    }
}

impl NodeConfig {
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let parsed = serde_json::from_str::<NodeConfig>(&data)?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<()> {
        if self.nodes == 0 {
            return Err(StrataError::Config("nodes deve ser >= 1".to_string()));
        }
        if u32::from(self.base_port) + self.nodes > u32::from(u16::MAX) {
            return Err(StrataError::Config(format!(
                "base_port {} + {} nós passa de {}",
                self.base_port,
                self.nodes,
                u16::MAX
            )));
        }
        let ports = self.node_ports();
        if ports.contains(&self.hub_port) && self.hub_host == self.host {
            return Err(StrataError::Config(format!("hub_port {} colide com um nó", self.hub_port)));
        }
        if self.delta_ms == 0 {
            return Err(StrataError::Config("delta_ms deve ser > 0".to_string()));
        }
        Ok(())
    }

    /// Listening ports of the hosted nodes, in index order.
    pub fn node_ports(&self) -> Vec<u16> {
        (1..=self.nodes)
            .filter_map(|i| u16::try_from(u32::from(self.base_port) + i).ok())
            .collect()
    }

    pub fn hub(&self) -> HubAddress {
        HubAddress::new(self.hub_host.clone(), self.hub_port)
    }

    pub fn runtime(&self) -> RuntimeConfig {
        RuntimeConfig {
            delta: Duration::from_millis(self.delta_ms),
            pass_interval: Duration::from_millis(self.pass_interval_ms),
            unhandled_retention: self.unhandled_retention_ms.map(Duration::from_millis),
        }
    }
}
