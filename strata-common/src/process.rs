use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StrataError};

/// Identidade de um processo participante.
///
/// Dois `ProcessId` são o mesmo processo quando escutam na mesma porta:
/// o roster é sempre de um único host com várias portas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessId {
    pub host: String,
    pub port: u16,
    pub owner: String,
    pub index: u32,
    pub rank: u32,
}

impl ProcessId {
    pub fn new(host: impl Into<String>, port: u16, owner: impl Into<String>, index: u32, rank: u32) -> Self {
        Self {
            host: host.into(),
            port,
            owner: owner.into(),
            index,
            rank,
        }
    }
}

impl PartialEq for ProcessId {
    fn eq(&self, other: &Self) -> bool {
        self.port == other.port
    }
}

impl Eq for ProcessId {}

impl Hash for ProcessId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.port.hash(state);
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}@{}:{} (rank {})", self.owner, self.index, self.host, self.port, self.rank)
    }
}

/// The fixed, previously agreed set of processes of one consensus instance.
///
/// Kept sorted by rank, so the lowest and highest ranked members are the
/// first and last entries.
#[derive(Debug, Clone)]
pub struct Roster {
    processes: Vec<ProcessId>,
}

impl Roster {
    /// Validates and builds the roster.
    ///
    /// Ranks and ports must be unique, and ranks must also be distinct modulo
    /// the roster size: epoch timestamps are `rank + k * N`, so two ranks in
    /// the same residue class would eventually issue the same timestamp.
    pub fn new(mut processes: Vec<ProcessId>) -> Result<Self> {
        if processes.is_empty() {
            return Err(StrataError::Roster("roster vazio".to_string()));
        }

        let n = processes.len() as u32;
        let mut ports = HashSet::new();
        let mut residues: HashMap<u32, u32> = HashMap::new();
        for p in &processes {
            if !ports.insert(p.port) {
                return Err(StrataError::Roster(format!("porta duplicada {}", p.port)));
            }
            if let Some(other) = residues.insert(p.rank % n, p.rank) {
                return Err(StrataError::Roster(format!(
                    "ranks {} e {} colidem módulo {} (ranks devem ser distintos módulo N)",
                    other, p.rank, n
                )));
            }
        }

        processes.sort_by_key(|p| p.rank);
        Ok(Self { processes })
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Quorum size used by every quorum-gated step: `⌊N/2⌋ + 1`.
    pub fn majority(&self) -> usize {
        self.processes.len() / 2 + 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessId> {
        self.processes.iter()
    }

    pub fn processes(&self) -> &[ProcessId] {
        &self.processes
    }

    pub fn min_rank(&self) -> &ProcessId {
        &self.processes[0]
    }

    pub fn max_rank(&self) -> &ProcessId {
        &self.processes[self.processes.len() - 1]
    }

    pub fn by_port(&self, port: u16) -> Option<&ProcessId> {
        self.processes.iter().find(|p| p.port == port)
    }

    pub fn contains(&self, process: &ProcessId) -> bool {
        self.by_port(process.port).is_some()
    }
}
