use std::fmt;

use serde::{Deserialize, Serialize};

/// Epoch timestamps and value timestamps.
pub type Timestamp = u64;

/// A proposable value; the undefined value is ⊥.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Value {
    pub defined: bool,
    pub v: i32,
}

impl Value {
    pub const fn undefined() -> Self {
        Self { defined: false, v: 0 }
    }

    pub const fn new(v: i32) -> Self {
        Self { defined: true, v }
    }

    pub fn is_defined(&self) -> bool {
        self.defined
    }

    pub fn get(&self) -> Option<i32> {
        self.defined.then_some(self.v)
    }
}

impl From<Option<i32>> for Value {
    fn from(v: Option<i32>) -> Self {
        v.map(Value::new).unwrap_or_default()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(v) => write!(f, "{v}"),
            None => write!(f, "⊥"),
        }
    }
}

/// The most recently written `(timestamp, value)` pair known to a process.
///
/// Recency is decided by `value_timestamp` alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochState {
    pub value_timestamp: Timestamp,
    pub value: Value,
}

impl EpochState {
    pub fn new(value_timestamp: Timestamp, value: Value) -> Self {
        Self { value_timestamp, value }
    }
}
