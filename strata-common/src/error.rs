use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrataError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Consensus error: {0}")]
    Consensus(String),

    #[error("Invalid roster: {0}")]
    Roster(String),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other: {0}")]
    Other(String),
}

impl From<serde_json::Error> for StrataError {
    fn from(e: serde_json::Error) -> Self {
        StrataError::Config(e.to_string())
    }
}

impl From<bincode::Error> for StrataError {
    fn from(e: bincode::Error) -> Self {
        StrataError::Codec(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StrataError>;
