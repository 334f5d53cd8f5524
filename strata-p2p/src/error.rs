use strata_common::StrataError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Failed to send message: {0}")]
    Send(String),

    #[error("Peer not found: {0}")]
    PeerNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::Error> for NetworkError {
    fn from(e: bincode::Error) -> Self {
        NetworkError::Serialization(e.to_string())
    }
}

impl From<NetworkError> for StrataError {
    fn from(e: NetworkError) -> Self {
        StrataError::Network(e.to_string())
    }
}
