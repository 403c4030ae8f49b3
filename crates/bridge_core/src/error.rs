use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("invalid JSON: {0}")]
    Parse(String),

    #[error("Cannot merge response and request")]
    Merge,

    #[error("transport: {0}")]
    Transport(String),

    #[error("Unexpected api status code: {0}")]
    UnexpectedStatus(u16),

    #[error("Invalid path")]
    Routing,

    /// Raised by a bridge's own `run`; the message is passed through untouched.
    #[error("{0}")]
    Adapter(String),

    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("request: {0}")]
    Request(String),

    #[error("unknown auth type '{0}'")]
    UnknownAuth(String),
}

impl BridgeError {
    pub fn adapter(msg: impl Into<String>) -> Self {
        Self::Adapter(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
