use crate::remote::RemoteError;

/// Errors that can occur while building, sending, or receiving messages.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] wiresession_transport::TransportError),

    /// Codec or object serialization error.
    #[error("serialize error: {0}")]
    Serialize(#[from] wiresession_serialize::SerializeError),

    /// Wrong frame count or frame shape after identity stripping.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// Identity frames were scanned but no delimiter followed them.
    #[error("no <IDS|MSG> delimiter after {scanned} identity frame(s)")]
    MissingDelimiter { scanned: usize },

    /// A value passed as a parent carries no header.
    #[error("no header found in {0}")]
    MissingHeader(String),

    /// Content is neither a mapping, null, nor pre-encoded bytes.
    #[error("content must be a mapping or pre-encoded bytes, got {0}")]
    InvalidContent(String),

    /// JSON conversion error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote side reported a failure.
    #[error(transparent)]
    RemoteExecution(#[from] RemoteError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
