/// Errors raised while encoding, decoding, or reconstructing objects.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    /// A codec was wired up incorrectly.
    #[error("codec configuration error: {0}")]
    Configuration(String),

    /// A value could not be encoded by the codec.
    #[error("encode error: {0}")]
    Encode(String),

    /// A codec payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The metadata blob could not be encoded.
    #[error("metadata encode error: {0}")]
    MetadataEncode(#[from] rmp_serde::encode::Error),

    /// The metadata blob is malformed.
    #[error("metadata decode error: {0}")]
    MetadataDecode(#[from] rmp_serde::decode::Error),

    /// Fewer out-of-band buffers were supplied than stripped records need.
    #[error("out-of-band buffers exhausted after {supplied} buffer(s)")]
    BufferUnderflow { supplied: usize },

    /// An out-of-band buffer does not match the size recorded in metadata.
    #[error("out-of-band buffer is {actual} bytes, metadata expects {expected}")]
    BufferLength { expected: usize, actual: usize },

    /// A remote-call payload has the wrong shape.
    #[error("malformed apply payload: {0}")]
    MalformedPayload(String),

    /// An array's layout does not match its data.
    #[error("invalid array: {0}")]
    InvalidArray(String),

    /// A callable reference could not be resolved to a function.
    #[error("unresolved callable '{0}'")]
    Unresolved(String),

    /// A native function reported a failure while being invoked.
    #[error("invocation of '{name}' failed: {message}")]
    Invocation { name: String, message: String },
}

impl SerializeError {
    /// True for any malformed-input condition (codec or metadata).
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            SerializeError::Decode(_) | SerializeError::MetadataDecode(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SerializeError>;
