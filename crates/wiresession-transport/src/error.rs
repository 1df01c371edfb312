/// Errors that can occur in multipart transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No message is available and the receive was non-blocking.
    ///
    /// This is the EAGAIN-class condition; session layers translate it into
    /// a "no message" outcome rather than a failure.
    #[error("no message available (would block)")]
    WouldBlock,

    /// An I/O error occurred on the underlying stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A part header contained an invalid magic number.
    #[error("invalid part magic (expected 0x5753 \"WS\")")]
    InvalidMagic,

    /// A single part exceeded the configured maximum size.
    #[error("part too large ({size} bytes, max {max})")]
    PartTooLarge { size: usize, max: usize },

    /// A message carried more parts than the configured maximum.
    #[error("too many parts in one message ({count}, max {max})")]
    TooManyParts { count: usize, max: usize },

    /// A multipart send was attempted with no frames.
    #[error("cannot send an empty multipart message")]
    EmptyMessage,

    /// The connection was closed before a complete message was received.
    #[error("connection closed (incomplete message)")]
    ConnectionClosed,

    /// The peer end of the transport has been dropped or shut down.
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// True for the non-blocking "nothing to read yet" condition.
    pub fn is_would_block(&self) -> bool {
        match self {
            TransportError::WouldBlock => true,
            TransportError::Io(err) => err.kind() == std::io::ErrorKind::WouldBlock,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
