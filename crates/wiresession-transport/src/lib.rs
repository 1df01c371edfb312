//! Multipart message transport for wiresession.
//!
//! Defines the socket contract the session layer drives
//! ([`MultipartSocket`]) and two implementations:
//! - [`MemorySocket`]: in-process pairs, optionally routed (identity-prefixed)
//! - [`StreamSocket`]: multipart messages over any `Read`/`Write` byte stream
//!
//! With the `async` feature, [`codec::MultipartCodec`] carries the same
//! byte-stream format through `tokio_util::codec`.

pub mod codec;
pub mod error;
pub mod memory;
pub mod stream;
pub mod traits;

pub use codec::{FrameConfig, Part, DEFAULT_MAX_PART, DEFAULT_MAX_PARTS, HEADER_SIZE};
pub use error::{Result, TransportError};
pub use memory::MemorySocket;
pub use stream::StreamSocket;
pub use traits::{MultipartSocket, RecvFlags, SendFlags};
