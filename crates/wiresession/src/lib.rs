//! Multipart session messaging with out-of-band object serialization.
//!
//! # Crate Structure
//!
//! - [`transport`]: multipart socket contract, in-memory and byte-stream sockets
//! - [`serialize`]: codecs, the object serializer, and remote-call packing
//! - [`session`]: sessions, envelopes, and the `<IDS|MSG>` wire format

/// Re-export transport types.
pub mod transport {
    pub use wiresession_transport::*;
}

/// Re-export serialization types.
pub mod serialize {
    pub use wiresession_serialize::*;
}

/// Re-export session types.
pub mod session {
    pub use wiresession_session::*;
}

pub use wiresession_serialize::{
    pack_apply_message, serialize_object, unpack_apply_message, unserialize_object, Codec,
    CodecChoice, Object,
};
pub use wiresession_session::{Content, Message, Outgoing, Session, SessionConfig, SessionError};
pub use wiresession_transport::{MemorySocket, MultipartSocket, RecvFlags, SendFlags, StreamSocket};
