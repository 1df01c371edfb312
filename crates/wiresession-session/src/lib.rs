//! Session layer for wiresession.
//!
//! A [`Session`] stamps every outgoing message with its token, username,
//! and a rolling message id, frames it as
//! `[identity...] <IDS|MSG> header parent_header content [buffer...]`, and
//! drives any [`MultipartSocket`](wiresession_transport::MultipartSocket).
//! Incoming messages have their routing identities stripped and are decoded
//! back into a [`Message`].

pub mod config;
pub mod error;
pub mod message;
pub mod remote;
pub mod session;
pub mod wire;

pub use config::{default_username, new_token, SessionConfig, DEFAULT_USERNAME};
pub use error::{Result, SessionError};
pub use message::{extract_header, Content, Header, JsonMap, Message};
pub use remote::{ensure_success, unwrap_error, wrap_error, wrap_std_error, RemoteError};
pub use session::{Outgoing, Session};
pub use wire::{feed_identities, serialize_message, unpack_message, DELIM};
