//! Session identity plus message construction, send, and receive.

use bytes::Bytes;
use serde_json::Value;
use tracing::debug;
use wiresession_serialize::{Codec, ObjectSerializer};
use wiresession_transport::{MultipartSocket, RecvFlags, SendFlags};

use crate::config::{new_token, SessionConfig};
use crate::error::Result;
use crate::message::{extract_header, Content, Header, JsonMap, Message};
use crate::wire;

/// Everything optional about an outgoing message.
#[derive(Debug, Clone, Default)]
pub struct Outgoing {
    /// Content; `None` sends the empty mapping.
    pub content: Option<Content>,
    /// Parent message or header; see [`extract_header`].
    pub parent: Option<Value>,
    /// Extra fields merged into the header.
    pub extra_header: Option<JsonMap>,
    /// Out-of-band buffers, sent after the content frame.
    pub buffers: Vec<Bytes>,
    /// Routing identities placed before the delimiter.
    pub identities: Vec<Bytes>,
}

impl Outgoing {
    pub fn content(mut self, content: impl Into<Content>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn parent(mut self, parent: &Message) -> Self {
        self.parent = Some(Value::Object(parent.header.to_map()));
        self
    }

    pub fn buffers(mut self, buffers: Vec<Bytes>) -> Self {
        self.buffers = buffers;
        self
    }

    pub fn identities(mut self, identities: Vec<Bytes>) -> Self {
        self.identities = identities;
        self
    }
}

/// One peer's session.
///
/// Holds the session token, username, codec, and the rolling message id.
/// Building a header takes `&mut self`; share a session between threads
/// only behind a lock, or give each sender its own.
pub struct Session {
    config: SessionConfig,
    codec: Codec,
    msg_id: String,
}

impl Session {
    /// Session using the built-in codec named by `config.codec`.
    pub fn new(config: SessionConfig) -> Self {
        let codec = Codec::new(config.codec);
        Self::with_codec(config, codec)
    }

    /// Session using a caller-supplied codec.
    pub fn with_codec(config: SessionConfig, codec: Codec) -> Self {
        debug!(
            session = %config.session,
            username = %config.username,
            codec = codec.name(),
            "session created"
        );
        Self {
            config,
            codec,
            msg_id: new_token(),
        }
    }

    pub fn session(&self) -> &str {
        &self.config.session
    }

    pub fn username(&self) -> &str {
        &self.config.username
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Object serializer using this session's threshold.
    pub fn serializer(&self) -> ObjectSerializer {
        ObjectSerializer::with_threshold(self.config.threshold)
    }

    /// Header carrying the current message id; a fresh id replaces it.
    pub fn build_header(&mut self, msg_type: &str) -> Header {
        let msg_id = std::mem::replace(&mut self.msg_id, new_token());
        Header {
            msg_id,
            msg_type: msg_type.to_string(),
            username: self.config.username.clone(),
            session: self.config.session.clone(),
            extra: JsonMap::new(),
        }
    }

    /// Build a message envelope.
    ///
    /// Fields in `extra_header` are merged over the generated header.
    pub fn build_message(
        &mut self,
        msg_type: &str,
        content: Option<Content>,
        parent: Option<&Value>,
        extra_header: Option<JsonMap>,
    ) -> Result<Message> {
        let parent_header = match parent {
            Some(parent) => extract_header(parent)?,
            None => JsonMap::new(),
        };
        let mut header = self.build_header(msg_type);
        if let Some(extra) = extra_header {
            let mut merged = header.to_map();
            merged.extend(extra);
            header = Header::from_map(merged)?;
        }
        Ok(Message {
            msg_type: header.msg_type.clone(),
            header,
            parent_header,
            content: content.unwrap_or_default(),
            buffers: Vec::new(),
        })
    }

    /// Frames for `message`, prefixed by `identities`.
    pub fn serialize(&self, message: &Message, identities: &[Bytes]) -> Result<Vec<Bytes>> {
        wire::serialize_message(&self.codec, message, identities)
    }

    /// Decode identity-stripped frames.
    pub fn unpack_message(&self, frames: Vec<Bytes>, content: bool) -> Result<Message> {
        wire::unpack_message(&self.codec, frames, content)
    }

    /// Split identities using this session's strictness.
    pub fn feed_identities(&self, frames: Vec<Bytes>) -> Result<(Vec<Bytes>, Vec<Bytes>)> {
        wire::feed_identities(frames, self.config.strict_identities)
    }

    /// Build and send a message, returning what was sent.
    pub fn send<S: MultipartSocket + ?Sized>(
        &mut self,
        socket: &mut S,
        msg_type: &str,
        outgoing: Outgoing,
    ) -> Result<Message> {
        let Outgoing {
            content,
            parent,
            extra_header,
            buffers,
            identities,
        } = outgoing;
        let mut message = self.build_message(msg_type, content, parent.as_ref(), extra_header)?;
        message.buffers = buffers;
        self.send_message(socket, &message, &identities)?;
        Ok(message)
    }

    /// Send an already-built message as one multipart write.
    pub fn send_message<S: MultipartSocket + ?Sized>(
        &self,
        socket: &mut S,
        message: &Message,
        identities: &[Bytes],
    ) -> Result<()> {
        let frames = self.serialize(message, identities)?;
        debug!(
            msg_type = %message.msg_type,
            msg_id = %message.header.msg_id,
            frames = frames.len(),
            buffers = message.buffers.len(),
            "sending message"
        );
        socket.send_multipart(frames, SendFlags::empty())?;
        Ok(())
    }

    /// Receive one message.
    ///
    /// Returns `Ok(None)` when `flags` contains [`RecvFlags::NOBLOCK`] and
    /// nothing is waiting. Content is decoded only when `content` is set.
    pub fn recv<S: MultipartSocket + ?Sized>(
        &self,
        socket: &mut S,
        flags: RecvFlags,
        content: bool,
    ) -> Result<Option<(Vec<Bytes>, Message)>> {
        let frames = match socket.recv_multipart(flags) {
            Ok(frames) => frames,
            Err(err) if err.is_would_block() => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let (identities, frames) = self.feed_identities(frames)?;
        let message = self.unpack_message(frames, content)?;
        debug!(
            msg_type = %message.msg_type,
            msg_id = %message.header.msg_id,
            identities = identities.len(),
            buffers = message.buffers.len(),
            "received message"
        );
        Ok(Some((identities, message)))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session", &self.config.session)
            .field("username", &self.config.username)
            .field("codec", &self.codec.name())
            .finish()
    }
}
