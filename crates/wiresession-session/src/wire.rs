//! Multipart wire format.
//!
//! ```text
//! [identity...] <IDS|MSG> header parent_header content [buffer...]
//! ```
//!
//! Identity frames are routing prefixes added by routed transports. The
//! header, parent header, and mapping content go through the session's
//! [`Codec`]; buffers are carried untouched.

use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, warn};
use wiresession_serialize::Codec;

use crate::error::{Result, SessionError};
use crate::message::{json_kind, Content, Header, JsonMap, Message};

/// Delimiter between identity frames and the message proper.
pub const DELIM: &[u8] = b"<IDS|MSG>";

/// Frames every message carries after the delimiter.
pub const MIN_FRAMES: usize = 3;

/// Split routing identities from the rest of a message.
///
/// Frames are scanned from the front while more than three remain. The
/// delimiter ends the scan and is dropped; any other frame is an identity.
/// When the scan runs down to three frames without meeting the delimiter,
/// `strict` turns the scanned frames into [`SessionError::MissingDelimiter`];
/// otherwise they are returned as identities. A message with three or fewer
/// frames is returned as-is with no identities.
pub fn feed_identities(frames: Vec<Bytes>, strict: bool) -> Result<(Vec<Bytes>, Vec<Bytes>)> {
    let mut rest = frames.into_iter();
    let mut identities = Vec::new();
    while rest.len() > MIN_FRAMES {
        let Some(frame) = rest.next() else { break };
        if frame.as_ref() == DELIM {
            debug!(identities = identities.len(), "stripped identity prefix");
            return Ok((identities, rest.collect()));
        }
        identities.push(frame);
    }

    if !identities.is_empty() {
        if strict {
            return Err(SessionError::MissingDelimiter {
                scanned: identities.len(),
            });
        }
        warn!(
            identities = identities.len(),
            "no delimiter found, treating scanned frames as identities"
        );
    }
    Ok((identities, rest.collect()))
}

/// Frames for `message`, prefixed by `identities` and the delimiter.
pub fn serialize_message(
    codec: &Codec,
    message: &Message,
    identities: &[Bytes],
) -> Result<Vec<Bytes>> {
    let content = match &message.content {
        Content::Mapping(map) if map.is_empty() => codec.none(),
        Content::Mapping(map) => codec.pack(&Value::Object(map.clone()))?,
        Content::Encoded(bytes) => bytes.clone(),
    };

    let mut frames = Vec::with_capacity(identities.len() + 4 + message.buffers.len());
    frames.extend(identities.iter().cloned());
    frames.push(Bytes::from_static(DELIM));
    frames.push(codec.pack(&Value::Object(message.header.to_map()))?);
    frames.push(codec.pack(&Value::Object(message.parent_header.clone()))?);
    frames.push(content);
    frames.extend(message.buffers.iter().cloned());
    Ok(frames)
}

/// Decode frames that have already had identities stripped.
///
/// Content is decoded only when `content` is set; otherwise it stays
/// [`Content::Encoded`]. Frames past the third become buffers.
pub fn unpack_message(codec: &Codec, frames: Vec<Bytes>, content: bool) -> Result<Message> {
    if frames.len() < MIN_FRAMES {
        return Err(SessionError::MalformedMessage(format!(
            "expected at least {MIN_FRAMES} frames, got {}",
            frames.len()
        )));
    }
    let mut frames = frames.into_iter();
    let (Some(header), Some(parent), Some(body)) = (frames.next(), frames.next(), frames.next())
    else {
        return Err(SessionError::MalformedMessage(
            "message ended early".to_string(),
        ));
    };

    let header = Header::from_map(unpack_mapping(codec, &header, "header")?)?;
    let parent_header = unpack_mapping(codec, &parent, "parent header")?;
    let content = if content {
        Content::Mapping(unpack_mapping(codec, &body, "content")?)
    } else {
        Content::Encoded(body)
    };

    Ok(Message {
        msg_type: header.msg_type.clone(),
        header,
        parent_header,
        content,
        buffers: frames.collect(),
    })
}

fn unpack_mapping(codec: &Codec, frame: &[u8], what: &str) -> Result<JsonMap> {
    match codec.unpack(frame)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(JsonMap::new()),
        other => Err(SessionError::MalformedMessage(format!(
            "{what} decodes to {}, not a mapping",
            json_kind(&other)
        ))),
    }
}
