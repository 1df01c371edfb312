use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, TransportError};

/// Part header: magic (2) + flags (1) + length (4) = 7 bytes.
pub const HEADER_SIZE: usize = 7;

/// Magic bytes: "WS" (0x57 0x53).
pub const MAGIC: [u8; 2] = [0x57, 0x53];

/// Part flag: another part of the same message follows.
pub const FLAG_MORE: u8 = 0b0000_0001;

/// Default maximum size of a single part: 64 MiB.
pub const DEFAULT_MAX_PART: usize = 64 * 1024 * 1024;

/// Default maximum number of parts in one message.
pub const DEFAULT_MAX_PARTS: usize = 4096;

/// One decoded part of a multipart message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Whether more parts of the same message follow.
    pub more: bool,
    /// The part payload.
    pub payload: Bytes,
}

/// Encode one part into the byte-stream format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬─────────┬───────────┬─────────────────┐
/// │ Magic (2B)   │ Flags   │ Length    │ Payload          │
/// │ 0x57 0x53    │ (1B)    │ (4B LE)   │ (Length bytes)   │
/// │ "WS"         │ bit0=MORE│          │                  │
/// └──────────────┴─────────┴───────────┴─────────────────┘
/// ```
pub fn encode_part(payload: &[u8], more: bool, dst: &mut BytesMut) -> Result<()> {
    if payload.len() > u32::MAX as usize {
        return Err(TransportError::PartTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&MAGIC);
    dst.put_u8(if more { FLAG_MORE } else { 0 });
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Encode a whole message, setting `MORE` on every part but the last.
pub fn encode_message(frames: &[Bytes], dst: &mut BytesMut) -> Result<()> {
    if frames.is_empty() {
        return Err(TransportError::EmptyMessage);
    }
    let last = frames.len() - 1;
    for (i, frame) in frames.iter().enumerate() {
        encode_part(frame, i != last, dst)?;
    }
    Ok(())
}

/// Decode one part from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete part yet.
/// On success, consumes the part bytes from the buffer.
pub fn decode_part(src: &mut BytesMut, max_part: usize) -> Result<Option<Part>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    if src[0..2] != MAGIC {
        return Err(TransportError::InvalidMagic);
    }

    let more = src[2] & FLAG_MORE != 0;
    let len = u32::from_le_bytes([src[3], src[4], src[5], src[6]]) as usize;

    if len > max_part {
        return Err(TransportError::PartTooLarge {
            size: len,
            max: max_part,
        });
    }

    if src.len() < HEADER_SIZE + len {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(len).freeze();

    Ok(Some(Part { more, payload }))
}

/// Configuration for the byte-stream multipart codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum size of a single part in bytes. Default: 64 MiB.
    pub max_part_size: usize,
    /// Maximum number of parts in one message. Default: 4096.
    pub max_parts: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_part_size: DEFAULT_MAX_PART,
            max_parts: DEFAULT_MAX_PARTS,
        }
    }
}

/// Collects decoded parts until a part without `MORE` completes a message.
#[derive(Debug, Default)]
pub struct MessageAssembler {
    parts: Vec<Bytes>,
}

impl MessageAssembler {
    /// Add a part; returns the finished message when `part.more` is false.
    pub fn push(&mut self, part: Part, max_parts: usize) -> Result<Option<Vec<Bytes>>> {
        if self.parts.len() >= max_parts {
            return Err(TransportError::TooManyParts {
                count: self.parts.len() + 1,
                max: max_parts,
            });
        }
        self.parts.push(part.payload);
        if part.more {
            return Ok(None);
        }
        Ok(Some(std::mem::take(&mut self.parts)))
    }

    /// True while a message has been started but not completed.
    pub fn is_partial(&self) -> bool {
        !self.parts.is_empty()
    }
}

/// `tokio_util` codec moving whole multipart messages over an async stream.
#[cfg(feature = "async")]
#[derive(Debug, Default)]
pub struct MultipartCodec {
    config: FrameConfig,
    assembler: MessageAssembler,
}

#[cfg(feature = "async")]
impl MultipartCodec {
    /// Create a codec with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            config,
            assembler: MessageAssembler::default(),
        }
    }
}

#[cfg(feature = "async")]
impl tokio_util::codec::Decoder for MultipartCodec {
    type Item = Vec<Bytes>;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Vec<Bytes>>> {
        while let Some(part) = decode_part(src, self.config.max_part_size)? {
            if let Some(message) = self.assembler.push(part, self.config.max_parts)? {
                return Ok(Some(message));
            }
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Vec<Bytes>>> {
        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None if src.is_empty() && !self.assembler.is_partial() => Ok(None),
            None => Err(TransportError::ConnectionClosed),
        }
    }
}

#[cfg(feature = "async")]
impl tokio_util::codec::Encoder<Vec<Bytes>> for MultipartCodec {
    type Error = TransportError;

    fn encode(&mut self, frames: Vec<Bytes>, dst: &mut BytesMut) -> Result<()> {
        if frames.len() > self.config.max_parts {
            return Err(TransportError::TooManyParts {
                count: frames.len(),
                max: self.config.max_parts,
            });
        }
        if let Some(frame) = frames.iter().find(|f| f.len() > self.config.max_part_size) {
            return Err(TransportError::PartTooLarge {
                size: frame.len(),
                max: self.config.max_part_size,
            });
        }
        encode_message(&frames, dst)
    }
}
