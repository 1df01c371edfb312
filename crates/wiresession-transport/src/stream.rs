use std::io::{ErrorKind, Read, Write};

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::codec::{decode_part, encode_message, FrameConfig, MessageAssembler};
use crate::error::{Result, TransportError};
use crate::traits::{MultipartSocket, RecvFlags, SendFlags};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Multipart socket over a byte-stream `Read`/`Write` pair.
///
/// Each frame is written as a length-prefixed part carrying a `MORE` flag
/// (see [`crate::codec`]). Reads handle partial input internally; callers
/// always get complete messages.
///
/// [`RecvFlags::NOBLOCK`] only avoids blocking when the reader itself is
/// non-blocking (for example a `UnixStream` with `set_nonblocking(true)`).
/// A `WouldBlock` from the reader surfaces as [`TransportError::WouldBlock`]
/// and any partially read message stays buffered for the next call.
pub struct StreamSocket<R, W> {
    reader: R,
    writer: W,
    read_buf: BytesMut,
    write_buf: BytesMut,
    assembler: MessageAssembler,
    pending: Vec<Bytes>,
    config: FrameConfig,
}

impl<R: Read, W: Write> StreamSocket<R, W> {
    /// Create a socket with default configuration.
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_config(reader, writer, FrameConfig::default())
    }

    /// Create a socket with explicit configuration.
    pub fn with_config(reader: R, writer: W, config: FrameConfig) -> Self {
        Self {
            reader,
            writer,
            read_buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            write_buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            assembler: MessageAssembler::default(),
            pending: Vec::new(),
            config,
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Mutably borrow the underlying writer.
    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consume the socket and return the reader and writer.
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }

    fn read_message(&mut self) -> Result<Vec<Bytes>> {
        loop {
            while let Some(part) = decode_part(&mut self.read_buf, self.config.max_part_size)? {
                if let Some(message) = self.assembler.push(part, self.config.max_parts)? {
                    trace!(parts = message.len(), "received multipart message");
                    return Ok(message);
                }
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.reader.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    return Err(TransportError::WouldBlock)
                }
                Err(err) => return Err(TransportError::Io(err)),
            };

            if read == 0 {
                if self.read_buf.is_empty() && !self.assembler.is_partial() {
                    return Err(TransportError::Shutdown);
                }
                return Err(TransportError::ConnectionClosed);
            }

            self.read_buf.extend_from_slice(&chunk[..read]);
        }
    }

    fn write_message(&mut self, frames: &[Bytes]) -> Result<()> {
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

        self.write_buf.clear();
        encode_message(frames, &mut self.write_buf)?;

        let mut offset = 0usize;
        while offset < self.write_buf.len() {
            match self.writer.write(&self.write_buf[offset..]) {
                Ok(0) => return Err(TransportError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        trace!(parts = frames.len(), bytes = offset, "sent multipart message");

        self.flush()
    }

    fn flush(&mut self) -> Result<()> {
        loop {
            match self.writer.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl<R: Read, W: Write> MultipartSocket for StreamSocket<R, W> {
    fn send(&mut self, frame: Bytes, flags: SendFlags) -> Result<()> {
        self.pending.push(frame);
        if flags.contains(SendFlags::MORE) {
            return Ok(());
        }
        let frames = std::mem::take(&mut self.pending);
        self.write_message(&frames)
    }

    fn send_multipart(&mut self, frames: Vec<Bytes>, flags: SendFlags) -> Result<()> {
        if frames.is_empty() {
            return Err(TransportError::EmptyMessage);
        }
        self.pending.extend(frames);
        if flags.contains(SendFlags::MORE) {
            return Ok(());
        }
        let frames = std::mem::take(&mut self.pending);
        self.write_message(&frames)
    }

    fn recv_multipart(&mut self, _flags: RecvFlags) -> Result<Vec<Bytes>> {
        self.read_message()
    }
}

#[cfg(unix)]
impl StreamSocket<std::os::unix::net::UnixStream, std::os::unix::net::UnixStream> {
    /// Wrap a connected Unix stream, cloning it for the read half.
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Result<Self> {
        let reader = stream.try_clone()?;
        Ok(Self::new(reader, stream))
    }
}

impl<R, W> std::fmt::Debug for StreamSocket<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSocket")
            .field("buffered", &self.read_buf.len())
            .field("pending", &self.pending.len())
            .field("config", &self.config)
            .finish()
    }
}
