use std::ops::BitOr;

use bytes::Bytes;

use crate::error::{Result, TransportError};

/// Flags accepted by [`MultipartSocket::send`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendFlags(u8);

impl SendFlags {
    /// More frames of the same message follow this one.
    pub const MORE: SendFlags = SendFlags(0b0000_0001);

    /// No flags set: this frame completes the message.
    pub const fn empty() -> Self {
        SendFlags(0)
    }

    /// Returns true if every flag in `other` is set.
    pub const fn contains(self, other: SendFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SendFlags {
    type Output = SendFlags;

    fn bitor(self, rhs: SendFlags) -> SendFlags {
        SendFlags(self.0 | rhs.0)
    }
}

/// Flags accepted by [`MultipartSocket::recv_multipart`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecvFlags(u8);

impl RecvFlags {
    /// Return [`TransportError::WouldBlock`] instead of waiting for a message.
    pub const NOBLOCK: RecvFlags = RecvFlags(0b0000_0001);

    /// Blocking receive.
    pub const fn empty() -> Self {
        RecvFlags(0)
    }

    /// Returns true if every flag in `other` is set.
    pub const fn contains(self, other: RecvFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// A full-duplex socket that moves whole multipart messages.
///
/// Frames sent with [`SendFlags::MORE`] are held back until a frame without
/// the flag completes the message; the message is then delivered atomically.
/// A receiver never observes a partial message.
pub trait MultipartSocket {
    /// Queue one frame. The message is flushed when `flags` lacks `MORE`.
    fn send(&mut self, frame: Bytes, flags: SendFlags) -> Result<()>;

    /// Receive one complete multipart message.
    ///
    /// With [`RecvFlags::NOBLOCK`], returns [`TransportError::WouldBlock`]
    /// when nothing is ready.
    fn recv_multipart(&mut self, flags: RecvFlags) -> Result<Vec<Bytes>>;

    /// Send all `frames` as one message.
    ///
    /// `MORE` is set on every frame except the last; if `flags` itself
    /// contains `MORE` the last frame carries it too, leaving the message
    /// open for further [`send`](MultipartSocket::send) calls.
    fn send_multipart(&mut self, frames: Vec<Bytes>, flags: SendFlags) -> Result<()> {
        if frames.is_empty() {
            return Err(TransportError::EmptyMessage);
        }
        let last = frames.len() - 1;
        for (i, frame) in frames.into_iter().enumerate() {
            let frame_flags = if i == last { flags } else { SendFlags::MORE };
            self.send(frame, frame_flags)?;
        }
        Ok(())
    }
}

impl<S: MultipartSocket + ?Sized> MultipartSocket for &mut S {
    fn send(&mut self, frame: Bytes, flags: SendFlags) -> Result<()> {
        (**self).send(frame, flags)
    }

    fn recv_multipart(&mut self, flags: RecvFlags) -> Result<Vec<Bytes>> {
        (**self).recv_multipart(flags)
    }
}
