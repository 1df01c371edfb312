use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{MultipartSocket, RecvFlags, SendFlags};

/// In-process multipart socket.
///
/// Created in connected pairs. A pair built with
/// [`MemorySocket::routed_pair`] mimics a routed socket: messages arriving at
/// the router end are prefixed with the sender's identity frame, and the
/// router addresses outgoing messages by putting that identity first.
pub struct MemorySocket {
    inbox: Arc<Mailbox>,
    outbox: Arc<Mailbox>,
    pending: Vec<Bytes>,
    route: Route,
}

enum Route {
    Direct,
    Router { peer_identity: Bytes },
}

#[derive(Default)]
struct Mailbox {
    state: Mutex<MailboxState>,
    ready: Condvar,
}

#[derive(Default)]
struct MailboxState {
    messages: VecDeque<Vec<Bytes>>,
    closed: bool,
}

impl Mailbox {
    fn lock(&self) -> MutexGuard<'_, MailboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, message: Vec<Bytes>) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(TransportError::Shutdown);
        }
        state.messages.push_back(message);
        self.ready.notify_one();
        Ok(())
    }

    fn pop(&self, flags: RecvFlags) -> Result<Vec<Bytes>> {
        let mut state = self.lock();
        loop {
            if let Some(message) = state.messages.pop_front() {
                return Ok(message);
            }
            if state.closed {
                return Err(TransportError::Shutdown);
            }
            if flags.contains(RecvFlags::NOBLOCK) {
                return Err(TransportError::WouldBlock);
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
    }
}

impl MemorySocket {
    /// Create two directly connected ends.
    pub fn pair() -> (Self, Self) {
        let a_to_b = Arc::new(Mailbox::default());
        let b_to_a = Arc::new(Mailbox::default());
        let a = Self {
            inbox: Arc::clone(&b_to_a),
            outbox: Arc::clone(&a_to_b),
            pending: Vec::new(),
            route: Route::Direct,
        };
        let b = Self {
            inbox: a_to_b,
            outbox: b_to_a,
            pending: Vec::new(),
            route: Route::Direct,
        };
        (a, b)
    }

    /// Create a `(dealer, router)` pair where the dealer end is known to the
    /// router under `identity`.
    pub fn routed_pair(identity: impl Into<Bytes>) -> (Self, Self) {
        let (dealer, mut router) = Self::pair();
        router.route = Route::Router {
            peer_identity: identity.into(),
        };
        (dealer, router)
    }

    /// Number of complete messages waiting to be received on this end.
    pub fn queued(&self) -> usize {
        self.inbox.lock().messages.len()
    }

    fn flush_pending(&mut self) -> Result<()> {
        let mut message = std::mem::take(&mut self.pending);
        if let Route::Router { peer_identity } = &self.route {
            if message.first() != Some(peer_identity) {
                // Unroutable messages are dropped, as a routed socket does.
                debug!(
                    parts = message.len(),
                    "dropping message addressed to unknown identity"
                );
                return Ok(());
            }
            message.remove(0);
        }
        self.outbox.push(message)
    }
}

impl MultipartSocket for MemorySocket {
    fn send(&mut self, frame: Bytes, flags: SendFlags) -> Result<()> {
        self.pending.push(frame);
        if flags.contains(SendFlags::MORE) {
            return Ok(());
        }
        self.flush_pending()
    }

    fn recv_multipart(&mut self, flags: RecvFlags) -> Result<Vec<Bytes>> {
        let mut message = self.inbox.pop(flags)?;
        if let Route::Router { peer_identity } = &self.route {
            message.insert(0, peer_identity.clone());
        }
        Ok(message)
    }
}

impl Drop for MemorySocket {
    fn drop(&mut self) {
        self.inbox.close();
        self.outbox.close();
    }
}

impl std::fmt::Debug for MemorySocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let route = match &self.route {
            Route::Direct => "direct",
            Route::Router { .. } => "router",
        };
        f.debug_struct("MemorySocket")
            .field("route", &route)
            .field("pending", &self.pending.len())
            .finish()
    }
}
