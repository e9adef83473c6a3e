//! Per-connection bindings to a game session
//!
//! A [`PlayerHandle`] is created when a connection binds to a session and
//! dropped when the connection ends. It owns the receiving half of a small
//! bounded notification queue; the sending half is registered with the
//! session as a [`Subscriber`] and written only by the session's dispatcher.

use shared::Role;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

pub type PlayerId = u32;
pub type SessionId = String;

/// Default depth of each handle's notification queue
pub const DEFAULT_NOTIFY_DEPTH: usize = 1;

/// "The session changed, re-read it." Carries only the originating player;
/// receivers always redraw from live session state, never from the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub origin: PlayerId,
}

#[derive(Debug)]
pub struct PlayerHandle {
    session_id: SessionId,
    id: PlayerId,
    role: Role,
    name: String,
    notifications: mpsc::Receiver<Notification>,
}

impl PlayerHandle {
    pub(crate) fn new(
        session_id: SessionId,
        id: PlayerId,
        role: Role,
        name: String,
        notifications: mpsc::Receiver<Notification>,
    ) -> Self {
        Self {
            session_id,
            id,
            role,
            name,
            notifications,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Sequence index of this connection within its session
    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Waits for the next notification. Cancel-safe, so it can sit in a
    /// `tokio::select!` next to the connection's input.
    pub async fn notified(&mut self) -> Option<Notification> {
        self.notifications.recv().await
    }

    /// Takes a pending notification without waiting
    pub fn try_notified(&mut self) -> Option<Notification> {
        match self.notifications.try_recv() {
            Ok(note) => Some(note),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

/// Sending half of a handle's queue, as registered with its session
#[derive(Debug)]
pub(crate) struct Subscriber {
    pub id: PlayerId,
    pub sender: mpsc::Sender<Notification>,
}

pub(crate) fn notification_channel(
    depth: usize,
) -> (mpsc::Sender<Notification>, mpsc::Receiver<Notification>) {
    mpsc::channel(depth.max(1))
}
