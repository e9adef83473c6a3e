//! Fan-out of "session changed" notifications
//!
//! Each session runs one dispatcher task. A connection that has just mutated
//! the session calls [`Dispatcher::publish`], which queues one notification
//! for every other bound handle and only returns once that fan-out is done,
//! so the originator never races ahead of the other viewers.
//!
//! Queues are bounded and drop-and-coalesce: if a handle already has a
//! notification waiting, the new one is dropped, since the receiver redraws
//! from live session state either way. Handles whose receiver is gone are
//! pruned during fan-out and their seat or spectator slot is released.

use crate::error::DispatchError;
use crate::player::{Notification, PlayerId, Subscriber};
use crate::session::SharedSession;
use log::{debug, info};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

const DISPATCH_QUEUE: usize = 64;

/// Outcome of one fan-out pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanOut {
    /// Notifications queued
    pub delivered: usize,
    /// Recipients that already had a notification pending
    pub coalesced: usize,
    /// Recipients removed because their connection is gone
    pub pruned: usize,
}

#[derive(Debug)]
struct Dispatch {
    origin: PlayerId,
    ack: oneshot::Sender<FanOut>,
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    session_id: String,
    tx: mpsc::Sender<Dispatch>,
}

impl Dispatcher {
    /// Starts the dispatcher task for `session`. The task ends when the last
    /// `Dispatcher` clone is dropped.
    pub fn spawn(session_id: impl Into<String>, session: SharedSession) -> Self {
        let session_id = session_id.into();
        let (tx, rx) = mpsc::channel(DISPATCH_QUEUE);
        tokio::spawn(run_dispatcher(session_id.clone(), session, rx));
        Self { session_id, tx }
    }

    /// Notifies every handle except `origin` and waits until all of them
    /// have their notification queued.
    pub async fn publish(&self, origin: PlayerId) -> Result<FanOut, DispatchError> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(Dispatch { origin, ack })
            .await
            .map_err(|_| DispatchError::Stopped(self.session_id.clone()))?;
        done.await
            .map_err(|_| DispatchError::Stopped(self.session_id.clone()))
    }
}

async fn run_dispatcher(
    session_id: String,
    session: SharedSession,
    mut rx: mpsc::Receiver<Dispatch>,
) {
    debug!("Dispatcher for session {} started", session_id);

    while let Some(dispatch) = rx.recv().await {
        let report = {
            let mut session = session.write().await;
            let (report, gone) = fan_out(session.subscribers_mut(), dispatch.origin);
            for player_id in gone {
                session.unbind(player_id);
            }
            report
        };

        if report.pruned > 0 {
            info!(
                "Session {}: pruned {} disconnected handle(s)",
                session_id, report.pruned
            );
        }
        debug!(
            "Session {}: change by player {} fanned out {:?}",
            session_id, dispatch.origin, report
        );

        // The publisher may have given up waiting; nothing to do then.
        let _ = dispatch.ack.send(report);
    }

    debug!("Dispatcher for session {} stopped", session_id);
}

/// Queues `origin`'s notification for everyone else. Returns the report and
/// the ids of subscribers dropped because their receiver is closed.
pub(crate) fn fan_out(
    subscribers: &mut Vec<Subscriber>,
    origin: PlayerId,
) -> (FanOut, Vec<PlayerId>) {
    let mut report = FanOut::default();
    let mut gone = Vec::new();
    let note = Notification { origin };

    subscribers.retain(|subscriber| {
        if subscriber.id == origin {
            if subscriber.sender.is_closed() {
                gone.push(subscriber.id);
                return false;
            }
            return true;
        }

        match subscriber.sender.try_send(note) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                report.coalesced += 1;
                true
            }
            Err(TrySendError::Closed(_)) => {
                report.pruned += 1;
                gone.push(subscriber.id);
                false
            }
        }
    });

    (report, gone)
}
