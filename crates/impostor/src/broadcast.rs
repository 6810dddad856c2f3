//! Fan-out of server events to connections.
//!
//! The coordinator never touches sockets. It hands events to a
//! [`Broadcaster`], which routes them to rooms or single players. The
//! production implementation, [`ConnectionHub`], keeps one unbounded
//! queue per connection; each connection's writer task drains it.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use impostor_protocol::{PlayerId, RoomCode};
use tokio::sync::mpsc;

use crate::events::ServerEvent;

/// Routes events to room subscribers or to individual players.
///
/// Calls are synchronous and must not block: the coordinator emits
/// while holding its own state lock.
pub trait Broadcaster: Send + Sync + 'static {
    /// Adds `player` to the audience of `code`.
    fn subscribe(&self, code: &RoomCode, player: PlayerId);

    /// Removes `player` from the audience of `code`.
    fn unsubscribe(&self, code: &RoomCode, player: PlayerId);

    /// Sends `event` to every subscriber of `code`.
    fn emit_to_room(&self, code: &RoomCode, event: &ServerEvent);

    /// Sends `event` to one player. Returns `false` if the player has no
    /// live connection.
    fn emit_to_player(&self, player: PlayerId, event: &ServerEvent) -> bool;
}

#[derive(Debug, Default)]
struct HubInner {
    outboxes: HashMap<PlayerId, mpsc::UnboundedSender<ServerEvent>>,
    audiences: HashMap<RoomCode, BTreeSet<PlayerId>>,
}

/// [`Broadcaster`] over per-connection queues.
#[derive(Debug, Default)]
pub struct ConnectionHub {
    inner: Mutex<HubInner>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the outbound queue for a new connection.
    pub fn register(&self, player: PlayerId) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().outboxes.insert(player, tx);
        rx
    }

    /// Closes `player`'s queue and drops them from every audience.
    ///
    /// The connection's writer task ends once the queue drains.
    pub fn unregister(&self, player: PlayerId) {
        let mut inner = self.lock();
        inner.outboxes.remove(&player);
        inner.audiences.retain(|_, members| {
            members.remove(&player);
            !members.is_empty()
        });
    }

    pub fn is_connected(&self, player: PlayerId) -> bool {
        self.lock().outboxes.contains_key(&player)
    }

    // A panic while holding the lock cannot leave the maps half-updated,
    // so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Broadcaster for ConnectionHub {
    fn subscribe(&self, code: &RoomCode, player: PlayerId) {
        self.lock()
            .audiences
            .entry(code.clone())
            .or_default()
            .insert(player);
    }

    fn unsubscribe(&self, code: &RoomCode, player: PlayerId) {
        let mut inner = self.lock();
        if let Some(members) = inner.audiences.get_mut(code) {
            members.remove(&player);
            if members.is_empty() {
                inner.audiences.remove(code);
            }
        }
    }

    fn emit_to_room(&self, code: &RoomCode, event: &ServerEvent) {
        let inner = self.lock();
        let Some(members) = inner.audiences.get(code) else {
            return;
        };
        for player in members {
            if let Some(tx) = inner.outboxes.get(player) {
                if tx.send(event.clone()).is_err() {
                    tracing::debug!(%code, %player, event = event.name(), "dropped room event");
                }
            }
        }
    }

    fn emit_to_player(&self, player: PlayerId, event: &ServerEvent) -> bool {
        let inner = self.lock();
        match inner.outboxes.get(&player) {
            Some(tx) => tx.send(event.clone()).is_ok(),
            None => {
                tracing::debug!(%player, event = event.name(), "no connection for player");
                false
            }
        }
    }
}
