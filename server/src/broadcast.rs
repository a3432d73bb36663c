//! Fan-out of server events to connected sessions.

use crate::client_manager::{ClientManager, Outbound};
use log::{debug, error, warn};
use shared::{ServerMessage, SessionId};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;

/// Delivers events to every registered session.
///
/// Each event is serialized once. Delivery uses `try_send` on the per-session
/// queue, so a slow or dead client only loses its own messages.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    clients: Arc<ClientManager>,
}

impl Broadcaster {
    pub fn new(clients: Arc<ClientManager>) -> Self {
        Self { clients }
    }

    /// Sends `event` to all live sessions and returns how many accepted it
    ///
    /// The session list is copied first, so a session registering or leaving
    /// during the fan-out may or may not be reached. A serialization failure
    /// is logged and nothing is sent.
    pub async fn broadcast(&self, event: &ServerMessage) -> usize {
        let payload = match event.encode() {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize broadcast: {}", e);
                return 0;
            }
        };

        let mut delivered = 0;
        self.clients
            .for_each(|id, sender| {
                if deliver(id, sender, payload.clone()) {
                    delivered += 1;
                }
            })
            .await;
        delivered
    }

    /// Sends `event` to one session only
    ///
    /// Used for replies such as `sprites_response` and `world_state`.
    /// Returns false when the queue is full or already closed.
    pub fn send_to(&self, id: &SessionId, sender: &Outbound, event: &ServerMessage) -> bool {
        match event.encode() {
            Ok(payload) => deliver(id, sender, payload),
            Err(e) => {
                error!("Failed to serialize message for {}: {}", id, e);
                false
            }
        }
    }
}

fn deliver(id: &SessionId, sender: &Outbound, payload: String) -> bool {
    match sender.try_send(payload) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!("Outbound queue for {} is full, dropping message", id);
            false
        }
        Err(TrySendError::Closed(_)) => {
            debug!("Session {} is closing, dropping message", id);
            false
        }
    }
}
