//! Registry of live connections for the presence server
//!
//! This module tracks every connected session, including:
//! - Identity assignment on connect (random, never shared by two live sessions)
//! - The outbound queue used to push messages to each session
//! - Snapshot iteration so broadcasts never hold the registry lock while sending
//!
//! A reconnecting client always gets a fresh identity; nothing here survives a
//! closed connection.

use log::{info, warn};
use shared::SessionId;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Handle used to push serialized messages to one session.
pub type Outbound = mpsc::Sender<String>;

/// A connected session and its transport handle
#[derive(Debug, Clone)]
pub struct Client {
    /// Identity assigned by the registry
    pub id: SessionId,
    /// Queue drained by the connection's writer task
    pub sender: Outbound,
    /// When the connection was registered
    pub connected_at: Instant,
}

impl Client {
    /// Creates a client record stamped with the current time
    pub fn new(id: SessionId, sender: Outbound) -> Self {
        Self {
            id,
            sender,
            connected_at: Instant::now(),
        }
    }

    pub fn connected_for(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// Concurrent registry of all live sessions
///
/// Registration is a single check-and-insert under the write lock, so an id is
/// never handed to two live sessions even if the generator repeats itself.
#[derive(Debug, Default)]
pub struct ClientManager {
    clients: RwLock<HashMap<SessionId, Client>>,
}

impl ClientManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session and returns its freshly generated id.
    pub async fn register(&self, sender: Outbound) -> SessionId {
        self.register_with(sender, || Uuid::new_v4().to_string())
            .await
    }

    /// Registers using `generate` as the id source, retrying on collision.
    pub async fn register_with<F>(&self, sender: Outbound, mut generate: F) -> SessionId
    where
        F: FnMut() -> String,
    {
        let mut clients = self.clients.write().await;

        let id = loop {
            let candidate = SessionId::new(generate());
            if !clients.contains_key(&candidate) {
                break candidate;
            }
            warn!("Generated session id {} is already live, retrying", candidate);
        };

        clients.insert(id.clone(), Client::new(id.clone(), sender));
        info!("Session {} connected ({} live)", id, clients.len());
        id
    }

    /// Removes a session. Returns false if it was already gone.
    pub async fn unregister(&self, id: &SessionId) -> bool {
        let mut clients = self.clients.write().await;
        match clients.remove(id) {
            Some(client) => {
                info!(
                    "Session {} disconnected after {:.1}s ({} live)",
                    id,
                    client.connected_for().as_secs_f32(),
                    clients.len()
                );
                true
            }
            None => false,
        }
    }

    /// Copies out every live session's id and handle.
    pub async fn snapshot(&self) -> Vec<(SessionId, Outbound)> {
        self.clients
            .read()
            .await
            .values()
            .map(|client| (client.id.clone(), client.sender.clone()))
            .collect()
    }

    /// Calls `f` for each session live at the moment of the call.
    ///
    /// The lock is released before `f` runs; sessions that join or leave
    /// meanwhile may or may not be visited.
    pub async fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&SessionId, &Outbound),
    {
        for (id, sender) in self.snapshot().await {
            f(&id, &sender);
        }
    }

    /// Checks whether `id` belongs to a live session
    ///
    /// Ids are never reused while live, but a closed session's id may in
    /// principle come back later from the generator.
    pub async fn contains(&self, id: &SessionId) -> bool {
        self.clients.read().await.contains_key(id)
    }

    /// Number of live sessions, joined or not
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn channel() -> (Outbound, mpsc::Receiver<String>) {
        mpsc::channel(8)
    }

    #[tokio::test]
    async fn test_register_assigns_unique_ids() {
        let manager = ClientManager::new();
        let mut ids = HashSet::new();

        for _ in 0..100 {
            let (tx, _rx) = channel();
            assert!(ids.insert(manager.register(tx).await));
        }

        assert_eq!(manager.len().await, 100);
    }

    #[tokio::test]
    async fn test_register_retries_on_collision() {
        let manager = ClientManager::new();
        let mut candidates = vec!["b", "a", "a"];

        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();
        let first = manager
            .register_with(tx1, || candidates.pop().unwrap().to_string())
            .await;
        let second = manager
            .register_with(tx2, || candidates.pop().unwrap().to_string())
            .await;

        assert_eq!(first, SessionId::from("a"));
        assert_eq!(second, SessionId::from("b"));
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let manager = ClientManager::new();
        let (tx, _rx) = channel();
        let id = manager.register(tx).await;

        assert!(manager.contains(&id).await);
        assert!(manager.unregister(&id).await);
        assert!(!manager.unregister(&id).await);
        assert!(manager.is_empty().await);
    }

    #[tokio::test]
    async fn test_for_each_visits_every_session() {
        let manager = ClientManager::new();
        let mut receivers = Vec::new();
        for _ in 0..5 {
            let (tx, rx) = channel();
            manager.register(tx).await;
            receivers.push(rx);
        }

        let mut visited = Vec::new();
        manager
            .for_each(|id, sender| {
                visited.push(id.clone());
                sender.try_send(format!("hello {id}")).unwrap();
            })
            .await;

        assert_eq!(visited.len(), 5);
        for mut rx in receivers {
            assert!(rx.try_recv().unwrap().starts_with("hello "));
        }
    }

    #[tokio::test]
    async fn test_for_each_skips_removed_sessions() {
        let manager = ClientManager::new();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();
        let gone = manager.register(tx1).await;
        let kept = manager.register(tx2).await;
        manager.unregister(&gone).await;

        let mut visited = Vec::new();
        manager.for_each(|id, _| visited.push(id.clone())).await;

        assert_eq!(visited, vec![kept]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_register_and_iterate() {
        let manager = Arc::new(ClientManager::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    let (tx, _rx) = mpsc::channel(1);
                    let id = manager.register(tx).await;
                    let mut seen = 0;
                    manager.for_each(|_, _| seen += 1).await;
                    assert!(seen >= 1);
                    assert!(manager.unregister(&id).await);
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
        assert!(manager.is_empty().await);
    }
}
