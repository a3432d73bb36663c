//! Shared objects handed to every connection task.

use crate::broadcast::Broadcaster;
use crate::client_manager::ClientManager;
use crate::game::GameState;
use crate::persistence::Persistence;
use shared::{SpriteTable, World};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Everything a connection needs to read and change the shared world.
#[derive(Debug)]
pub struct ServerContext {
    pub game: GameState,
    pub clients: Arc<ClientManager>,
    pub broadcaster: Broadcaster,
    pub persistence: Arc<Persistence>,
    pub sprites: SpriteTable,
    sequence: Mutex<()>,
}

impl ServerContext {
    pub fn new(world: World, sprites: SpriteTable, persistence: Persistence) -> Self {
        let clients = Arc::new(ClientManager::new());
        Self {
            game: GameState::new(world),
            broadcaster: Broadcaster::new(Arc::clone(&clients)),
            clients,
            persistence: Arc::new(persistence),
            sprites,
            sequence: Mutex::new(()),
        }
    }

    /// Serializes world changes with the messages they produce.
    ///
    /// Hold the guard from the moment the world is read or changed until the
    /// resulting messages are queued. Every session then sees snapshots and
    /// updates in the order they were applied, so a `world_state` reply can
    /// never be overtaken by an older `player_moved`.
    pub async fn sequence(&self) -> MutexGuard<'_, ()> {
        self.sequence.lock().await
    }

    /// Restores the stored world. Must run before connections are accepted.
    pub async fn restore_from_disk(&self) {
        let snapshot = self.persistence.load().await;
        self.game.restore(snapshot).await;
    }

    /// Writes the current world to disk and waits for the write.
    pub async fn save_now(&self) -> Result<(), crate::persistence::PersistenceError> {
        let snapshot = self.game.snapshot().await;
        self.persistence.save(&snapshot).await
    }
}
