//! Authoritative world state: one [`PlayerRecord`] per joined session.

use log::{debug, info};
use rand::Rng;
use shared::{Direction, PlayerRecord, SessionId, World, DEFAULT_SPRITE};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Shared store of player records keyed by session.
///
/// A single coarse lock guards the map. Every operation is O(1) apart from
/// snapshot/restore, and none of them awaits anything while holding it.
#[derive(Debug)]
pub struct GameState {
    world: World,
    players: RwLock<HashMap<SessionId, PlayerRecord>>,
}

impl GameState {
    /// Creates an empty store for `world`
    pub fn new(world: World) -> Self {
        Self {
            world,
            players: RwLock::new(HashMap::new()),
        }
    }

    pub fn world(&self) -> World {
        self.world
    }

    /// Returns the player for `id`, creating it at a random spot if needed.
    ///
    /// Joining twice is harmless: the existing record is returned untouched.
    pub async fn get_or_create_player(&self, id: &SessionId, requested_sprite: &str) -> PlayerRecord {
        let mut players = self.players.write().await;

        if let Some(existing) = players.get(id) {
            debug!("Player {} already joined", id);
            return existing.clone();
        }

        let sprite = if requested_sprite.is_empty() {
            DEFAULT_SPRITE
        } else {
            requested_sprite
        };
        let (x, y) = random_spawn(&self.world);
        let player = PlayerRecord::new(id.clone(), x, y, sprite);

        info!("Added player {} at ({:.1}, {:.1}) as '{}'", id, x, y, sprite);
        players.insert(id.clone(), player.clone());
        player
    }

    /// Applies one movement step. `None` means the session has no player.
    ///
    /// An unrecognized direction leaves the record as it is but still
    /// returns it.
    pub async fn move_player(&self, id: &SessionId, direction: &str) -> Option<PlayerRecord> {
        let mut players = self.players.write().await;
        let player = players.get_mut(id)?;

        match Direction::parse(direction) {
            Some(direction) => player.step(direction, &self.world),
            None => debug!("Player {} sent unknown direction '{}'", id, direction),
        }

        Some(player.clone())
    }

    /// Deletes the player owned by `id`
    ///
    /// Returns false when there was nothing to delete, which happens for
    /// sessions that never joined or were already removed.
    pub async fn remove_player(&self, id: &SessionId) -> bool {
        let removed = self.players.write().await.remove(id).is_some();
        if removed {
            info!("Removed player {}", id);
        }
        removed
    }

    pub async fn get_player(&self, id: &SessionId) -> Option<PlayerRecord> {
        self.players.read().await.get(id).cloned()
    }

    /// Copies every record out from under the lock
    ///
    /// The copy is what gets sent as `world_state` and what gets saved, so
    /// later changes never leak into a message already being serialized.
    pub async fn snapshot(&self) -> HashMap<SessionId, PlayerRecord> {
        self.players.read().await.clone()
    }

    /// Replaces every record. Positions are pulled back inside the world.
    pub async fn restore(&self, mut records: HashMap<SessionId, PlayerRecord>) {
        for (id, player) in records.iter_mut() {
            player.id = id.clone();
            let (x, y) = self.world.clamp(player.x, player.y);
            player.x = x;
            player.y = y;
        }

        let count = records.len();
        *self.players.write().await = records;
        info!("Restored {} player(s)", count);
    }

    /// Number of players currently in the world
    pub async fn len(&self) -> usize {
        self.players.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.players.read().await.is_empty()
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(World::default())
    }
}

fn random_spawn(world: &World) -> (f32, f32) {
    let mut rng = rand::thread_rng();
    (
        rng.gen_range(0.0..=world.max_x()),
        rng.gen_range(0.0..=world.max_y()),
    )
}
