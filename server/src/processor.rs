//! Per-connection command processing.
//!
//! Each connection owns a [`Connection`] that walks through
//! `Connected -> Joined -> Closed`. Inbound text is decoded here, applied to
//! the shared [`GameState`](crate::game::GameState), and turned into replies
//! for the sender and broadcasts for everyone.

use crate::client_manager::Outbound;
use crate::context::ServerContext;
use log::{debug, warn};
use shared::{ClientMessage, ServerMessage, SessionId};
use std::sync::Arc;

/// Lifecycle of one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Registered, no player yet
    Connected,
    /// Player record exists
    Joined,
    /// Terminal
    Closed,
}

/// Command processor for a single WebSocket connection
///
/// Owns the session id assigned at registration, the session's outbound
/// queue and a handle on the shared context. Messages from one connection are
/// handled strictly in arrival order because the reader task awaits each one
/// before reading the next frame.
#[derive(Debug)]
pub struct Connection {
    id: SessionId,
    state: SessionState,
    outbound: Outbound,
    context: Arc<ServerContext>,
}

impl Connection {
    /// Registers a new session whose messages are pushed into `outbound`
    ///
    /// The session is live for broadcasts from this point on, but it has no
    /// player until it sends `player_join`.
    pub async fn open(context: Arc<ServerContext>, outbound: Outbound) -> Self {
        let id = context.clients.register(outbound.clone()).await;
        Self {
            id,
            state: SessionState::Connected,
            outbound,
            context,
        }
    }

    /// Identity assigned by the registry
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Decodes and applies one inbound text frame
    ///
    /// Input that does not decode is logged at warn level and dropped.
    /// Nothing is sent back to the client.
    pub async fn handle_text(&mut self, text: &str) {
        match ClientMessage::decode(text) {
            Ok(message) => self.handle_message(message).await,
            Err(e) => warn!("Dropping malformed message from {}: {}", self.id, e),
        }
    }

    /// Applies one decoded message
    ///
    /// - `request_sprites` answers the sender with the sprite table
    /// - `player_join` creates the player (once), replies with the world and
    ///   announces the player to everyone
    /// - `player_move` steps the player and broadcasts the new position,
    ///   but only once the session has joined
    ///
    /// Unknown message types and anything arriving after close are ignored.
    pub async fn handle_message(&mut self, message: ClientMessage) {
        if self.state == SessionState::Closed {
            debug!("Ignoring message from closed session {}", self.id);
            return;
        }

        match message {
            ClientMessage::RequestSprites => {
                self.reply(&ServerMessage::SpritesResponse {
                    sprites: self.context.sprites.clone(),
                });
            }
            ClientMessage::PlayerJoin { sprite } => self.join(sprite.as_deref().unwrap_or("")).await,
            ClientMessage::PlayerMove { direction } => self.move_player(&direction).await,
            ClientMessage::Unknown => debug!("Ignoring unknown message type from {}", self.id),
        }
    }

    async fn join(&mut self, sprite: &str) {
        let _sequence = self.context.sequence().await;
        let player = self.context.game.get_or_create_player(&self.id, sprite).await;
        self.state = SessionState::Joined;

        let players = self.context.game.snapshot().await;
        self.reply(&ServerMessage::WorldState { players });
        self.context
            .broadcaster
            .broadcast(&ServerMessage::PlayerJoined { player })
            .await;
    }

    async fn move_player(&mut self, direction: &str) {
        if self.state != SessionState::Joined {
            debug!("Ignoring move from {} before join", self.id);
            return;
        }

        let _sequence = self.context.sequence().await;
        if let Some(player) = self.context.game.move_player(&self.id, direction).await {
            self.context
                .broadcaster
                .broadcast(&ServerMessage::PlayerMoved { player })
                .await;
        }
    }

    /// Tears the session down: drops its player, unregisters it, tells
    /// everyone else and schedules a save. Safe to call more than once.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;

        let _sequence = self.context.sequence().await;
        self.context.game.remove_player(&self.id).await;
        self.context.clients.unregister(&self.id).await;
        self.context
            .broadcaster
            .broadcast(&ServerMessage::PlayerLeft {
                player_id: self.id.clone(),
            })
            .await;

        let snapshot = self.context.game.snapshot().await;
        self.context.persistence.save_in_background(snapshot);
    }

    fn reply(&self, message: &ServerMessage) {
        self.context
            .broadcaster
            .send_to(&self.id, &self.outbound, message);
    }
}
