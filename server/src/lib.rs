//! # Presence Server Library
//!
//! This library provides the authoritative server for a shared 2-D world. It
//! keeps the canonical position and appearance of every connected player and
//! pushes each change to all connected clients over WebSocket.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! The server owns the only writable copy of the world. Clients send commands
//! (join, move, ask for the sprite table) and receive the resulting state;
//! they never write positions themselves. Movement is a fixed step clamped to
//! the world bounds.
//!
//! ### Session Management
//! Every WebSocket connection is registered under a freshly generated id, has
//! its own bounded outbound queue, and is removed (together with its player)
//! when the connection closes.
//!
//! ### Fan-out
//! Joins, moves and departures are serialized once and pushed to every live
//! session. A slow or broken client only loses its own messages.
//!
//! ## Architecture Design
//!
//! ### One Task Per Connection
//! Each connection runs its own task that reads frames in order and drives a
//! small state machine (`Connected -> Joined -> Closed`), plus a writer task
//! that drains the outbound queue into the socket. Events caused by one
//! connection are therefore broadcast in the order its commands arrived.
//!
//! ### Explicitly Shared State
//! The world store, the session registry and the persistence bridge live in a
//! [`context::ServerContext`] that is created in `main` and handed to each
//! connection. Both maps sit behind a single `RwLock`; no lock is ever held
//! while serializing, sending or touching the disk.
//!
//! ### Persistence
//! The world is written to a JSON file after every disconnect and on shutdown,
//! and read back once at startup. Storage failures are logged and never stop
//! the server.
//!
//! ## Module Organization
//!
//! - `game`: world state store (player records and bounds)
//! - `client_manager`: session registry
//! - `processor`: per-connection command handling
//! - `broadcast`: delivery to one or all sessions
//! - `persistence`: snapshot file load/save
//! - `sprites`: sprite table loading
//! - `context`: the shared bundle of the above
//! - `network`: HTTP page, WebSocket upgrade and connection tasks
//! - `config`: command-line options
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::context::ServerContext;
//! use server::network::Server;
//! use server::persistence::Persistence;
//! use shared::{default_sprites, World};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let context = Arc::new(ServerContext::new(
//!         World::default(),
//!         default_sprites(),
//!         Persistence::new("world_state.json"),
//!     ));
//!     context.restore_from_disk().await;
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     let server = Arc::new(Server::new(context, "public/index.html"));
//!     server.run(listener, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod client_manager;
pub mod config;
pub mod context;
pub mod game;
pub mod network;
pub mod persistence;
pub mod processor;
pub mod sprites;
