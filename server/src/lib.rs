//! # Go Session Server Library
//!
//! This library provides the authoritative server for networked two-player
//! Go games played from terminal clients. It owns every live game, enforces
//! turn order, applies moves, and tells every other viewer of a game to
//! redraw whenever something changes.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Game State
//! Each game lives in one [`session::GameSession`]: the board, the shared
//! cursor, the side to move, the move history and the handles of everyone
//! watching. Clients never edit state themselves; they send intents and
//! receive snapshots.
//!
//! ### Player Binding
//! The first two connections to a session take the Black and White seats.
//! Later connections are admitted as spectators: they see every change but
//! any command they send is rejected. A seat freed by a disconnect goes to
//! the next connection.
//!
//! ### Change Notification
//! After a connection mutates its session, the session's
//! [`dispatcher::Dispatcher`] queues a notification for every other handle
//! before the originator continues. Queues hold at most a few entries and
//! coalesce duplicates, because viewers always redraw from live state.
//!
//! ## Architecture Design
//!
//! ### One Lock Per Session
//! Every check-then-act (is it this player's turn? then place) runs inside a
//! single write-lock critical section on the session, so two connections can
//! never both believe they are the legal mover. The process-wide
//! [`registry::SessionRegistry`] has its own lock for create-or-lookup.
//!
//! ### Task Per Connection
//! Each TCP connection gets a reader task that decodes frames and a session
//! loop that waits on either its next command or its next notification.
//! A disconnect ends only that connection and releases its seat.
//!
//! ## Module Organization
//!
//! ### Session Module (`session`)
//! Game state, seat assignment, cursor motion, placement, pass and reset.
//!
//! ### Player Module (`player`)
//! Per-connection handles and their notification queues.
//!
//! ### Dispatcher Module (`dispatcher`)
//! Per-session fan-out loop with drop-and-coalesce backpressure.
//!
//! ### Registry Module (`registry`)
//! Process-wide map from session id to session and dispatcher.
//!
//! ### Archive Module (`archive`)
//! JSON-lines persistence of finished games.
//!
//! ### Network Module (`network`)
//! TCP accept loop, handshake and per-connection session loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         address: "0.0.0.0:23234".to_string(),
//!         ..ServerConfig::default()
//!     };
//!
//!     let server = Server::bind(config).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod dispatcher;
pub mod error;
pub mod network;
pub mod player;
pub mod registry;
pub mod session;
pub mod utils;
