//! # Go Terminal Client Library
//!
//! Client side of a shared Go board. A connection joins (or hosts) a
//! session on the server, sends key presses as abstract commands and redraws
//! whenever the server pushes a fresh snapshot of the session.
//!
//! ## Architecture Overview
//!
//! The client holds no game rules of its own. Every command goes to the
//! server, which validates it against the live session and answers with a
//! `State` packet when something changed. The other players in the session
//! receive the same snapshot, so every terminal shows the same board.
//!
//! ## Module Organization
//!
//! ### Input Module (`input`)
//! Maps crossterm key events to [`shared::Command`] values:
//! - WASD and the arrow keys move the shared cursor
//! - Space or Enter places a stone, Tab passes
//! - R clears a practice board, Q, Esc or Ctrl+C quits
//!
//! ### Network Module (`network`)
//! Owns the TCP connection:
//! - Join/host handshake and refusal handling
//! - A blocking key reader feeding the session loop
//! - A frame reader task so packet reads never get cancelled mid-frame
//!
//! ### Rendering Module (`rendering`)
//! Turns a [`shared::SessionView`] into text:
//! - Board grid with letter and number margins
//! - Cursor and last-move markers
//! - Seat, turn and move counters
//! - Raw-mode terminal guard that restores the screen on exit
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::network::Client;
//! use client::rendering::Renderer;
//! use shared::{Packet, PROTOCOL_VERSION};
//!
//! # async fn play() -> Result<(), Box<dyn std::error::Error>> {
//! let hello = Packet::Join {
//!     client_version: PROTOCOL_VERSION,
//!     session: "1".to_string(),
//!     name: "alice".to_string(),
//! };
//! let client = Client::connect("127.0.0.1:23234", hello, Renderer::new(true)).await?;
//! client.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod input;
pub mod network;
pub mod rendering;
