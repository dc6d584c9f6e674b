//! # Game Server Library
//!
//! Authoritative half of the movement netcode. The server owns the true state
//! of every pawn: it simulates each client input with the same movement step
//! the client predicted with, records the result, and periodically broadcasts
//! it so the owning client can reconcile and everyone else can interpolate.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Inputs are simulated the moment they arrive, one movement step per input,
//! using the elapsed time the client recorded for that tick. Each result is
//! stamped with the server uptime and the input's sequence id.
//!
//! ### Snapshot Broadcasting
//! Every player carries a counter of simulated inputs. When it reaches
//! `round(tick_rate / net_update_frequency)` the counter resets and the latest
//! result is broadcast to all connected clients, unreliably.
//!
//! ### Lag Compensation
//! Every result is kept in a per-player history keyed by sequence id. Hit-scan
//! code can move a player back to where it stood after a given input, test
//! against that transform, and restore the live one afterwards.
//!
//! ### Client Management
//! Handles the lifecycle of client connections:
//! - Connection establishment and spawn assignment
//! - Input validation before anything is simulated
//! - Disconnection and timeout cleanup
//!
//! ## Module Organization
//!
//! - `history`: per-player sequence id to snapshot map with wrap generations
//! - `authority`: one player's authoritative simulation and rewind/restore
//! - `game`: all players and the collision world
//! - `client_manager`: connection tracking, capacity and timeouts
//! - `network`: UDP tasks and the main server loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use shared::NetConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Bind, then serve up to 32 clients with the default tunables.
//!     let mut server = Server::new("127.0.0.1:8080", NetConfig::default(), 32).await?;
//!
//!     // Runs until a shutdown message arrives:
//!     // - receives and validates client inputs
//!     // - simulates each input and records the result
//!     // - broadcasts snapshots at the configured update frequency
//!     // - evicts clients that stop sending
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! The server uses an event-driven architecture with internal async tasks:
//! - **Network Receiver**: continuously listens for incoming packets
//! - **Network Sender**: processes the outgoing packet queue and broadcasts
//! - **Timeout Checker**: removes clients that have gone silent
//! - **Main Loop**: owns the game state and handles every packet in order

pub mod authority;
pub mod client_manager;
pub mod game;
pub mod history;
pub mod network;

pub use authority::{ServerPlayer, SimulationStep};
pub use history::{HistoryEntry, LagCompensationError, ServerHistory};
