//! # Game Client Library
//!
//! Client half of the movement netcode: the locally controlled pawn is
//! predicted ahead of the server, corrected when the server disagrees, and
//! every other pawn is interpolated between the snapshots the server sends.
//!
//! ## Client-Side Prediction
//! Each tick the local input is simulated immediately with the same movement
//! step the server runs, tagged with a cyclic sequence id, queued in the input
//! history and sent to the server. The player sees the result of their input
//! without waiting a round trip.
//!
//! ## Server Reconciliation
//! When a snapshot for our own pawn arrives, the queued prediction with the
//! same sequence id is compared against it. Older queued entries are stale and
//! discarded. Small drift is accepted silently; anything beyond the configured
//! margins resets the pawn to the snapshot and replays every input the server
//! has not confirmed yet, rewriting the queue with the corrected predictions.
//!
//! ## Entity Interpolation
//! Other players' pawns are never predicted. Their snapshots are buffered and
//! the pawn blends from the previous sample to the next over one broadcast
//! interval, hiding the low update rate and network jitter at the cost of one
//! interval of delay.
//!
//! ## Module Organization
//! - `history`: queue of unconfirmed input samples
//! - `prediction`: the local pawn, including reconciliation and rewind-replay
//! - `reconciliation`: the divergence test and its outcomes
//! - `interpolation`: per-entity blend state machine for observed pawns
//! - `game`: role dispatch across all pawns known to this client
//! - `input`: headless input patterns
//! - `network`: UDP transport and the client tick loop
//!
//! ## Usage Example
//!
//! ```rust
//! use client::game::ClientGameState;
//! use shared::{InputAxes, NetConfig, Transform};
//!
//! let config = NetConfig::default();
//! let world = shared::default_world(&config);
//! let mut game = ClientGameState::new(config, world);
//!
//! game.on_connected(1, Transform::default());
//! let sample = game.tick(InputAxes::forward(1.0), 1.0 / 60.0);
//! assert!(sample.is_some());
//! ```

pub mod game;
pub mod history;
pub mod input;
pub mod interpolation;
pub mod network;
pub mod prediction;
pub mod reconciliation;
