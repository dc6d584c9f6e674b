//! Types and simulation code shared by the client and the server.
//!
//! The movement step in [`movement`] is the foundation of prediction: the
//! client runs it ahead of the server, the server runs it on the same inputs,
//! and the two results are compared when snapshots come back.

pub mod config;
pub mod error;
pub mod math;
pub mod movement;
pub mod protocol;
pub mod role;
pub mod sequence;
pub mod world;

pub use config::{NetConfig, NetConfigArgs};
pub use error::{PacketError, ValidationError};
pub use math::{Rotator, Transform, Vec3};
pub use movement::{advance, InputAxes, MotionState, MovementSettings, MovementState};
pub use protocol::{AuthoritativeSnapshot, InputSample, Packet};
pub use role::Role;
pub use sequence::{SequenceCounter, SequenceId};
pub use world::{Collision, Plane, PlaneWorld, Sweep};

pub const PROTOCOL_VERSION: u32 = 1;

/// Half-width of the default arena both binaries simulate in.
pub const ARENA_HALF_EXTENT: f32 = 100.0;

/// The collision world used by both binaries.
pub fn default_world(config: &NetConfig) -> PlaneWorld {
    PlaneWorld::arena(ARENA_HALF_EXTENT, config.ground_probe)
}
