//! Wire messages exchanged between predicting clients, the server and observers.

use crate::config::NetConfig;
use crate::error::{PacketError, ValidationError};
use crate::math::{Rotator, Transform, Vec3};
use crate::movement::{InputAxes, MotionState, MovementState};
use crate::sequence::SequenceId;
use bincode::{deserialize, serialize};
use serde::{Deserialize, Serialize};

/// One client tick: the inputs that drove it and the transform the client
/// predicted from them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputSample {
    pub sequence: SequenceId,
    pub axes: InputAxes,
    pub elapsed_seconds: f32,
    pub predicted: Transform,
}

impl InputSample {
    /// Rejects payloads the server must never simulate.
    pub fn validate(&self, config: &NetConfig) -> Result<(), ValidationError> {
        if self.sequence.value() > config.sequence_max {
            return Err(ValidationError::SequenceOutOfRange {
                sequence: self.sequence.value(),
                max: config.sequence_max,
            });
        }

        let axes = [
            ("forward", self.axes.forward),
            ("strafe", self.axes.strafe),
            ("jump", self.axes.jump),
        ];
        for (name, value) in axes {
            if !value.is_finite() {
                return Err(ValidationError::NonFinite(name));
            }
            if !(-1.0..=1.0).contains(&value) {
                return Err(ValidationError::AxisOutOfRange { axis: name, value });
            }
        }

        if !self.axes.look_yaw.is_finite() {
            return Err(ValidationError::NonFinite("look_yaw"));
        }
        if !self.axes.look_pitch.is_finite() {
            return Err(ValidationError::NonFinite("look_pitch"));
        }

        if !self.elapsed_seconds.is_finite()
            || self.elapsed_seconds <= 0.0
            || self.elapsed_seconds > config.max_elapsed
        {
            return Err(ValidationError::ElapsedOutOfRange {
                elapsed: self.elapsed_seconds,
                max: config.max_elapsed,
            });
        }

        Ok(())
    }
}

/// Server result of simulating one client input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuthoritativeSnapshot {
    pub sequence: SequenceId,
    pub location: Vec3,
    pub rotation: Rotator,
    pub yaw_turn: f32,
    pub motion: MotionState,
    /// Seconds since the server started.
    pub server_time: f32,
}

impl AuthoritativeSnapshot {
    pub fn from_state(state: &MovementState, sequence: SequenceId, server_time: f32) -> Self {
        Self {
            sequence,
            location: state.transform.location,
            rotation: state.transform.rotation,
            yaw_turn: state.yaw_turn,
            motion: state.motion,
            server_time,
        }
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.location, self.rotation)
    }

    /// The movement state a rewind restarts from.
    pub fn movement_state(&self) -> MovementState {
        MovementState {
            transform: self.transform(),
            yaw_turn: self.yaw_turn,
            motion: self.motion,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    ClientInput {
        sample: InputSample,
    },
    Disconnect,

    Connected {
        client_id: u32,
        spawn: Transform,
    },
    ServerSnapshot {
        entity_id: u32,
        snapshot: AuthoritativeSnapshot,
    },
    /// The player owning `entity_id` disconnected or timed out.
    PlayerLeft {
        entity_id: u32,
    },
    Disconnected {
        reason: String,
    },
}

impl Packet {
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        Ok(serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Packet, PacketError> {
        Ok(deserialize(bytes)?)
    }

    /// Checks client-supplied payloads before anything simulates them.
    pub fn validate(&self, config: &NetConfig) -> Result<(), PacketError> {
        match self {
            Packet::ClientInput { sample } => Ok(sample.validate(config)?),
            _ => Ok(()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Packet::Connect { .. } => "Connect",
            Packet::ClientInput { .. } => "ClientInput",
            Packet::Disconnect => "Disconnect",
            Packet::Connected { .. } => "Connected",
            Packet::ServerSnapshot { .. } => "ServerSnapshot",
            Packet::PlayerLeft { .. } => "PlayerLeft",
            Packet::Disconnected { .. } => "Disconnected",
        }
    }
}
