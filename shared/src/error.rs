//! Errors raised at the network boundary, before the movement core runs.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PacketError {
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("invalid payload: {0}")]
    Invalid(#[from] ValidationError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("sequence id {sequence} exceeds wrap bound {max}")]
    SequenceOutOfRange { sequence: u16, max: u16 },

    #[error("{axis} axis value {value} outside [-1, 1]")]
    AxisOutOfRange { axis: &'static str, value: f32 },

    #[error("{0} is not finite")]
    NonFinite(&'static str),

    #[error("elapsed time {elapsed}s outside (0, {max}]")]
    ElapsedOutOfRange { elapsed: f32, max: f32 },
}
