//! Tunables shared by both ends of the connection.
//!
//! Client and server must run with the same movement values, otherwise every
//! snapshot diverges and the client rewinds continuously.

use clap::Args;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetConfig {
    /// Simulation steps per second.
    pub tick_rate: f32,
    /// Snapshots per second the server broadcasts.
    pub net_update_frequency: f32,
    pub forward_speed: f32,
    pub strafe_speed: f32,
    /// Upward speed applied on the tick a jump starts.
    pub jump_impulse: f32,
    /// Horizontal speed is divided by this on jump initiation.
    pub jump_damping: f32,
    /// Seconds on the ground before another jump is allowed.
    pub jump_cooldown: f32,
    pub gravity: f32,
    /// Half-length of the grounded ray.
    pub ground_probe: f32,
    pub location_error_margin: f32,
    /// Degrees.
    pub rotation_error_margin: f32,
    /// Largest sequence id before wrapping to 0.
    pub sequence_max: u16,
    pub interpolation_enabled: bool,
    pub min_pitch: f32,
    pub max_pitch: f32,
    /// Longest step the server accepts from a client.
    pub max_elapsed: f32,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            net_update_frequency: 10.0,
            forward_speed: 10.0,
            strafe_speed: 10.0,
            jump_impulse: 10.0,
            jump_damping: 1.5,
            jump_cooldown: 0.1,
            gravity: 9.8,
            ground_probe: 0.1,
            location_error_margin: 0.1,
            rotation_error_margin: 5.0,
            sequence_max: 399,
            interpolation_enabled: true,
            min_pitch: -80.0,
            max_pitch: 80.0,
            max_elapsed: 0.25,
        }
    }
}

impl NetConfig {
    /// Server simulation steps between two snapshot broadcasts, never zero.
    pub fn broadcast_interval(&self) -> u32 {
        if self.net_update_frequency <= 0.0 {
            return 1;
        }
        ((self.tick_rate / self.net_update_frequency).round() as u32).max(1)
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.tick_rate.max(1.0))
    }

    /// Size of the sequence id space.
    pub fn history_capacity(&self) -> usize {
        self.sequence_max as usize + 1
    }
}

/// Command line overrides for [`NetConfig`], flattened into each binary's parser.
#[derive(Args, Debug, Clone)]
pub struct NetConfigArgs {
    /// Simulation steps per second
    #[arg(long, default_value_t = 60.0)]
    pub tick_rate: f32,

    /// Snapshot broadcasts per second
    #[arg(long, default_value_t = 10.0)]
    pub net_update_frequency: f32,

    /// Forward/backward movement speed
    #[arg(long, default_value_t = 10.0)]
    pub forward_speed: f32,

    /// Sideways movement speed
    #[arg(long, default_value_t = 10.0)]
    pub strafe_speed: f32,

    /// Gravity acceleration
    #[arg(long, default_value_t = 9.8)]
    pub gravity: f32,

    /// Allowed distance between predicted and authoritative location
    #[arg(long, default_value_t = 0.1)]
    pub location_error_margin: f32,

    /// Allowed yaw difference in degrees
    #[arg(long, default_value_t = 5.0)]
    pub rotation_error_margin: f32,

    /// Largest sequence id before wrapping
    #[arg(long, default_value_t = 399)]
    pub sequence_max: u16,

    /// Snap remote players to snapshots instead of interpolating
    #[arg(long)]
    pub no_interpolation: bool,
}

impl From<NetConfigArgs> for NetConfig {
    fn from(args: NetConfigArgs) -> Self {
        NetConfig {
            tick_rate: args.tick_rate,
            net_update_frequency: args.net_update_frequency,
            forward_speed: args.forward_speed,
            strafe_speed: args.strafe_speed,
            gravity: args.gravity,
            location_error_margin: args.location_error_margin,
            rotation_error_margin: args.rotation_error_margin,
            sequence_max: args.sequence_max,
            interpolation_enabled: !args.no_interpolation,
            ..NetConfig::default()
        }
    }
}
