//! Headless input generation for driving the local pawn without a window.

use clap::ValueEnum;
use shared::InputAxes;

/// Canned movement patterns for the headless client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputPattern {
    /// Stand still.
    Idle,
    /// Run straight ahead.
    Forward,
    /// Run forward while turning at a constant rate.
    Circle,
    /// Alternate strafing left and right every second, jumping at each turn.
    Zigzag,
}

/// Produces one set of input axes per client tick.
pub struct InputManager {
    pattern: InputPattern,
    elapsed: f32,
    current: InputAxes,
}

impl InputManager {
    pub fn new(pattern: InputPattern) -> Self {
        Self {
            pattern,
            elapsed: 0.0,
            current: InputAxes::default(),
        }
    }

    /// Samples the pattern for a frame lasting `dt` seconds.
    pub fn update(&mut self, dt: f32) -> InputAxes {
        let previous_second = self.elapsed.floor();
        self.elapsed += dt;

        self.current = match self.pattern {
            InputPattern::Idle => InputAxes::default(),
            InputPattern::Forward => InputAxes::forward(1.0),
            InputPattern::Circle => InputAxes {
                forward: 1.0,
                look_yaw: 90.0 * dt,
                ..InputAxes::default()
            },
            InputPattern::Zigzag => {
                let second = self.elapsed.floor();
                let strafe = if (second as i64) % 2 == 0 { 1.0 } else { -1.0 };
                InputAxes {
                    forward: 0.5,
                    strafe,
                    jump: if second > previous_second { 1.0 } else { 0.0 },
                    ..InputAxes::default()
                }
            }
        };

        self.current
    }

    /// Returns the most recently sampled axes.
    pub fn get_current_input(&self) -> &InputAxes {
        &self.current
    }

    pub fn pattern(&self) -> InputPattern {
        self.pattern
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new(InputPattern::Idle)
    }
}
