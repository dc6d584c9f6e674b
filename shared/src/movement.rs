//! The movement step executed identically by the predicting client and the
//! authoritative server.
//!
//! Reconciliation only works if both sides produce the same result from the
//! same starting state and input, so [`advance`] reads nothing but its
//! arguments: the starting [`MovementState`], the input axes, the step length,
//! the tuning values and an immutable collision world.

use crate::config::NetConfig;
use crate::math::{Transform, Vec3};
use crate::world::Collision;
use serde::{Deserialize, Serialize};

/// Axis values sampled from the player's controls for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct InputAxes {
    /// Forward (+1) / backward (-1).
    pub forward: f32,
    /// Right (+1) / left (-1).
    pub strafe: f32,
    /// 1.0 requests a jump.
    pub jump: f32,
    /// Degrees added to the yaw accumulator.
    pub look_yaw: f32,
    /// Degrees added to the camera pitch; never replicated.
    pub look_pitch: f32,
}

impl InputAxes {
    pub fn forward(value: f32) -> Self {
        Self {
            forward: value,
            ..Self::default()
        }
    }

    pub fn wants_jump(&self) -> bool {
        self.jump >= 1.0
    }
}

/// Movement values that persist between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionState {
    /// Per-second move direction. Horizontal parts are set while grounded and
    /// carried through the air; the vertical part integrates gravity.
    pub velocity: Vec3,
    pub can_jump: bool,
    pub jump_timer: f32,
}

impl Default for MotionState {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            can_jump: true,
            jump_timer: 0.0,
        }
    }
}

/// Everything [`advance`] reads and writes for one pawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MovementState {
    pub transform: Transform,
    /// Unwrapped yaw; the replicated rotation's yaw is set from it each tick.
    pub yaw_turn: f32,
    pub motion: MotionState,
}

impl MovementState {
    pub fn new(transform: Transform) -> Self {
        Self {
            transform,
            yaw_turn: transform.rotation.yaw,
            motion: MotionState::default(),
        }
    }
}

/// Speeds and physics constants used by [`advance`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementSettings {
    pub forward_speed: f32,
    pub strafe_speed: f32,
    pub jump_impulse: f32,
    pub jump_damping: f32,
    pub jump_cooldown: f32,
    pub gravity: f32,
}

impl From<&NetConfig> for MovementSettings {
    fn from(config: &NetConfig) -> Self {
        Self {
            forward_speed: config.forward_speed,
            strafe_speed: config.strafe_speed,
            jump_impulse: config.jump_impulse,
            jump_damping: config.jump_damping,
            jump_cooldown: config.jump_cooldown,
            gravity: config.gravity,
        }
    }
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self::from(&NetConfig::default())
    }
}

/// Runs one movement step.
///
/// Rotation is applied first, then the move direction is derived from the new
/// facing, then the pawn is swept through the world once.
pub fn advance<W: Collision + ?Sized>(
    state: &MovementState,
    input: &InputAxes,
    elapsed: f32,
    settings: &MovementSettings,
    world: &W,
) -> MovementState {
    let mut next = *state;

    next.yaw_turn += input.look_yaw;
    next.transform.rotation.yaw = next.yaw_turn;

    next.motion = step_motion(
        &state.motion,
        &next.transform,
        input,
        elapsed,
        settings,
        world,
    );

    let displacement = next.motion.velocity * elapsed;
    let sweep = world.sweep_and_slide(
        next.transform.location,
        displacement,
        next.transform.rotation,
    );
    next.transform.location += sweep.displacement;

    next
}

fn step_motion<W: Collision + ?Sized>(
    motion: &MotionState,
    transform: &Transform,
    input: &InputAxes,
    elapsed: f32,
    settings: &MovementSettings,
    world: &W,
) -> MotionState {
    let mut next = *motion;

    if !world.is_grounded(transform.location) {
        next.velocity.z -= settings.gravity * elapsed;
        return next;
    }

    if !next.can_jump {
        next.jump_timer += elapsed;
        if next.jump_timer > settings.jump_cooldown {
            next.can_jump = true;
            next.jump_timer = 0.0;
        }
    }

    let forward = transform.rotation.forward_vector() * (input.forward * settings.forward_speed);
    let right = transform.rotation.right_vector() * (input.strafe * settings.strafe_speed);
    next.velocity = forward + right;
    next.velocity.z = 0.0;

    if input.wants_jump() && next.can_jump {
        next.velocity.x /= settings.jump_damping;
        next.velocity.y /= settings.jump_damping;
        next.velocity.z = settings.jump_impulse;
        next.can_jump = false;
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Rotator;
    use crate::world::PlaneWorld;
    use assert_approx_eq::assert_approx_eq;

    fn world() -> PlaneWorld {
        PlaneWorld::flat(0.0, 0.1)
    }

    #[test]
    fn test_forward_one_second_from_origin() {
        let state = MovementState::new(Transform::default());
        let next = advance(
            &state,
            &InputAxes::forward(1.0),
            1.0,
            &MovementSettings::default(),
            &world(),
        );
        assert_eq!(next.transform.location, Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_identical_inputs_give_identical_results() {
        let settings = MovementSettings::default();
        let world = PlaneWorld::arena(20.0, 0.1);
        let inputs = [
            InputAxes { forward: 1.0, strafe: 0.3, jump: 0.0, look_yaw: 2.5, look_pitch: 0.0 },
            InputAxes { forward: 0.7, strafe: -1.0, jump: 1.0, look_yaw: -1.0, look_pitch: 3.0 },
            InputAxes { forward: -0.2, strafe: 0.0, jump: 0.0, look_yaw: 11.0, look_pitch: 0.0 },
        ];

        let mut client = MovementState::new(Transform::new(Vec3::new(1.0, 2.0, 0.0), Rotator::from_yaw(30.0)));
        let mut server = client;
        for step in 0..240 {
            let input = &inputs[step % inputs.len()];
            client = advance(&client, input, 1.0 / 60.0, &settings, &world);
            server = advance(&server, input, 1.0 / 60.0, &settings, &world);
            assert_eq!(client, server);
        }
    }

    #[test]
    fn test_rotation_is_applied_before_translation() {
        let state = MovementState::new(Transform::default());
        let input = InputAxes { forward: 1.0, look_yaw: 90.0, ..InputAxes::default() };
        let next = advance(&state, &input, 1.0, &MovementSettings::default(), &world());

        assert_eq!(next.transform.rotation.yaw, 90.0);
        assert_eq!(next.yaw_turn, 90.0);
        assert_approx_eq!(next.transform.location.x, 0.0, 1e-4);
        assert_approx_eq!(next.transform.location.y, 10.0, 1e-4);
    }

    #[test]
    fn test_yaw_accumulates_without_wrapping() {
        let mut state = MovementState::new(Transform::default());
        let input = InputAxes { look_yaw: 100.0, ..InputAxes::default() };
        for _ in 0..5 {
            state = advance(&state, &input, 0.1, &MovementSettings::default(), &world());
        }
        assert_eq!(state.yaw_turn, 500.0);
        assert_eq!(state.transform.rotation.yaw, 500.0);
    }

    #[test]
    fn test_jump_damps_horizontal_and_starts_cooldown() {
        let settings = MovementSettings::default();
        let state = MovementState::new(Transform::default());
        let input = InputAxes { forward: 1.0, jump: 1.0, ..InputAxes::default() };
        let next = advance(&state, &input, 1.0 / 60.0, &settings, &world());

        assert!(!next.motion.can_jump);
        assert_approx_eq!(next.motion.velocity.x, settings.forward_speed / settings.jump_damping, 1e-5);
        assert_eq!(next.motion.velocity.z, settings.jump_impulse);
        assert!(next.transform.location.z > 0.0);
    }

    #[test]
    fn test_gravity_accumulates_while_airborne() {
        let settings = MovementSettings::default();
        let mut state = MovementState::new(Transform::new(Vec3::new(0.0, 0.0, 100.0), Rotator::default()));
        let dt = 0.1;

        state = advance(&state, &InputAxes::default(), dt, &settings, &world());
        assert_approx_eq!(state.motion.velocity.z, -settings.gravity * dt, 1e-5);

        state = advance(&state, &InputAxes::default(), dt, &settings, &world());
        assert_approx_eq!(state.motion.velocity.z, -2.0 * settings.gravity * dt, 1e-5);
        assert!(state.transform.location.z < 100.0);
    }

    #[test]
    fn test_air_control_is_ignored() {
        let settings = MovementSettings::default();
        let state = MovementState::new(Transform::new(Vec3::new(0.0, 0.0, 50.0), Rotator::default()));
        let next = advance(&state, &InputAxes::forward(1.0), 0.5, &settings, &world());
        assert_eq!(next.motion.velocity.x, 0.0);
        assert_eq!(next.transform.location.x, 0.0);
    }

    #[test]
    fn test_falling_pawn_lands_on_floor() {
        let settings = MovementSettings::default();
        let world = world();
        let mut state = MovementState::new(Transform::new(Vec3::new(0.0, 0.0, 1.0), Rotator::default()));
        for _ in 0..120 {
            state = advance(&state, &InputAxes::default(), 1.0 / 60.0, &settings, &world);
        }
        // The pawn settles anywhere inside the ground probe.
        assert!(state.transform.location.z > -1e-4);
        assert!(state.transform.location.z <= 0.1 + 1e-4);
        assert!(world.is_grounded(state.transform.location));
        assert_eq!(state.motion.velocity.z, 0.0);
    }

    #[test]
    fn test_jump_cooldown_rearms_after_threshold() {
        let settings = MovementSettings::default();
        let world = world();
        let mut state = MovementState::new(Transform::default());
        state.motion.can_jump = false;

        state = advance(&state, &InputAxes::default(), 0.05, &settings, &world);
        assert!(!state.motion.can_jump);
        state = advance(&state, &InputAxes::default(), 0.06, &settings, &world);
        assert!(state.motion.can_jump);
        assert_eq!(state.motion.jump_timer, 0.0);
    }
}
