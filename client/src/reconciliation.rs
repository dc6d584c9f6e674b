//! Divergence test between a predicted sample and an authoritative snapshot.

use shared::math::yaw_difference;
use shared::{AuthoritativeSnapshot, InputSample, NetConfig};

/// How far a prediction may drift before it is corrected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorMargins {
    pub location: f32,
    /// Degrees.
    pub rotation: f32,
}

impl From<&NetConfig> for ErrorMargins {
    fn from(config: &NetConfig) -> Self {
        Self {
            location: config.location_error_margin,
            rotation: config.rotation_error_margin,
        }
    }
}

/// Measured drift that exceeded at least one margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Divergence {
    pub location_error: f32,
    pub yaw_error: f32,
    pub location_exceeded: bool,
    pub rotation_exceeded: bool,
}

/// Result of handing one snapshot to the predicting client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReconcileOutcome {
    /// Prediction was within tolerance; nothing changed.
    Accepted,
    /// Prediction diverged and the client rewound and replayed.
    Corrected { divergence: Divergence, replayed: usize },
    /// No queued sample carried the snapshot's sequence id.
    Dropped,
}

impl ReconcileOutcome {
    pub fn was_corrected(&self) -> bool {
        matches!(self, ReconcileOutcome::Corrected { .. })
    }
}

/// Compares what the client predicted for a sequence id with what the server
/// computed for it. Drift exactly equal to a margin is accepted.
pub fn check_divergence(
    predicted: &InputSample,
    authoritative: &AuthoritativeSnapshot,
    margins: &ErrorMargins,
) -> Option<Divergence> {
    let distance_squared = predicted
        .predicted
        .location
        .distance_squared(&authoritative.location);
    let location_exceeded = distance_squared > margins.location * margins.location;

    let yaw_error = yaw_difference(predicted.predicted.rotation.yaw, authoritative.rotation.yaw);
    let rotation_exceeded = yaw_error > margins.rotation;

    if location_exceeded || rotation_exceeded {
        Some(Divergence {
            location_error: distance_squared.sqrt(),
            yaw_error,
            location_exceeded,
            rotation_exceeded,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{InputAxes, MotionState, Rotator, SequenceId, Transform, Vec3};

    fn predicted(location: Vec3, yaw: f32) -> InputSample {
        InputSample {
            sequence: SequenceId(1),
            axes: InputAxes::default(),
            elapsed_seconds: 1.0 / 60.0,
            predicted: Transform::new(location, Rotator::from_yaw(yaw)),
        }
    }

    fn snapshot(location: Vec3, yaw: f32) -> AuthoritativeSnapshot {
        AuthoritativeSnapshot {
            sequence: SequenceId(1),
            location,
            rotation: Rotator::from_yaw(yaw),
            yaw_turn: yaw,
            motion: MotionState::default(),
            server_time: 0.0,
        }
    }

    fn margins() -> ErrorMargins {
        ErrorMargins::from(&NetConfig::default())
    }

    #[test]
    fn test_identical_state_is_accepted() {
        let result = check_divergence(
            &predicted(Vec3::new(10.0, 0.0, 0.0), 0.0),
            &snapshot(Vec3::new(10.0, 0.0, 0.0), 0.0),
            &margins(),
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_delta_equal_to_margin_is_accepted() {
        let result = check_divergence(
            &predicted(Vec3::ZERO, 0.0),
            &snapshot(Vec3::new(0.1, 0.0, 0.0), 0.0),
            &margins(),
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_delta_above_margin_diverges() {
        let result = check_divergence(
            &predicted(Vec3::ZERO, 0.0),
            &snapshot(Vec3::new(0.1 + 1e-4, 0.0, 0.0), 0.0),
            &margins(),
        )
        .unwrap();
        assert!(result.location_exceeded);
        assert!(!result.rotation_exceeded);
    }

    #[test]
    fn test_desync_is_flagged() {
        let result = check_divergence(
            &predicted(Vec3::new(10.0, 0.0, 0.0), 0.0),
            &snapshot(Vec3::new(10.0, 5.0, 0.0), 0.0),
            &margins(),
        )
        .unwrap();
        assert_eq!(result.location_error, 5.0);
    }

    #[test]
    fn test_negative_yaw_matches_wrapped_yaw() {
        let result = check_divergence(
            &predicted(Vec3::ZERO, -10.0),
            &snapshot(Vec3::ZERO, 350.0),
            &margins(),
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_yaw_beyond_margin_diverges() {
        let result = check_divergence(
            &predicted(Vec3::ZERO, 10.0),
            &snapshot(Vec3::ZERO, 16.0),
            &margins(),
        )
        .unwrap();
        assert!(result.rotation_exceeded);
        assert!(!result.location_exceeded);
        assert_eq!(result.yaw_error, 6.0);
    }

    #[test]
    fn test_yaw_across_zero_uses_short_arc() {
        let result = check_divergence(
            &predicted(Vec3::ZERO, 358.0),
            &snapshot(Vec3::ZERO, 361.0),
            &margins(),
        );
        assert!(result.is_none());
    }
}
