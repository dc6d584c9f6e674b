//! Smooths remote pawns between sparse server snapshots.
//!
//! Each observed pawn blends from a previous sample to a target sample over one
//! broadcast interval. The pawn therefore trails the server by one interval
//! but always arrives exactly at the positions the server sent.

use shared::{AuthoritativeSnapshot, Rotator, Transform, Vec3};
use std::collections::VecDeque;

/// Samples queued beyond this are dropped oldest first.
const MAX_BUFFERED_SAMPLES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolationSample {
    pub location: Vec3,
    pub rotation: Rotator,
    pub server_time: f32,
}

impl InterpolationSample {
    pub fn transform(&self) -> Transform {
        Transform::new(self.location, self.rotation)
    }
}

impl From<&AuthoritativeSnapshot> for InterpolationSample {
    fn from(snapshot: &AuthoritativeSnapshot) -> Self {
        Self {
            location: snapshot.location,
            rotation: snapshot.rotation,
            server_time: snapshot.server_time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationPhase {
    AwaitingFirstSample,
    AwaitingSecondSample,
    Interpolating,
}

/// Per-entity interpolation state machine.
#[derive(Debug, Clone)]
pub struct Interpolator {
    queue: VecDeque<InterpolationSample>,
    phase: InterpolationPhase,
    previous: Option<InterpolationSample>,
    target: Option<InterpolationSample>,
    latest_server_time: Option<f32>,
    step: f32,
    segment_complete: bool,
    net_update_frequency: f32,
    enabled: bool,
    current: Transform,
}

impl Interpolator {
    pub fn new(net_update_frequency: f32, enabled: bool) -> Self {
        Self {
            queue: VecDeque::new(),
            phase: InterpolationPhase::AwaitingFirstSample,
            previous: None,
            target: None,
            latest_server_time: None,
            step: 0.0,
            segment_complete: true,
            net_update_frequency,
            enabled,
            current: Transform::default(),
        }
    }

    /// Queues a received snapshot. Snapshots not newer than the last accepted
    /// one are ignored, which filters duplicates and reordered packets.
    ///
    /// With interpolation disabled the pawn snaps straight to the snapshot.
    pub fn push(&mut self, snapshot: &AuthoritativeSnapshot) -> bool {
        let sample = InterpolationSample::from(snapshot);

        if let Some(latest) = self.latest_server_time {
            if sample.server_time <= latest {
                return false;
            }
        }
        self.latest_server_time = Some(sample.server_time);

        if !self.enabled {
            self.current = sample.transform();
            return true;
        }

        if self.queue.len() >= MAX_BUFFERED_SAMPLES {
            self.queue.pop_front();
        }
        self.queue.push_back(sample);

        self.phase = match self.phase {
            InterpolationPhase::AwaitingFirstSample => {
                self.current = sample.transform();
                InterpolationPhase::AwaitingSecondSample
            }
            InterpolationPhase::AwaitingSecondSample | InterpolationPhase::Interpolating => {
                InterpolationPhase::Interpolating
            }
        };
        true
    }

    /// Advances the blend by `elapsed` seconds and returns the pawn transform.
    pub fn tick(&mut self, elapsed: f32) -> Transform {
        if !self.enabled || self.phase != InterpolationPhase::Interpolating {
            return self.current;
        }

        if self.segment_complete && !self.start_segment() {
            return self.current;
        }

        let (Some(previous), Some(target)) = (self.previous, self.target) else {
            return self.current;
        };

        self.step += elapsed * self.net_update_frequency;
        if self.step >= 1.0 {
            self.step = 1.0;
            self.segment_complete = true;
        }

        self.current = previous.transform().lerp(&target.transform(), self.step);
        self.current
    }

    /// Promotes the target to previous and dequeues a new target. Returns
    /// false when no new sample has arrived yet, in which case the pawn holds.
    fn start_segment(&mut self) -> bool {
        if self.previous.is_none() {
            self.previous = self.queue.pop_front();
        } else if !self.queue.is_empty() {
            self.previous = self.target;
        }

        match self.queue.pop_front() {
            Some(next) => {
                self.target = Some(next);
                self.step = 0.0;
                self.segment_complete = false;
                true
            }
            None => false,
        }
    }

    pub fn phase(&self) -> InterpolationPhase {
        self.phase
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn transform(&self) -> Transform {
        self.current
    }

    pub fn buffered(&self) -> usize {
        self.queue.len()
    }

    pub fn segment(&self) -> Option<(InterpolationSample, InterpolationSample)> {
        self.previous.zip(self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{MotionState, SequenceId};

    fn snapshot(location: Vec3, yaw: f32, server_time: f32) -> AuthoritativeSnapshot {
        AuthoritativeSnapshot {
            sequence: SequenceId(0),
            location,
            rotation: Rotator::from_yaw(yaw),
            yaw_turn: yaw,
            motion: MotionState::default(),
            server_time,
        }
    }

    const A: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    const B: Vec3 = Vec3::new(10.0, 4.0, 0.0);

    fn interpolating() -> Interpolator {
        let mut interpolator = Interpolator::new(5.0, true);
        interpolator.push(&snapshot(A, 0.0, 0.0));
        interpolator.push(&snapshot(B, 90.0, 0.2));
        interpolator
    }

    #[test]
    fn test_phases() {
        let mut interpolator = Interpolator::new(5.0, true);
        assert_eq!(interpolator.phase(), InterpolationPhase::AwaitingFirstSample);

        interpolator.push(&snapshot(A, 0.0, 0.0));
        assert_eq!(interpolator.phase(), InterpolationPhase::AwaitingSecondSample);
        // A single sample is shown as-is without blending.
        assert_eq!(interpolator.tick(0.1).location, A);

        interpolator.push(&snapshot(B, 0.0, 0.2));
        assert_eq!(interpolator.phase(), InterpolationPhase::Interpolating);
    }

    #[test]
    fn test_step_zero_yields_previous() {
        let mut interpolator = interpolating();
        let transform = interpolator.tick(0.0);
        assert_eq!(transform.location, A);
        assert_eq!(transform.rotation.yaw, 0.0);
    }

    #[test]
    fn test_step_one_yields_target() {
        let mut interpolator = interpolating();
        let transform = interpolator.tick(0.2);
        assert_eq!(interpolator.step(), 1.0);
        assert_eq!(transform.location, B);
        assert_eq!(transform.rotation.yaw, 90.0);
    }

    #[test]
    fn test_midpoint_after_half_an_interval() {
        let mut interpolator = interpolating();
        let transform = interpolator.tick(0.1);
        assert_eq!(transform.location, Vec3::new(5.0, 2.0, 0.0));
        assert_eq!(transform.rotation.yaw, 45.0);
    }

    #[test]
    fn test_step_clamps_past_one() {
        let mut interpolator = interpolating();
        let transform = interpolator.tick(1.0);
        assert_eq!(interpolator.step(), 1.0);
        assert_eq!(transform.location, B);
    }

    #[test]
    fn test_completed_segment_promotes_target() {
        let c = Vec3::new(20.0, 4.0, 0.0);
        let mut interpolator = interpolating();
        interpolator.tick(0.2);

        interpolator.push(&snapshot(c, 90.0, 0.4));
        let transform = interpolator.tick(0.1);

        let (previous, target) = interpolator.segment().unwrap();
        assert_eq!(previous.location, B);
        assert_eq!(target.location, c);
        assert_eq!(transform.location, Vec3::new(15.0, 4.0, 0.0));
    }

    #[test]
    fn test_holds_at_target_when_starved() {
        let mut interpolator = interpolating();
        interpolator.tick(0.2);
        assert_eq!(interpolator.tick(0.1).location, B);
        assert_eq!(interpolator.tick(0.1).location, B);

        // A late sample resumes blending from where the pawn stopped.
        interpolator.push(&snapshot(Vec3::new(10.0, 14.0, 0.0), 90.0, 0.6));
        let transform = interpolator.tick(0.1);
        assert_eq!(transform.location, Vec3::new(10.0, 9.0, 0.0));
    }

    #[test]
    fn test_out_of_order_and_duplicate_snapshots_are_ignored() {
        let mut interpolator = interpolating();
        assert!(!interpolator.push(&snapshot(Vec3::new(99.0, 0.0, 0.0), 0.0, 0.2)));
        assert!(!interpolator.push(&snapshot(Vec3::new(99.0, 0.0, 0.0), 0.0, 0.1)));
        assert_eq!(interpolator.buffered(), 2);
    }

    #[test]
    fn test_buffer_is_bounded() {
        let mut interpolator = Interpolator::new(5.0, true);
        for i in 0..20 {
            interpolator.push(&snapshot(Vec3::new(i as f32, 0.0, 0.0), 0.0, i as f32));
        }
        assert_eq!(interpolator.buffered(), MAX_BUFFERED_SAMPLES);
    }

    #[test]
    fn test_disabled_snaps_to_latest_snapshot() {
        let mut interpolator = Interpolator::new(5.0, false);
        interpolator.push(&snapshot(A, 0.0, 0.0));
        interpolator.push(&snapshot(B, 0.0, 0.2));
        assert_eq!(interpolator.tick(0.01).location, B);
        assert_eq!(interpolator.buffered(), 0);
    }
}
