//! Client-side prediction, reconciliation and rewind-replay for the locally
//! controlled pawn.
//!
//! Every tick the local input is simulated immediately and recorded in the
//! [`InputHistory`]. When the server's snapshot for one of those ticks arrives
//! the recorded prediction is compared with it; on divergence the pawn is reset
//! to the snapshot and every still-unconfirmed input is simulated again.

use crate::history::InputHistory;
use crate::reconciliation::{check_divergence, ErrorMargins, ReconcileOutcome};
use log::debug;
use shared::{
    advance, AuthoritativeSnapshot, Collision, InputAxes, InputSample, MovementSettings,
    MovementState, NetConfig, SequenceCounter, Transform,
};

/// Counters describing how well prediction tracks the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionMetrics {
    pub predictions: u64,
    pub snapshots: u64,
    pub corrections: u64,
    pub dropped_snapshots: u64,
    pub stale_samples: u64,
    pub evicted_samples: u64,
    pub replayed_samples: u64,
    pub last_correction_distance: f32,
    pub max_correction_distance: f32,
}

/// The pawn owned by this client.
pub struct LocalPlayer {
    state: MovementState,
    camera_pitch: f32,
    history: InputHistory,
    sequence: SequenceCounter,
    settings: MovementSettings,
    margins: ErrorMargins,
    min_pitch: f32,
    max_pitch: f32,
    /// Set while a replay runs; `predict` records nothing while it is set.
    rewinding: bool,
    metrics: PredictionMetrics,
}

impl LocalPlayer {
    pub fn new(spawn: Transform, config: &NetConfig) -> Self {
        Self {
            state: MovementState::new(spawn),
            camera_pitch: 0.0,
            history: InputHistory::new(config.history_capacity()),
            sequence: SequenceCounter::new(config.sequence_max),
            settings: MovementSettings::from(config),
            margins: ErrorMargins::from(config),
            min_pitch: config.min_pitch,
            max_pitch: config.max_pitch,
            rewinding: false,
            metrics: PredictionMetrics::default(),
        }
    }

    /// Simulates one local tick and records it.
    ///
    /// Returns the sample to transmit to the server, or `None` while a rewind
    /// is in progress.
    pub fn predict<W: Collision + ?Sized>(
        &mut self,
        axes: InputAxes,
        elapsed: f32,
        world: &W,
    ) -> Option<InputSample> {
        if self.rewinding {
            return None;
        }

        self.camera_pitch = (self.camera_pitch + axes.look_pitch).clamp(self.min_pitch, self.max_pitch);
        self.state = advance(&self.state, &axes, elapsed, &self.settings, world);

        let sample = InputSample {
            sequence: self.sequence.advance(),
            axes,
            elapsed_seconds: elapsed,
            predicted: self.state.transform,
        };

        if let Some(evicted) = self.history.push(sample) {
            debug!("History full, evicted unconfirmed input {}", evicted.sequence);
            self.metrics.evicted_samples += 1;
        }
        self.metrics.predictions += 1;

        Some(sample)
    }

    /// Compares an authoritative snapshot with the prediction recorded for the
    /// same sequence id and corrects the pawn if they diverge.
    pub fn reconcile<W: Collision + ?Sized>(
        &mut self,
        snapshot: &AuthoritativeSnapshot,
        world: &W,
    ) -> ReconcileOutcome {
        self.metrics.snapshots += 1;

        let Some((predicted, stale)) = self.history.take_through(snapshot.sequence) else {
            debug!("No queued input for snapshot {}, dropping it", snapshot.sequence);
            self.metrics.dropped_snapshots += 1;
            return ReconcileOutcome::Dropped;
        };
        self.metrics.stale_samples += stale as u64;

        let Some(divergence) = check_divergence(&predicted, snapshot, &self.margins) else {
            return ReconcileOutcome::Accepted;
        };

        debug!(
            "Prediction {} diverged by {:.3} units / {:.2} degrees, replaying {} inputs",
            snapshot.sequence,
            divergence.location_error,
            divergence.yaw_error,
            self.history.len()
        );

        let replayed = self.rewind_and_replay(snapshot, world);

        self.metrics.corrections += 1;
        self.metrics.last_correction_distance = divergence.location_error;
        self.metrics.max_correction_distance =
            self.metrics.max_correction_distance.max(divergence.location_error);

        ReconcileOutcome::Corrected {
            divergence,
            replayed,
        }
    }

    /// Resets to `snapshot` and re-simulates every queued input in order,
    /// rewriting each sample's predicted transform. Returns how many inputs
    /// were replayed.
    ///
    /// The `rewinding` flag guards against `predict` calls made during the
    /// replay.
    pub fn rewind_and_replay<W: Collision + ?Sized>(
        &mut self,
        snapshot: &AuthoritativeSnapshot,
        world: &W,
    ) -> usize {
        self.rewinding = true;

        self.state = snapshot.movement_state();

        let pending = self.history.drain();
        let mut rebuilt = Vec::with_capacity(pending.len());
        for mut sample in pending {
            self.state = advance(
                &self.state,
                &sample.axes,
                sample.elapsed_seconds,
                &self.settings,
                world,
            );
            sample.predicted = self.state.transform;
            rebuilt.push(sample);
        }

        let replayed = rebuilt.len();
        self.history.replace(rebuilt);
        self.metrics.replayed_samples += replayed as u64;

        self.rewinding = false;
        replayed
    }

    pub fn transform(&self) -> Transform {
        self.state.transform
    }

    pub fn state(&self) -> &MovementState {
        &self.state
    }

    pub fn camera_pitch(&self) -> f32 {
        self.camera_pitch
    }

    pub fn history(&self) -> &InputHistory {
        &self.history
    }

    pub fn metrics(&self) -> &PredictionMetrics {
        &self.metrics
    }

    pub fn is_rewinding(&self) -> bool {
        self.rewinding
    }
}
