//! Authoritative simulation of one connected player.
//!
//! Every validated input is simulated on arrival with the same movement step
//! the owning client predicted with, stamped, recorded in the player's
//! [`ServerHistory`] and, every few inputs, handed back for broadcast.
//! Inputs that are not newer than the last one simulated (duplicates and
//! stragglers overtaken in transit) are discarded.

use crate::history::{LagCompensationError, ServerHistory};
use log::debug;
use shared::{
    advance, AuthoritativeSnapshot, Collision, InputSample, MovementSettings, MovementState,
    NetConfig, Role, SequenceId, Transform,
};

/// Result of simulating one client input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationStep {
    pub snapshot: AuthoritativeSnapshot,
    /// True when this snapshot is due to be broadcast.
    pub broadcast: bool,
}

#[derive(Debug, Clone)]
pub struct ServerPlayer {
    pub id: u32,
    state: MovementState,
    settings: MovementSettings,
    history: ServerHistory,
    broadcast_counter: u32,
    broadcast_interval: u32,
    /// Transform the player had before a lag-compensation rewind.
    pre_rewind: Option<Transform>,
    last_simulated: Option<SequenceId>,
    sequence_max: u16,
    inputs_simulated: u64,
    inputs_discarded: u64,
}

impl ServerPlayer {
    pub fn new(id: u32, spawn: Transform, config: &NetConfig) -> Self {
        Self {
            id,
            state: MovementState::new(spawn),
            settings: MovementSettings::from(config),
            history: ServerHistory::new(config.sequence_max),
            broadcast_counter: 0,
            broadcast_interval: config.broadcast_interval(),
            pre_rewind: None,
            last_simulated: None,
            sequence_max: config.sequence_max,
            inputs_simulated: 0,
            inputs_discarded: 0,
        }
    }

    pub fn role(&self) -> Role {
        Role::AuthoritativeServer
    }

    /// Simulates one input from the owning client.
    ///
    /// Returns `None` without touching the player when the input is not
    /// newer than the last one simulated. A pending lag-compensation rewind
    /// is undone first so the step always starts from the live state.
    pub fn simulate<W: Collision + ?Sized>(
        &mut self,
        sample: &InputSample,
        server_time: f32,
        world: &W,
    ) -> Option<SimulationStep> {
        if let Some(last) = self.last_simulated {
            if !sample.sequence.is_newer_than(last, self.sequence_max) {
                self.inputs_discarded += 1;
                debug!(
                    "Player {} discarding input {} (last simulated {})",
                    self.id, sample.sequence, last
                );
                return None;
            }
        }

        self.restore_after_rewind();

        self.state = advance(
            &self.state,
            &sample.axes,
            sample.elapsed_seconds,
            &self.settings,
            world,
        );
        self.inputs_simulated += 1;
        self.last_simulated = Some(sample.sequence);

        let snapshot = AuthoritativeSnapshot::from_state(&self.state, sample.sequence, server_time);
        self.history.record(snapshot);

        self.broadcast_counter += 1;
        let broadcast = self.broadcast_counter >= self.broadcast_interval;
        if broadcast {
            self.broadcast_counter = 0;
        }

        Some(SimulationStep {
            snapshot,
            broadcast,
        })
    }

    /// Moves the player to where it was after the given input, for hit-testing
    /// against the past. The live transform is cached until
    /// [`restore_after_rewind`](Self::restore_after_rewind).
    ///
    /// Entries left over from an earlier cycle of the id space are rejected
    /// with [`LagCompensationError::StaleGeneration`].
    pub fn rewind_to(&mut self, sequence: SequenceId) -> Result<Transform, LagCompensationError> {
        let historical = self.history.lookup_current(sequence)?.snapshot.transform();

        if self.pre_rewind.is_none() {
            self.pre_rewind = Some(self.state.transform);
        }
        self.state.transform = historical;

        debug!(
            "Player {} rewound to {} at ({:.2}, {:.2}, {:.2})",
            self.id, sequence, historical.location.x, historical.location.y, historical.location.z
        );
        Ok(historical)
    }

    /// Puts the player back where it was before the last rewind. Returns
    /// false when no rewind was pending.
    pub fn restore_after_rewind(&mut self) -> bool {
        match self.pre_rewind.take() {
            Some(transform) => {
                self.state.transform = transform;
                true
            }
            None => false,
        }
    }

    pub fn is_rewound(&self) -> bool {
        self.pre_rewind.is_some()
    }

    pub fn transform(&self) -> Transform {
        self.state.transform
    }

    pub fn state(&self) -> &MovementState {
        &self.state
    }

    pub fn history(&self) -> &ServerHistory {
        &self.history
    }

    pub fn inputs_simulated(&self) -> u64 {
        self.inputs_simulated
    }

    pub fn inputs_discarded(&self) -> u64 {
        self.inputs_discarded
    }

    pub fn last_simulated(&self) -> Option<SequenceId> {
        self.last_simulated
    }
}
