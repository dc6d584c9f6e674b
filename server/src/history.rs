//! Per-player record of every authoritative result, keyed by the sequence id
//! of the input that produced it.
//!
//! Entries are never removed; a full cycle of the id space overwrites them.
//! Each entry is tagged with the generation (number of id wraps seen so far)
//! it was written in, so a lookup can tell a fresh entry from one left over
//! from the previous cycle.

use shared::{AuthoritativeSnapshot, SequenceId};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LagCompensationError {
    #[error("no authoritative state recorded for input {sequence}")]
    HistoryMiss { sequence: SequenceId },
    #[error("input {sequence} is from generation {found}, expected {expected}")]
    StaleGeneration {
        sequence: SequenceId,
        expected: u32,
        found: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryEntry {
    pub snapshot: AuthoritativeSnapshot,
    pub generation: u32,
}

#[derive(Debug, Clone)]
pub struct ServerHistory {
    entries: HashMap<SequenceId, HistoryEntry>,
    generation: u32,
    last_sequence: Option<SequenceId>,
    sequence_max: u16,
    /// Half the id space; distances beyond this are treated as a wrap.
    half_span: i32,
}

impl ServerHistory {
    pub fn new(sequence_max: u16) -> Self {
        Self {
            entries: HashMap::new(),
            generation: 0,
            last_sequence: None,
            sequence_max,
            half_span: (i32::from(sequence_max) + 1) / 2,
        }
    }

    /// Stores a result, overwriting whatever the id held before. Returns the
    /// generation the entry was tagged with.
    pub fn record(&mut self, snapshot: AuthoritativeSnapshot) -> u32 {
        let sequence = snapshot.sequence;
        let generation = match self.last_sequence {
            None => {
                self.last_sequence = Some(sequence);
                self.generation
            }
            Some(last) => {
                let delta = i32::from(sequence.value()) - i32::from(last.value());
                if delta < -self.half_span {
                    // Counter wrapped.
                    self.generation = self.generation.wrapping_add(1);
                    self.last_sequence = Some(sequence);
                    self.generation
                } else if delta > self.half_span {
                    // Late arrival from before the last wrap.
                    self.generation.wrapping_sub(1)
                } else {
                    if delta > 0 {
                        self.last_sequence = Some(sequence);
                    }
                    self.generation
                }
            }
        };

        self.entries.insert(
            sequence,
            HistoryEntry {
                snapshot,
                generation,
            },
        );
        generation
    }

    pub fn lookup(&self, sequence: SequenceId) -> Result<&HistoryEntry, LagCompensationError> {
        self.entries
            .get(&sequence)
            .ok_or(LagCompensationError::HistoryMiss { sequence })
    }

    /// Like [`lookup`](Self::lookup), but also rejects entries written in a
    /// different generation than the caller expects.
    pub fn lookup_in_generation(
        &self,
        sequence: SequenceId,
        generation: u32,
    ) -> Result<&HistoryEntry, LagCompensationError> {
        let entry = self.lookup(sequence)?;
        if entry.generation != generation {
            return Err(LagCompensationError::StaleGeneration {
                sequence,
                expected: generation,
                found: entry.generation,
            });
        }
        Ok(entry)
    }

    /// Generation an entry for `sequence` must carry to belong to the current
    /// run of inputs. Ids ahead of the newest recorded one have not been
    /// reached yet, so whatever they hold is left over from an earlier cycle.
    pub fn expected_generation(&self, sequence: SequenceId) -> u32 {
        let Some(last) = self.last_sequence else {
            return self.generation;
        };
        let reached = sequence == last || last.is_newer_than(sequence, self.sequence_max);
        match (reached, sequence.value() > last.value()) {
            // Behind the newest id but numerically above it: before the wrap.
            (true, true) => self.generation.wrapping_sub(1),
            // Ahead of the newest id across the wrap.
            (false, false) => self.generation.wrapping_add(1),
            _ => self.generation,
        }
    }

    /// Looks up an entry and rejects it unless it was written in the
    /// generation [`expected_generation`](Self::expected_generation) names.
    pub fn lookup_current(
        &self,
        sequence: SequenceId,
    ) -> Result<&HistoryEntry, LagCompensationError> {
        self.lookup_in_generation(sequence, self.expected_generation(sequence))
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn last_sequence(&self) -> Option<SequenceId> {
        self.last_sequence
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{MovementState, Transform, Vec3};

    fn snapshot(sequence: u16, x: f32) -> AuthoritativeSnapshot {
        let state = MovementState::new(Transform::new(Vec3::new(x, 0.0, 0.0), Default::default()));
        AuthoritativeSnapshot::from_state(&state, SequenceId(sequence), 0.0)
    }

    #[test]
    fn test_record_and_lookup() {
        let mut history = ServerHistory::new(399);
        assert!(history.is_empty());

        history.record(snapshot(0, 1.0));
        history.record(snapshot(1, 2.0));

        let entry = history.lookup(SequenceId(1)).unwrap();
        assert_eq!(entry.snapshot.location.x, 2.0);
        assert_eq!(entry.generation, 0);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_lookup_miss() {
        let history = ServerHistory::new(399);
        assert_eq!(
            history.lookup(SequenceId(7)),
            Err(LagCompensationError::HistoryMiss {
                sequence: SequenceId(7)
            })
        );
    }

    #[test]
    fn test_reordered_input_keeps_generation() {
        let mut history = ServerHistory::new(399);
        history.record(snapshot(10, 0.0));
        history.record(snapshot(12, 0.0));
        assert_eq!(history.record(snapshot(11, 0.0)), 0);
        assert_eq!(history.generation(), 0);
        assert_eq!(history.last_sequence(), Some(SequenceId(12)));
    }

    #[test]
    fn test_wrap_overwrites_and_bumps_generation() {
        let mut history = ServerHistory::new(3);
        for sequence in [0, 1, 2, 3] {
            history.record(snapshot(sequence, f32::from(sequence)));
        }
        assert_eq!(history.generation(), 0);

        assert_eq!(history.record(snapshot(0, 100.0)), 1);
        assert_eq!(history.len(), 4);

        let entry = history.lookup(SequenceId(0)).unwrap();
        assert_eq!(entry.snapshot.location.x, 100.0);
        assert_eq!(entry.generation, 1);

        // Entry 2 was written before the wrap.
        assert_eq!(
            history.lookup_in_generation(SequenceId(2), 1),
            Err(LagCompensationError::StaleGeneration {
                sequence: SequenceId(2),
                expected: 1,
                found: 0,
            })
        );
        assert!(history.lookup_in_generation(SequenceId(0), 1).is_ok());
    }

    #[test]
    fn test_late_arrival_after_wrap_keeps_old_generation() {
        let mut history = ServerHistory::new(399);
        history.record(snapshot(398, 0.0));
        history.record(snapshot(0, 0.0));
        assert_eq!(history.generation(), 1);

        assert_eq!(history.record(snapshot(399, 0.0)), 0);
        assert_eq!(history.generation(), 1);
        assert_eq!(history.last_sequence(), Some(SequenceId(0)));
    }

    #[test]
    fn test_lookup_current_after_wrap() {
        let mut history = ServerHistory::new(399);
        for sequence in (0..=399).chain(0..=10) {
            history.record(snapshot(sequence, 0.0));
        }
        assert_eq!(history.generation(), 1);

        assert_eq!(history.expected_generation(SequenceId(5)), 1);
        assert!(history.lookup_current(SequenceId(5)).is_ok());

        // Written shortly before the wrap.
        assert_eq!(history.expected_generation(SequenceId(300)), 0);
        assert!(history.lookup_current(SequenceId(300)).is_ok());

        // Not reached yet in this cycle; the slot still holds the old entry.
        assert_eq!(
            history.lookup_current(SequenceId(20)),
            Err(LagCompensationError::StaleGeneration {
                sequence: SequenceId(20),
                expected: 1,
                found: 0,
            })
        );
    }

    #[test]
    fn test_expected_generation_ahead_across_wrap() {
        let mut history = ServerHistory::new(399);
        for sequence in 0..=390 {
            history.record(snapshot(sequence, 0.0));
        }
        assert_eq!(history.expected_generation(SequenceId(250)), 0);
        assert_eq!(history.expected_generation(SequenceId(5)), 1);
        assert!(matches!(
            history.lookup_current(SequenceId(5)),
            Err(LagCompensationError::StaleGeneration { expected: 1, found: 0, .. })
        ));
    }
}
