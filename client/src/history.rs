//! Queue of predicted inputs the server has not confirmed yet.

use shared::{InputSample, SequenceId};
use std::collections::VecDeque;

/// FIFO of [`InputSample`]s in prediction order, which is also replay order.
///
/// Capacity equals the size of the sequence id space, so an id is never held
/// twice: once full, the oldest sample is evicted before a new one is pushed.
#[derive(Debug, Clone)]
pub struct InputHistory {
    samples: VecDeque<InputSample>,
    capacity: usize,
}

impl InputHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    /// Appends a sample, returning the evicted oldest one if the queue was full.
    pub fn push(&mut self, sample: InputSample) -> Option<InputSample> {
        let evicted = if self.samples.len() >= self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    /// Removes and returns the sample with `sequence`, discarding every sample
    /// queued before it.
    ///
    /// Returns the matched sample and how many stale samples were dropped.
    /// When no queued sample carries `sequence` the queue is left untouched.
    pub fn take_through(&mut self, sequence: SequenceId) -> Option<(InputSample, usize)> {
        let position = self.samples.iter().position(|s| s.sequence == sequence)?;
        self.samples.drain(..position);
        self.samples.pop_front().map(|sample| (sample, position))
    }

    /// Empties the queue, yielding samples oldest first.
    pub fn drain(&mut self) -> Vec<InputSample> {
        self.samples.drain(..).collect()
    }

    /// Replaces the whole queue with `samples`, kept in the given order.
    pub fn replace(&mut self, samples: Vec<InputSample>) {
        self.samples.clear();
        for sample in samples {
            self.push(sample);
        }
    }

    pub fn front(&self) -> Option<&InputSample> {
        self.samples.front()
    }

    pub fn back(&self) -> Option<&InputSample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
