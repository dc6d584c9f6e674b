//! Cyclic sequence ids correlating client inputs with server confirmations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Id of one client simulation step. Wraps to 0 after the configured maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct SequenceId(pub u16);

impl SequenceId {
    pub const ZERO: SequenceId = SequenceId(0);

    /// The id following this one in a space of `0..=max`.
    pub fn next(self, max: u16) -> SequenceId {
        if self.0 >= max {
            SequenceId(0)
        } else {
            SequenceId(self.0 + 1)
        }
    }

    pub fn value(self) -> u16 {
        self.0
    }

    /// True when this id comes after `other` in a space of `0..=max`.
    ///
    /// Ids at most half the space ahead count as newer, so an id just past
    /// the wrap is newer than one just before it. Equal ids are never newer.
    pub fn is_newer_than(self, other: SequenceId, max: u16) -> bool {
        let span = i32::from(max) + 1;
        let ahead = (i32::from(self.0) - i32::from(other.0)).rem_euclid(span);
        ahead != 0 && ahead <= span / 2
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out consecutive ids, wrapping at `max`.
#[derive(Debug, Clone)]
pub struct SequenceCounter {
    next: SequenceId,
    max: u16,
}

impl SequenceCounter {
    pub fn new(max: u16) -> Self {
        Self {
            next: SequenceId::ZERO,
            max,
        }
    }

    /// Returns the current id and advances the counter.
    pub fn advance(&mut self) -> SequenceId {
        let id = self.next;
        self.next = id.next(self.max);
        id
    }

    pub fn peek(&self) -> SequenceId {
        self.next
    }

    pub fn max(&self) -> u16 {
        self.max
    }
}
