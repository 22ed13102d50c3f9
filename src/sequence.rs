//! Receiver-side sequence tracking for loss detection
//!
//! Identifiers are compared modulo 2^32, so a sender rolling over from
//! `u32::MAX` to `0` stays in order. The tracker never waits for missing
//! frames: it always resynchronizes to the newest identifier seen.

/// Wrapping distance at or above which an identifier counts as behind us
const BACKWARD_THRESHOLD: u32 = 1 << 31;

/// A run of identifiers that never arrived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    /// First missing identifier
    pub first: u32,
    /// Last missing identifier
    pub last: u32,
    /// Number of missing frames
    pub lost: u32,
}

impl std::fmt::Display for Gap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.first == self.last {
            write!(f, "ID {}", self.first)
        } else {
            write!(f, "IDs {}..={}", self.first, self.last)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceEvent {
    /// First identifier of the session, accepted without a gap check
    First,
    InOrder,
    Gap(Gap),
    /// Identifier at or behind the last one seen (duplicate, reordering or
    /// a restarted sender)
    Backward { last: u32 },
}

#[derive(Debug, Default)]
pub struct SequenceTracker {
    last_id: Option<u32>,
    lost: u64,
    gaps: u64,
    backward: u64,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, id: u32) -> SequenceEvent {
        let event = match self.last_id {
            None => SequenceEvent::First,
            Some(last) => {
                let expected = last.wrapping_add(1);
                let distance = id.wrapping_sub(expected);
                if distance == 0 {
                    SequenceEvent::InOrder
                } else if distance >= BACKWARD_THRESHOLD {
                    self.backward += 1;
                    SequenceEvent::Backward { last }
                } else {
                    self.lost += u64::from(distance);
                    self.gaps += 1;
                    SequenceEvent::Gap(Gap {
                        first: expected,
                        last: id.wrapping_sub(1),
                        lost: distance,
                    })
                }
            }
        };
        self.last_id = Some(id);
        event
    }

    pub fn last_id(&self) -> Option<u32> {
        self.last_id
    }

    /// Total frames declared lost
    pub fn lost(&self) -> u64 {
        self.lost
    }

    /// Number of distinct gaps seen
    pub fn gaps(&self) -> u64 {
        self.gaps
    }

    pub fn backward_steps(&self) -> u64 {
        self.backward
    }
}
