use crate::config::PackingPolicy;
use crate::error::{ChunkerError, Result};
use crate::units::Unit;

/// Allocates units to a fixed number of segments
pub(crate) struct Packer {
    policy: PackingPolicy,
    slots: usize,
    max_len: usize,
}

impl Packer {
    pub fn new(policy: PackingPolicy, slots: usize, max_len: usize) -> Self {
        Self {
            policy,
            slots,
            max_len,
        }
    }

    /// Execute the configured policy. Returns exactly `slots` strings, some of
    /// which may be empty.
    pub fn pack(&self, units: &[Unit]) -> Result<Vec<String>> {
        let mut segments = vec![String::new(); self.slots];
        let mut lens = vec![0usize; self.slots];
        if units.is_empty() {
            return Ok(segments);
        }
        if self.slots == 0 {
            return Err(self.capacity_exceeded());
        }

        let mut slot = 0usize;
        for (idx, unit) in units.iter().enumerate() {
            if self.policy == PackingPolicy::BottomWeighted {
                // Hold earlier segments back while fewer units remain than
                // segments, so every trailing segment receives content.
                let remaining_units = units.len() - idx;
                while remaining_units < self.slots - slot {
                    slot += 1;
                }
            }

            while lens[slot] + unit.len > self.max_len {
                slot += 1;
                if slot >= self.slots {
                    return Err(self.capacity_exceeded());
                }
            }

            segments[slot].push_str(&unit.text);
            lens[slot] += unit.len;
        }

        Ok(segments)
    }

    fn capacity_exceeded(&self) -> ChunkerError {
        ChunkerError::CapacityExceeded {
            slots: self.slots,
            max_len: self.max_len,
        }
    }
}
