//! Fixed-size, most-recent-first record of past draws.

/// Number of draws the device remembers.
pub const HISTORY_CAPACITY: usize = 21;

/// How [`RollHistory::insert`] moves older entries toward the tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryPolicy {
    /// Every slot shifts and the oldest entry is evicted. Zero draws are kept.
    #[default]
    Contiguous,
    /// Bit-compatible with the original device firmware: a zero draw marks
    /// its slot empty, and only occupied slots are copied on insert, which
    /// can leave stale duplicates behind an empty slot.
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollHistory {
    slots: [Option<u32>; HISTORY_CAPACITY],
    policy: HistoryPolicy,
}

impl Default for RollHistory {
    fn default() -> Self {
        Self::new(HistoryPolicy::default())
    }
}

impl RollHistory {
    pub fn new(policy: HistoryPolicy) -> Self {
        Self {
            slots: [None; HISTORY_CAPACITY],
            policy,
        }
    }

    pub fn insert(&mut self, value: u32) {
        match self.policy {
            HistoryPolicy::Contiguous => {
                self.slots.rotate_right(1);
                self.slots[0] = Some(value);
            }
            HistoryPolicy::Legacy => {
                for i in (1..HISTORY_CAPACITY).rev() {
                    if self.slots[i - 1].is_some() {
                        self.slots[i] = self.slots[i - 1];
                    }
                }
                self.slots[0] = Some(value).filter(|&v| v != 0);
            }
        }
    }

    /// Occupied entries, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots.iter().flatten().copied()
    }

    /// The slot written by the latest insert, if it holds a value.
    pub fn latest(&self) -> Option<u32> {
        self.slots[0]
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}
