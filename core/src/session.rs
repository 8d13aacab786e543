//! The single shared dice session.
//!
//! [`SessionState`] is owned by whoever services inbound frames and is only
//! ever mutated by an accepted roll. Bad input never escapes as an error:
//! it leaves the state untouched and the current snapshot is re-emitted.

use crate::{command, Command, Error, HistoryPolicy, RandomSource, RollHistory, Snapshot};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Running,
    /// Terminal. No protocol traffic is handled any more.
    Failed { reason: String },
}

/// Result of handling one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// What should be broadcast, `None` once the session has failed.
    pub snapshot: Option<Snapshot>,
    /// Why the frame did not change the state, if it was refused.
    pub rejected: Option<Error>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    upper_bound: u32,
    last_roll: u32,
    history: RollHistory,
    lifecycle: Lifecycle,
}

impl SessionState {
    pub fn new(policy: HistoryPolicy) -> Self {
        Self {
            history: RollHistory::new(policy),
            ..Default::default()
        }
    }

    pub fn upper_bound(&self) -> u32 {
        self.upper_bound
    }

    pub fn last_roll(&self) -> u32 {
        self.last_roll
    }

    pub fn history(&self) -> &RollHistory {
        &self.history
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Failed { .. })
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        if self.is_failed() {
            return;
        }
        let reason = reason.into();
        tracing::error!(%reason, "session failed, no longer accepting frames");
        self.lifecycle = Lifecycle::Failed { reason };
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::of(self)
    }

    pub fn apply(&mut self, command: Command, rng: &mut impl RandomSource) -> Option<Snapshot> {
        self.execute(Ok(command), rng).snapshot
    }

    pub fn handle_frame(&mut self, frame: &[u8], rng: &mut impl RandomSource) -> Outcome {
        self.execute(command::parse(frame), rng)
    }

    fn execute(&mut self, parsed: Result<Command, Error>, rng: &mut impl RandomSource) -> Outcome {
        if self.is_failed() {
            tracing::debug!("dropping frame, session has failed");
            return Outcome {
                snapshot: None,
                rejected: None,
            };
        }
        let rejected = match parsed {
            Ok(Command::Roll { bound }) => self.roll(bound, rng).err(),
            Ok(Command::Unrecognized) => None,
            Err(err) => Some(err),
        };
        if let Some(err) = &rejected {
            tracing::warn!(%err, "frame rejected, state unchanged");
        }
        Outcome {
            snapshot: Some(self.snapshot()),
            rejected,
        }
    }

    fn roll(&mut self, bound: u32, rng: &mut impl RandomSource) -> Result<u32, Error> {
        let draw = if bound == 0 {
            tracing::debug!("zero bound, drawing 0");
            0
        } else {
            rng.next(0, bound)?
        };
        self.upper_bound = bound;
        self.last_roll = draw;
        self.history.insert(draw);
        tracing::info!(bound, draw, "rolled");
        Ok(draw)
    }
}
