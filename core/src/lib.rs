pub mod command;
pub mod error;
pub mod frame;
pub mod history;
pub mod random;
pub mod session;
pub mod snapshot;

pub use command::Command;
pub use error::Error;
pub use frame::ServerFrame;
pub use history::{HistoryPolicy, RollHistory, HISTORY_CAPACITY};
pub use random::{OsEntropy, RandomSource};
pub use session::{Lifecycle, Outcome, SessionState};
pub use snapshot::Snapshot;

/// WebSocket port the device listens on.
pub const PORT: u16 = 81;

/// Text sent to a client right after it connects.
pub const GREETING: &str = "[SERVER]Connected";
