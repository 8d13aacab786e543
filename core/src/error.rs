#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("roll command is missing its `*` terminator")]
    TruncatedCommand,
    #[error("entropy source unavailable: {0}")]
    EntropyUnavailable(String),
    #[error("empty range requested")]
    DegenerateBound,
}
