use matrix_transpose::TransposeError;

use crate::channel::TransportError;

/// Errors produced by the silent OT pipeline and the extension protocols.
///
/// Every error is fatal for the batch in flight: nothing is retried, and a failed setup or
/// expansion must restart from key generation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input: wrong lengths, misaligned sizes, out-of-range values.
    #[error("parameter error: {0}")]
    Parameter(String),
    /// An operation was invoked in a state that does not allow it.
    #[error("protocol state error: {0}")]
    State(String),
    /// The batch-wide consistency check failed. The peer may be malicious.
    #[error("security check failed: {0}")]
    SecurityCheck(String),
    /// The channel failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl Error {
    pub(crate) fn parameter(msg: impl Into<String>) -> Self {
        Self::Parameter(msg.into())
    }

    pub(crate) fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    pub(crate) fn security(msg: impl Into<String>) -> Self {
        Self::SecurityCheck(msg.into())
    }
}

impl From<TransposeError> for Error {
    fn from(err: TransposeError) -> Self {
        Self::Parameter(err.to_string())
    }
}
