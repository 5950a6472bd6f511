//! Error types for the admission gate.

/// Errors that can occur when acquiring a key.
///
/// A busy rejection is an expected outcome, not a fault of the gate: it tells
/// the caller "try again later". There is no queue to join and no permit to
/// wait on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError<K: std::fmt::Display> {
    /// The key is already held by another operation.
    #[error("resource `{key}` is busy")]
    Busy {
        /// The contended key.
        key: K,
    },
}

impl<K: std::fmt::Display> GateError<K> {
    /// Returns the key the failed acquisition was for.
    pub fn key(&self) -> &K {
        match self {
            GateError::Busy { key } => key,
        }
    }
}
