use thiserror::Error;

/// Failures reported by an [`AudioBackend`](crate::backend::AudioBackend).
///
/// None of these are fatal to the render loop: it records the fault once and
/// keeps producing rest-state output.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The analysis context could not be created or has gone away.
    #[error("analysis context unavailable: {0}")]
    Unavailable(String),
    /// A per-tick sample read failed.
    #[error("sample read failed: {0}")]
    Read(String),
    /// A transport command (play/pause/seek/...) was rejected.
    #[error("transport command failed: {0}")]
    Transport(String),
}
