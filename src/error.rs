use thiserror::Error;

/// Failures that end a run. Backend errors are wrapped with the phase they
/// happened in.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("phase {phase:?} failed")]
    Phase {
        phase: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("phase {phase:?} has no keys to read ({done} of {limit} reads done)")]
    EmptyKeySpace {
        phase: String,
        done: u64,
        limit: u64,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Work submitted after another operation of the same phase failed.
    #[error("phase aborted after an operation failed")]
    Aborted,
}
