// error.rs - Error taxonomy shared by the statistics and trimming core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrimError>;

#[derive(Debug, Error)]
pub enum TrimError {
    /// Unbound statistics, unaligned input, or a residue outside the loaded alphabet.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Malformed similarity matrix: {0}")]
    Format(String),

    #[error("The compared alignments do not share the same sequence set: {0}")]
    SequenceSetMismatch(String),

    #[error("Index {index} is out of range (valid range is 0..{bound})")]
    OutOfRange { index: usize, bound: usize },

    #[error("Infeasible configuration: {0}")]
    InfeasibleConfig(String),

    #[error("An IO error occurred on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl TrimError {
    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        TrimError::Precondition(message.into())
    }

    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        TrimError::Io {
            path: path.into(),
            source,
        }
    }
}
