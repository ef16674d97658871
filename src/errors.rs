use derive_builder::UninitializedFieldError;
use std::path::PathBuf;
use thiserror::Error;

/// Enum for errors in this crate
#[derive(Error, Debug)]
pub enum ReweightError {
    /// Error returned when the run is configured inconsistently, before any numeric work
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Error returned when a builder's build() was called improperly
    #[error("Could not build reweighting: {0}")]
    BuilderError(String),

    /// Error returned when an array is the wrong length
    #[error("Array of length {0} is incorrect; length should be {1}")]
    ArrayLengthMismatch(usize, usize),

    /// Error returned when a trajectory row has no normalization value to pair with
    #[error("Trajectory row {row} maps to snapshot {index}, but only {len} snapshots are available")]
    SnapshotIndexOutOfRange {
        #[allow(missing_docs)]
        row: usize,
        #[allow(missing_docs)]
        index: usize,
        #[allow(missing_docs)]
        len: usize,
    },

    /// Error returned when the inputs cannot support a free energy estimate at all
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Error returned when an input or output file cannot be accessed
    #[error("Could not access {}", .path.display())]
    Io {
        #[allow(missing_docs)]
        path: PathBuf,
        #[allow(missing_docs)]
        #[source]
        source: std::io::Error,
    },

    /// Error returned when a numeric table is malformed
    #[error("{}:{line}: {message}", .path.display())]
    Parse {
        #[allow(missing_docs)]
        path: PathBuf,
        #[allow(missing_docs)]
        line: usize,
        #[allow(missing_docs)]
        message: String,
    },

    /// Error returned when a column selector does not match any column of a table
    #[error("Column {0} not found")]
    MissingColumn(String),
}

impl ReweightError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<UninitializedFieldError> for ReweightError {
    fn from(e: UninitializedFieldError) -> Self {
        Self::BuilderError(e.to_string())
    }
}

/// Result type for the metad-reweight crate
pub type Result<T> = std::result::Result<T, ReweightError>;
