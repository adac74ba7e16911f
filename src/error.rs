use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid n-gram length: {0} (must be at least 1)")]
    InvalidNgramLength(usize),

    #[error("Invalid lower bound: {0} (must be a number in [0.0, 1.0])")]
    InvalidLowerBound(f64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Dimension mismatch: left matrix has {left_cols} columns, right matrix has {right_rows} rows")]
    DimensionMismatch { left_cols: usize, right_rows: usize },

    #[error("Length mismatch: {left} left records, {right} right records")]
    LengthMismatch { left: usize, right: usize },

    #[error("Candidate pair ({left}, {right}) out of range for a {rows}x{cols} join")]
    CandidateOutOfRange {
        left: usize,
        right: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Label index {index} out of range ({len} labels)")]
    LabelOutOfRange { index: usize, len: usize },

    #[error("Malformed sparse matrix: {0}")]
    MalformedMatrix(String),
}

/// Failure reported by a [`crate::person::NameParser`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not parse a name from {input:?}: {reason}")]
pub struct NameParseError {
    pub input: String,
    pub reason: String,
}
