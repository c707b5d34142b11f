use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Alignment segment has mismatched lengths: query {query:?}, target {target:?}")]
    SegmentLengthMismatch {
        query: std::ops::Range<usize>,
        target: std::ops::Range<usize>,
    },

    #[error("Alignment segments overlap or are out of order at query position {0}")]
    SegmentOrder(usize),

    #[error("Can't parse residue identifier: {0}")]
    ResidueKeyParse(String),

    #[error("Unsupported structure format: {0}")]
    UnsupportedFormat(String),

    #[error("Needed trajectory files not found in {0}")]
    TrajectoryFilesNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
