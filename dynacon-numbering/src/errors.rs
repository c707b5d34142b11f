use std::path::PathBuf;

use dynacon_core::CoreError;
use thiserror::Error;

/// Failures of the structure loader. All of them abort the numbering request.
#[derive(Error, Debug)]
pub enum TrajectoryLoadError {
    #[error("Unsupported structure format: {0}")]
    UnsupportedFormat(String),

    #[error("Can't open structure file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Can't parse structure file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

#[derive(Error, Debug)]
pub enum NumberingError {
    #[error(transparent)]
    TrajectoryLoad(#[from] TrajectoryLoadError),

    #[error("Malformed alignment hit description: {0:?}")]
    HitDescription(String),

    #[error("Failed to run aligner {program}: {source}")]
    AlignerSpawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Reference lookup failed for {accession}: {reason}")]
    ReferenceLookupFailed { accession: String, reason: String },

    #[error("Registry returned an invalid payload for {accession}: {source}")]
    InvalidRegistryPayload {
        accession: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid accession identifier: {0:?}")]
    InvalidAccession(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NumberingError>;
