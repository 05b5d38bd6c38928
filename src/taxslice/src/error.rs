//! Error types for taxslice.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaxsliceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown taxonomic rank '{0}' (expected one of: kingdom, class, order, family, genus, species, strain)")]
    UnknownRank(String),

    #[error("Cannot slice at rank '{0}': it is the most specific rank, so no deeper rank exists to exclude")]
    InvalidRank(String),

    #[error("File name {path:?} does not follow the expected naming convention ({expected})")]
    UnconventionalName { path: PathBuf, expected: String },

    #[error("Required tool '{0}' was not found on PATH")]
    ToolNotFound(String),

    #[error("'{command}' exited with {status}")]
    ToolFailed { command: String, status: ExitStatus },

    #[error("Invalid FASTQ file {path:?}: {reason}")]
    InvalidFastq { path: PathBuf, reason: String },

    #[error("Expected 1 (single-end) or 2 (paired-end) read files, got {0}")]
    ReadCount(usize),

    #[error("{0}")]
    Unsupported(String),

    #[error("Expected output {0:?} was not produced")]
    MissingArtifact(PathBuf),
}

pub type Result<T> = std::result::Result<T, TaxsliceError>;
