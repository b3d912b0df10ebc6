//! Error types for reduced-sample artifacts.

use thiserror::Error;

/// Result type for artifact operations.
pub type Result<T> = std::result::Result<T, BundleError>;

/// Errors that can occur while writing or reading a reduced-sample artifact.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("not a reduced-sample artifact (bad magic)")]
    BadMagic,

    #[error("unsupported artifact format version {found} (this build reads up to {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("artifact ends inside a block ({expected} bytes expected, {read} read)")]
    TruncatedBlock { expected: usize, read: usize },

    #[error("artifact contains no header block")]
    MissingHeader,

    #[error("block size {size} exceeds the sanity limit {limit}")]
    OversizedBlock { size: usize, limit: usize },

    #[error("block encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
