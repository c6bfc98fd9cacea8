//! Error taxonomy shared across the field, bloom, PRNG, and pipeline layers.

use thiserror::Error;

/// Errors produced anywhere in the search engine.
///
/// Arithmetic domain errors and setup I/O/format errors are fatal; a match-sink
/// I/O error during search terminates the worker that hit it. Bloom false
/// positives are not represented here — they are an expected property of the
/// filter, not a fault.
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem or stdio failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed input: bad hex, wrong bloom file magic/version, truncated file.
    #[error("format error: {0}")]
    Format(String),

    /// A mathematical precondition was violated (division by zero, scalar out
    /// of range, point not on curve).
    #[error("domain error: {0}")]
    Domain(String),

    /// Invalid CLI / configuration input.
    #[error("config error: {0}")]
    Config(String),

    /// Operation was stopped cooperatively before completion.
    #[error("canceled")]
    Canceled,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
