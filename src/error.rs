use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VhsbError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported sample type: type code {type_code} at {bits} bits")]
    UnsupportedSampleType { type_code: u16, bits: u32 },

    #[error("X has {x_len} values but Y has {y_len} rows (rows correspond to samples)")]
    ShapeMismatch { x_len: usize, y_len: usize },

    #[error("Invalid tensor dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Could not acquire lock: {0}")]
    LockUnavailable(String),

    #[error("Requested range [{x0}, {x1}] lies outside the sampled interval [{start}, {end}]")]
    OutOfBounds {
        x0: f64,
        x1: f64,
        start: f64,
        end: f64,
    },

    #[error("Truncated file: {trailing} trailing bytes is not a whole number of {sample_size}-byte records")]
    TruncatedFile { trailing: u64, sample_size: u64 },
}

pub type Result<T> = std::result::Result<T, VhsbError>;
