//! # Error Module
//!
//! Error types for the same-subject engine.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, dimensions, what went wrong
//! - **Degenerate numbers are not errors** - a zero-magnitude vector is a
//!   non-match, not a failure

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum SameSubjectError {
    #[error("Fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),

    #[error("Sample error: {0}")]
    Sample(#[from] SampleError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to write image {path}: {reason}")]
    WriteImage { path: PathBuf, reason: String },
}

/// Errors that occur while deriving a fingerprint from an image
#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("Image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("Invalid resample target {width}x{height}")]
    InvalidTarget { width: u32, height: u32 },

    #[error("Resampling failed: {0}")]
    ResizeFailed(String),
}

/// Errors raised by sample sources
#[derive(Error, Debug)]
pub enum SampleError {
    #[error("Failed to read sample directory {path}: {reason}")]
    ReadDirectory { path: PathBuf, reason: String },

    #[error("No usable images")]
    NoUsableImages,

    #[error("No usable pair of distinct images")]
    NoUsablePair,

    #[error("Failed to decode image {path}: {reason}")]
    DecodeError { path: PathBuf, reason: String },
}

/// Errors in strategy or harness configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown samer: {name} (expected avghash, colorprof or squashcomp)")]
    UnknownSamer { name: String },

    #[error("Unknown squash axis: {name} (expected vertical or horizontal)")]
    UnknownAxis { name: String },

    #[error("At least 2 trials are required to rate a samer, got {requested}")]
    TooFewTrials { requested: usize },

    #[error("Failed to read config file {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, SameSubjectError>;
