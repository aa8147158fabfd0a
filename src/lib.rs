//! # Same Subject
//!
//! Decides whether two raster images depict the same subject, and finds all
//! near-duplicate pairs in a stream of images.
//!
//! ## Architecture
//! - `core` - Strategies, the streaming batch matcher and the rating harness
//! - `error` - Error types
//! - `cli` (binary only) - Command-line interface

pub mod core;
pub mod error;

// Re-export commonly used types at the crate root
pub use error::{Result, SameSubjectError};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. Filtering follows
/// `RUST_LOG`.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
