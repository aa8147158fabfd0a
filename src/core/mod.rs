//! # Core Module
//!
//! The same-subject engine.
//!
//! ## Modules
//! - `samer` - Strategies that decide whether two images show the same subject
//! - `batch` - Streams near-duplicate pairs out of an image sequence
//! - `rating` - Measures a strategy's accuracy against sample images
//! - `samples` - Directory-backed sample source
//! - `manipulate` - Randomized edits that synthesize positive pairs

pub mod batch;
pub mod manipulate;
pub mod rating;
pub mod samer;
pub mod samples;

// Re-export commonly used types
pub use batch::{BatchMatcher, IdImage, Pair, PairReceiver};
pub use manipulate::{default_manipulator, Manipulator};
pub use rating::{rate, Rating, SampleSource};
pub use samer::{BatchSamer, Samer, SamerConfig, SamerKind};
pub use samples::DirSamples;
