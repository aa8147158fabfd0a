//! # Samer Module
//!
//! Strategies that decide whether two images show the same subject.
//!
//! ## Supported Strategies
//! - **avghash (Average Hash)** - bit signature of an 8x8 thumbnail, robust to
//!   scaling and mild tone changes
//! - **colorprof (Color Profile)** - cosine similarity of RGB histograms,
//!   ignores layout entirely
//! - **squashcomp (Squash Comparison)** - correlates 1-D projections at many
//!   relative scales and offsets, tolerates cropping along one axis
//!
//! Every strategy can fingerprint an image once and compare fingerprints
//! later, which is what the batch matcher relies on.
//!
//! ## Example
//! ```rust,ignore
//! use same_subject::core::samer::{SamerConfig, SamerKind};
//!
//! let samer = SamerConfig::new()
//!     .kind(SamerKind::ColorProfile)
//!     .threshold(0.95)
//!     .build();
//!
//! if samer.same(&first, &second) { /* ... */ }
//! ```

mod average;
mod color_profile;
pub mod resample;
mod squash;
pub mod vector;

pub use average::{AverageHash, BitSignature};
pub use color_profile::{ColorHistograms, ColorProfile};
pub use squash::{SquashAxis, SquashComparison, SquashProfile};

use crate::core::batch::{BatchMatcher, IdImage, PairReceiver};
use crate::error::{ConfigError, FingerprintError};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Estimates whether or not two images are of the same subject
pub trait Samer: Send + Sync {
    /// Decide whether both images show the same subject
    fn same(&self, a: &DynamicImage, b: &DynamicImage) -> bool;

    /// The strategy behind this samer
    fn kind(&self) -> SamerKind;
}

/// A samer whose per-image work can be computed once and reused.
///
/// Fingerprints are retained by the batch matcher for the lifetime of a run,
/// so each image is processed once no matter how many others it meets.
pub trait BatchSamer: Samer + Clone + 'static {
    /// Derived per-image value that pairwise matching operates on
    type Fingerprint: Send + 'static;

    /// Compute the fingerprint of a single image
    fn fingerprint(&self, image: &DynamicImage) -> Result<Self::Fingerprint, FingerprintError>;

    /// Pairwise match predicate over two fingerprints
    fn fingerprints_match(&self, a: &Self::Fingerprint, b: &Self::Fingerprint) -> bool;

    /// Fingerprint both images and match them.
    ///
    /// An image that cannot be fingerprinted is never the same as anything.
    fn same_by_fingerprint(&self, a: &DynamicImage, b: &DynamicImage) -> bool {
        let fingerprints = self
            .fingerprint(a)
            .and_then(|fa| self.fingerprint(b).map(|fb| (fa, fb)));
        match fingerprints {
            Ok((fa, fb)) => self.fingerprints_match(&fa, &fb),
            Err(e) => {
                tracing::debug!("{} could not fingerprint image: {}", self.kind(), e);
                false
            }
        }
    }

    /// Stream near-duplicate pairs from a sequence of identified images.
    fn same_batch<Id, I>(&self, images: I) -> PairReceiver<Id>
    where
        Id: Clone + Send + 'static,
        I: IntoIterator<Item = IdImage<Id>> + Send + 'static,
        I::IntoIter: Send,
    {
        BatchMatcher::new(self.clone()).spawn(images)
    }
}

/// Available strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SamerKind {
    /// Average Hash - bit signature of a tiny grayscale thumbnail
    #[default]
    #[serde(rename = "avghash")]
    AverageHash,
    /// Color Profile - RGB histogram cosine similarity
    #[serde(rename = "colorprof")]
    ColorProfile,
    /// Squash Comparison - crop and scale tolerant projection matching
    #[serde(rename = "squashcomp")]
    SquashComparison,
}

impl SamerKind {
    /// All strategies, in registry order
    pub const ALL: [SamerKind; 3] = [
        SamerKind::AverageHash,
        SamerKind::ColorProfile,
        SamerKind::SquashComparison,
    ];

    /// Get a human-readable description of the strategy
    pub fn description(&self) -> &'static str {
        match self {
            SamerKind::AverageHash => {
                "Average Hash - compares which thumbnail pixels are brighter than the mean"
            }
            SamerKind::ColorProfile => {
                "Color Profile - compares red, green and blue histograms"
            }
            SamerKind::SquashComparison => {
                "Squash Comparison - slides 1-D projections to survive crops and rescales"
            }
        }
    }
}

impl std::fmt::Display for SamerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamerKind::AverageHash => write!(f, "avghash"),
            SamerKind::ColorProfile => write!(f, "colorprof"),
            SamerKind::SquashComparison => write!(f, "squashcomp"),
        }
    }
}

impl FromStr for SamerKind {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        SamerKind::ALL
            .into_iter()
            .find(|kind| kind.to_string() == name)
            .ok_or_else(|| ConfigError::UnknownSamer {
                name: name.to_string(),
            })
    }
}

/// Configuration for constructing any strategy by kind.
///
/// Options that do not apply to the chosen kind are ignored. A zero value
/// means "use the strategy's default".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamerConfig {
    /// Strategy to build
    pub kind: SamerKind,
    /// Match threshold (all strategies)
    pub threshold: f64,
    /// Thumbnail side length (avghash)
    pub scale_size: u32,
    /// Histogram bins per channel (colorprof)
    pub bin_count: usize,
    /// Axis collapsed by the projection (squashcomp)
    pub axis: SquashAxis,
    /// Minimum covered fraction of the projection (squashcomp)
    pub min_overlap: f64,
    /// Projection length (squashcomp)
    pub vector_size: usize,
}

impl SamerConfig {
    /// Create a configuration with every option unset
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the strategy
    pub fn kind(mut self, kind: SamerKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the match threshold
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the avghash thumbnail size
    pub fn scale_size(mut self, scale_size: u32) -> Self {
        self.scale_size = scale_size;
        self
    }

    /// Set the colorprof bin count
    pub fn bin_count(mut self, bin_count: usize) -> Self {
        self.bin_count = bin_count;
        self
    }

    /// Set the squashcomp axis
    pub fn axis(mut self, axis: SquashAxis) -> Self {
        self.axis = axis;
        self
    }

    /// Set the squashcomp minimum overlap
    pub fn min_overlap(mut self, min_overlap: f64) -> Self {
        self.min_overlap = min_overlap;
        self
    }

    /// Set the squashcomp vector size
    pub fn vector_size(mut self, vector_size: usize) -> Self {
        self.vector_size = vector_size;
        self
    }

    /// Average Hash strategy with this config's scale size and threshold
    pub fn average_hash(&self) -> AverageHash {
        AverageHash {
            scale_size: self.scale_size,
            threshold: self.threshold,
        }
    }

    /// Color Profile strategy with this config's bin count and threshold
    pub fn color_profile(&self) -> ColorProfile {
        ColorProfile {
            bin_count: self.bin_count,
            threshold: self.threshold,
        }
    }

    /// Squash Comparison strategy with this config's axis, overlap, vector
    /// size and threshold
    pub fn squash_comparison(&self) -> SquashComparison {
        SquashComparison {
            axis: self.axis,
            min_overlap: self.min_overlap,
            vector_size: self.vector_size,
            threshold: self.threshold,
        }
    }

    /// Build the samer
    pub fn build(&self) -> Box<dyn Samer> {
        match self.kind {
            SamerKind::AverageHash => Box::new(self.average_hash()),
            SamerKind::ColorProfile => Box::new(self.color_profile()),
            SamerKind::SquashComparison => Box::new(self.squash_comparison()),
        }
    }

    /// Run the batch matcher of the configured strategy
    pub fn same_batch<Id, I>(&self, images: I) -> PairReceiver<Id>
    where
        Id: Clone + Send + 'static,
        I: IntoIterator<Item = IdImage<Id>> + Send + 'static,
        I::IntoIter: Send,
    {
        match self.kind {
            SamerKind::AverageHash => self.average_hash().same_batch(images),
            SamerKind::ColorProfile => self.color_profile().same_batch(images),
            SamerKind::SquashComparison => self.squash_comparison().same_batch(images),
        }
    }
}
