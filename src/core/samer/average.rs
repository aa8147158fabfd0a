//! Average Hash (aHash) strategy.
//!
//! aHash works by:
//! 1. Resizing the image to scale_size x scale_size (bilinear)
//! 2. Converting each sample to a brightness in [0, 1]
//! 3. Computing the mean brightness
//! 4. For each sample: bit is set iff it is strictly brighter than the mean
//!
//! Two images are the same when the fraction of agreeing bits reaches the
//! threshold.

use super::resample::{resample, Rgb16, CHANNEL_MAX};
use super::{BatchSamer, Samer, SamerKind};
use crate::error::FingerprintError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SCALE_SIZE: u32 = 8;
pub const DEFAULT_THRESHOLD: f64 = 0.9;

/// Average Hash strategy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AverageHash {
    /// Side length of the thumbnail; 0 means `DEFAULT_SCALE_SIZE`
    pub scale_size: u32,
    /// Minimum fraction of matching bits; 0 means `DEFAULT_THRESHOLD`
    pub threshold: f64,
}

/// Ordered bit signature of an image, one bit per thumbnail sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitSignature(Vec<bool>);

impl BitSignature {
    /// Wrap bits in thumbnail row-major order
    pub fn new(bits: Vec<bool>) -> Self {
        Self(bits)
    }

    /// The bits, one per thumbnail sample
    pub fn bits(&self) -> &[bool] {
        &self.0
    }

    /// Number of bits (scale size squared)
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fraction of positions where both signatures agree.
    ///
    /// Both signatures must come from the same scale size. An empty
    /// signature agrees with nothing.
    pub fn match_ratio(&self, other: &BitSignature) -> f64 {
        debug_assert_eq!(
            self.len(),
            other.len(),
            "comparing signatures of different scale sizes"
        );
        if self.is_empty() || other.is_empty() {
            return 0.0;
        }
        let matching = self
            .0
            .iter()
            .zip(other.0.iter())
            .filter(|(a, b)| a == b)
            .count();
        matching as f64 / self.len() as f64
    }
}

impl AverageHash {
    /// Create a new aHash strategy; zero values take the defaults
    pub fn new(scale_size: u32, threshold: f64) -> Self {
        Self {
            scale_size,
            threshold,
        }
    }

    /// Default scale size with a custom threshold
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    /// Compute the bit signature of an image
    pub fn hash(&self, image: &DynamicImage) -> Result<BitSignature, FingerprintError> {
        let size = self.scale_size();
        let samples = resample(image, size, size)?;

        let brightnesses: Vec<f64> = samples.iter().map(brightness).collect();
        let mean = brightnesses.iter().sum::<f64>() / brightnesses.len() as f64;

        Ok(BitSignature(
            brightnesses.into_iter().map(|b| b > mean).collect(),
        ))
    }

    fn scale_size(&self) -> u32 {
        if self.scale_size == 0 {
            DEFAULT_SCALE_SIZE
        } else {
            self.scale_size
        }
    }

    fn threshold(&self) -> f64 {
        if self.threshold == 0.0 {
            DEFAULT_THRESHOLD
        } else {
            self.threshold
        }
    }
}

/// Rec. 601 luma, normalized to [0, 1]
fn brightness(px: &Rgb16) -> f64 {
    let [r, g, b] = px.map(f64::from);
    (0.299 * r + 0.587 * g + 0.114 * b) / CHANNEL_MAX
}

impl Samer for AverageHash {
    fn same(&self, a: &DynamicImage, b: &DynamicImage) -> bool {
        self.same_by_fingerprint(a, b)
    }

    fn kind(&self) -> SamerKind {
        SamerKind::AverageHash
    }
}

impl BatchSamer for AverageHash {
    type Fingerprint = BitSignature;

    fn fingerprint(&self, image: &DynamicImage) -> Result<BitSignature, FingerprintError> {
        self.hash(image)
    }

    fn fingerprints_match(&self, a: &BitSignature, b: &BitSignature) -> bool {
        a.match_ratio(b) >= self.threshold()
    }
}
