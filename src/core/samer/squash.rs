//! Squash Comparison strategy.
//!
//! Each image is "squashed" into a one-dimensional line by resampling one
//! axis down to a single pixel. The surviving axis is resampled to a fixed
//! number of samples, so an image and a rescaled copy give the same line.
//!
//! Cropping is handled by search: one image (the main one) stays at
//! `vector_size` samples while the other is tried at every length from
//! `ceil(vector_size * min_overlap)` up to `vector_size`, and at every offset
//! that keeps at least that many samples overlapping. Any window whose cosine
//! similarity reaches the threshold is a match.
//!
//! ## Cost
//! One directional search runs O(V^2) windows of O(V) each, for
//! V = `vector_size`, and `same` runs two of them. Raising `vector_size`
//! sharpens the comparison but grows cost cubically; lowering `min_overlap`
//! tolerates harsher crops but widens the search and admits more false
//! positives.

use super::resample::{BilinearResampler, ResampleSource, CHANNEL_MAX};
use super::vector::cosine_similarity;
use super::{BatchSamer, Samer, SamerKind};
use crate::error::{ConfigError, FingerprintError};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_MIN_OVERLAP: f64 = 0.7;
pub const DEFAULT_VECTOR_SIZE: usize = 150;
pub const DEFAULT_THRESHOLD: f64 = 0.995;

/// Axis collapsed to a single pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SquashAxis {
    /// Collapse rows; the line runs left to right
    #[default]
    Vertical,
    /// Collapse columns; the line runs top to bottom
    Horizontal,
}

impl std::fmt::Display for SquashAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SquashAxis::Vertical => write!(f, "vertical"),
            SquashAxis::Horizontal => write!(f, "horizontal"),
        }
    }
}

impl FromStr for SquashAxis {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "vertical" => Ok(SquashAxis::Vertical),
            "horizontal" => Ok(SquashAxis::Horizontal),
            _ => Err(ConfigError::UnknownAxis {
                name: name.to_string(),
            }),
        }
    }
}

/// Squash Comparison strategy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SquashComparison {
    /// Axis squashed for the comparison
    pub axis: SquashAxis,
    /// Fraction of the main line the other line must cover. 0.8 means up to
    /// 20% of the unsquashed axis may be cropped away. 0 means
    /// `DEFAULT_MIN_OVERLAP`.
    pub min_overlap: f64,
    /// Samples along the unsquashed axis; 0 means `DEFAULT_VECTOR_SIZE`
    pub vector_size: usize,
    /// Minimum cosine similarity for a match; 0 means `DEFAULT_THRESHOLD`
    pub threshold: f64,
}

/// Squashed lines of one image at every length the search can ask for.
///
/// `at(n)` returns the `3 * n` interleaved R, G, B values of the line
/// resampled to `n` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct SquashProfile {
    min_size: usize,
    lines: Vec<Vec<f64>>,
}

impl SquashProfile {
    /// The line at `size` samples, if the profile covers that size
    pub fn at(&self, size: usize) -> Option<&[f64]> {
        size.checked_sub(self.min_size)
            .and_then(|i| self.lines.get(i))
            .map(Vec::as_slice)
    }

    /// Shortest line length held
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// Longest line length held
    pub fn max_size(&self) -> usize {
        self.min_size + self.lines.len().saturating_sub(1)
    }
}

impl SquashComparison {
    /// Create a new squash strategy; zero values take the defaults
    pub fn new(axis: SquashAxis, min_overlap: f64, vector_size: usize, threshold: f64) -> Self {
        Self {
            axis,
            min_overlap,
            vector_size,
            threshold,
        }
    }

    /// Default vertical search with a custom threshold
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    /// Squash an image into `n` samples, returned as `3 * n` values in [0, 1]
    pub fn squash(&self, image: &DynamicImage, n: usize) -> Result<Vec<f64>, FingerprintError> {
        let source = ResampleSource::new(image)?;
        self.squash_source(&mut BilinearResampler::new(), &source, n)
    }

    fn squash_source(
        &self,
        resampler: &mut BilinearResampler,
        source: &ResampleSource,
        n: usize,
    ) -> Result<Vec<f64>, FingerprintError> {
        let n = u32::try_from(n).map_err(|_| FingerprintError::InvalidTarget {
            width: u32::MAX,
            height: 1,
        })?;
        let (width, height) = match self.axis {
            SquashAxis::Vertical => (n, 1),
            SquashAxis::Horizontal => (1, n),
        };

        let samples = resampler.resample_source(source, width, height)?;
        Ok(samples
            .iter()
            .flat_map(|px| px.map(|c| f64::from(c) / CHANNEL_MAX))
            .collect())
    }

    /// Squash an image at every size from the minimum overlap to the full
    /// vector size
    pub fn profile(&self, image: &DynamicImage) -> Result<SquashProfile, FingerprintError> {
        let source = ResampleSource::new(image)?;
        let mut resampler = BilinearResampler::new();
        let min_size = self.min_size();

        let lines = (min_size..=self.vector_size())
            .map(|size| self.squash_source(&mut resampler, &source, size))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SquashProfile { min_size, lines })
    }

    /// Keep `main` at full size and slide every allowed rescale of
    /// `secondary` along it.
    fn asymmetrical_match(&self, main: &SquashProfile, secondary: &SquashProfile) -> bool {
        let vector_size = self.vector_size();
        let min_size = self.min_size();
        let Some(main_line) = main.at(vector_size) else {
            return false;
        };

        for size in min_size..=vector_size {
            let Some(secondary_line) = secondary.at(size) else {
                continue;
            };
            let allowed_miss = (size - min_size) as isize;
            let first = -allowed_miss;
            let last = (vector_size - size) as isize + allowed_miss;

            if (first..=last).any(|offset| self.window_match(main_line, secondary_line, offset)) {
                return true;
            }
        }

        false
    }

    /// Correlate `secondary` placed `offset` samples into `main`, over the
    /// region where the two overlap.
    fn window_match(&self, main: &[f64], secondary: &[f64], offset: isize) -> bool {
        let shift = offset.unsigned_abs() * 3;
        let (main, secondary) = if offset < 0 {
            (main, secondary.get(shift..).unwrap_or(&[]))
        } else {
            (main.get(shift..).unwrap_or(&[]), secondary)
        };

        let len = main.len().min(secondary.len());
        cosine_similarity(&main[..len], &secondary[..len])
            .is_some_and(|correlation| correlation >= self.threshold())
    }

    fn min_size(&self) -> usize {
        let vector_size = self.vector_size();
        let min_size = (vector_size as f64 * self.min_overlap()).ceil() as usize;
        min_size.clamp(1, vector_size)
    }

    fn min_overlap(&self) -> f64 {
        if self.min_overlap == 0.0 {
            DEFAULT_MIN_OVERLAP
        } else {
            self.min_overlap
        }
    }

    fn vector_size(&self) -> usize {
        if self.vector_size == 0 {
            DEFAULT_VECTOR_SIZE
        } else {
            self.vector_size
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

impl Samer for SquashComparison {
    fn same(&self, a: &DynamicImage, b: &DynamicImage) -> bool {
        self.same_by_fingerprint(a, b)
    }

    fn kind(&self) -> SamerKind {
        SamerKind::SquashComparison
    }
}

impl BatchSamer for SquashComparison {
    type Fingerprint = SquashProfile;

    fn fingerprint(&self, image: &DynamicImage) -> Result<SquashProfile, FingerprintError> {
        self.profile(image)
    }

    /// The search is anchored on the main image, so both directions are
    /// tried to keep the result symmetric.
    fn fingerprints_match(&self, a: &SquashProfile, b: &SquashProfile) -> bool {
        self.asymmetrical_match(a, b) || self.asymmetrical_match(b, a)
    }
}
