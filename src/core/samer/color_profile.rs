//! Color Profile strategy.
//!
//! Builds one histogram per RGB channel, concatenates the three, and takes
//! the cosine similarity of the raw bin counts. Counts are not normalized by
//! pixel count; cosine similarity already ignores overall scale, so images of
//! different resolutions compare fine.

use super::vector::{cosine_similarity, join};
use super::{BatchSamer, Samer, SamerKind};
use crate::error::FingerprintError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BIN_COUNT: usize = 8;
pub const DEFAULT_THRESHOLD: f64 = 0.97;

/// Color Profile strategy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorProfile {
    /// Bins per channel histogram; 0 means `DEFAULT_BIN_COUNT`
    pub bin_count: usize,
    /// Minimum cosine similarity; 0 means `DEFAULT_THRESHOLD`
    pub threshold: f64,
}

/// Red, green and blue histograms of one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorHistograms {
    pub red: Vec<f64>,
    pub green: Vec<f64>,
    pub blue: Vec<f64>,
}

impl ColorHistograms {
    fn empty(bin_count: usize) -> Self {
        Self {
            red: vec![0.0; bin_count],
            green: vec![0.0; bin_count],
            blue: vec![0.0; bin_count],
        }
    }

    /// Bins per channel
    pub fn bin_count(&self) -> usize {
        self.red.len()
    }

    /// Red, green and blue bins as one vector of length `3 * bin_count`
    pub fn joined(&self) -> Vec<f64> {
        join(&[&self.red, &self.green, &self.blue])
    }

    /// Cosine similarity of the joined histograms.
    ///
    /// `None` when either histogram is all zeros (an image with no pixels).
    pub fn correlation(&self, other: &ColorHistograms) -> Option<f64> {
        debug_assert_eq!(
            self.bin_count(),
            other.bin_count(),
            "comparing histograms with different bin counts"
        );
        cosine_similarity(&self.joined(), &other.joined())
    }
}

impl ColorProfile {
    /// Create a new color profile strategy; zero values take the defaults
    pub fn new(bin_count: usize, threshold: f64) -> Self {
        Self {
            bin_count,
            threshold,
        }
    }

    /// Default bin count with a custom threshold
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    /// Count every pixel's channels into per-channel bins
    pub fn histograms(&self, image: &DynamicImage) -> ColorHistograms {
        let bin_count = self.bin_count();
        let mut histograms = ColorHistograms::empty(bin_count);

        for px in image.to_rgb16().pixels() {
            let [r, g, b] = px.0;
            histograms.red[bin_index(r, bin_count)] += 1.0;
            histograms.green[bin_index(g, bin_count)] += 1.0;
            histograms.blue[bin_index(b, bin_count)] += 1.0;
        }

        histograms
    }

    fn bin_count(&self) -> usize {
        if self.bin_count == 0 {
            DEFAULT_BIN_COUNT
        } else {
            self.bin_count
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

/// Bin for one channel value; full intensity lands in the last bin
fn bin_index(value: u16, bin_count: usize) -> usize {
    let idx = (bin_count as f64 * f64::from(value) / f64::from(u16::MAX)) as usize;
    idx.min(bin_count - 1)
}

impl Samer for ColorProfile {
    fn same(&self, a: &DynamicImage, b: &DynamicImage) -> bool {
        self.same_by_fingerprint(a, b)
    }

    fn kind(&self) -> SamerKind {
        SamerKind::ColorProfile
    }
}

impl BatchSamer for ColorProfile {
    type Fingerprint = ColorHistograms;

    fn fingerprint(&self, image: &DynamicImage) -> Result<ColorHistograms, FingerprintError> {
        Ok(self.histograms(image))
    }

    fn fingerprints_match(&self, a: &ColorHistograms, b: &ColorHistograms) -> bool {
        a.correlation(b)
            .is_some_and(|correlation| correlation >= self.threshold())
    }
}
