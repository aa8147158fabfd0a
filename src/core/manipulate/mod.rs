//! # Manipulate Module
//!
//! Realistic, randomized edits used to synthesize "same subject" pairs:
//! rescaling, cropping and lossy JPEG round-trips. Each call may do
//! something different.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use rand::Rng;
use std::io::Cursor;

/// Applies a possibly random edit to an image
pub trait Manipulator: Send + Sync {
    fn manipulate(&self, image: &DynamicImage) -> DynamicImage;
}

/// Resize by a random ratio in `[min_scale, max_scale]`, keeping the aspect
/// ratio, with a randomly chosen resampling filter.
#[derive(Debug, Clone)]
pub struct Scale {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Filters to choose from; empty means all of `FILTERS`
    pub filters: Vec<FilterType>,
}

/// Every resampling filter the image crate offers
pub const FILTERS: [FilterType; 5] = [
    FilterType::Nearest,
    FilterType::Triangle,
    FilterType::CatmullRom,
    FilterType::Gaussian,
    FilterType::Lanczos3,
];

impl Scale {
    /// Scale within `[min_scale, max_scale]` using any of `FILTERS`
    pub fn new(min_scale: f64, max_scale: f64) -> Self {
        Self {
            min_scale,
            max_scale,
            filters: Vec::new(),
        }
    }
}

impl Manipulator for Scale {
    fn manipulate(&self, image: &DynamicImage) -> DynamicImage {
        let mut rng = rand::thread_rng();
        let filters: &[FilterType] = if self.filters.is_empty() {
            &FILTERS
        } else {
            &self.filters
        };
        let filter = filters[rng.gen_range(0..filters.len())];
        let scale = self.min_scale + rng.gen::<f64>() * (self.max_scale - self.min_scale);

        let width = scaled_length(image.width(), scale);
        let height = scaled_length(image.height(), scale);
        image.resize_exact(width, height, filter)
    }
}

fn scaled_length(length: u32, scale: f64) -> u32 {
    ((f64::from(length) * scale).round() as u32).max(1)
}

/// Crop a random region.
///
/// The major axis is the longer side of the image (either side, chosen at
/// random, for a square). At least `min_major_keep` of the major axis and
/// `min_minor_keep` of the minor axis survive. For a 1500x1000 image with
/// `min_minor_keep = 0.8`, the result is never shorter than 800 pixels.
#[derive(Debug, Clone)]
pub struct Crop {
    pub min_major_keep: f64,
    pub min_minor_keep: f64,
}

impl Manipulator for Crop {
    fn manipulate(&self, image: &DynamicImage) -> DynamicImage {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return image.clone();
        }
        let mut rng = rand::thread_rng();

        let major = width.max(height);
        let minor = width.min(height);
        let major_keep = self.min_major_keep + rng.gen::<f64>() * (1.0 - self.min_major_keep);
        let minor_keep = self.min_minor_keep + rng.gen::<f64>() * (1.0 - self.min_minor_keep);

        let new_major = kept_length(major, major_keep);
        let new_minor = kept_length(minor, minor_keep);
        let major_offset = rng.gen_range(0..=major - new_major);
        let minor_offset = rng.gen_range(0..=minor - new_minor);

        let x_major = if width == height {
            rng.gen_bool(0.5)
        } else {
            width > height
        };

        if x_major {
            image.crop_imm(major_offset, minor_offset, new_major, new_minor)
        } else {
            image.crop_imm(minor_offset, major_offset, new_minor, new_major)
        }
    }
}

fn kept_length(length: u32, keep: f64) -> u32 {
    ((f64::from(length) * keep).round() as u32).clamp(1, length)
}

/// Round-trip through JPEG at a random quality in
/// `[min_quality, max_quality]`. Zero bounds mean 1 and 100.
#[derive(Debug, Clone, Default)]
pub struct CompressJpeg {
    pub min_quality: u8,
    pub max_quality: u8,
}

impl CompressJpeg {
    fn quality_range(&self) -> (u8, u8) {
        let min = if self.min_quality == 0 { 1 } else { self.min_quality };
        let max = if self.max_quality == 0 { 100 } else { self.max_quality };
        (min.min(100), max.clamp(min.min(100), 100))
    }

    fn round_trip(&self, image: &DynamicImage, quality: u8) -> image::ImageResult<DynamicImage> {
        let mut buffer = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        image.to_rgb8().write_with_encoder(encoder)?;
        image::load_from_memory_with_format(buffer.get_ref(), image::ImageFormat::Jpeg)
    }
}

impl Manipulator for CompressJpeg {
    fn manipulate(&self, image: &DynamicImage) -> DynamicImage {
        let (min, max) = self.quality_range();
        let quality = rand::thread_rng().gen_range(min..=max);

        match self.round_trip(image, quality) {
            Ok(compressed) => compressed,
            Err(e) => {
                tracing::warn!("JPEG round-trip at quality {} failed: {}", quality, e);
                image.clone()
            }
        }
    }
}

/// Applies each member manipulator in order, each with its own probability
#[derive(Default)]
pub struct AggregateManipulator {
    steps: Vec<(Box<dyn Manipulator>, f64)>,
}

impl AggregateManipulator {
    /// Create an empty aggregate, which returns its input unchanged
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a manipulator applied with probability `probability`
    pub fn with(mut self, manipulator: impl Manipulator + 'static, probability: f64) -> Self {
        self.steps.push((Box::new(manipulator), probability));
        self
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Manipulator for AggregateManipulator {
    fn manipulate(&self, image: &DynamicImage) -> DynamicImage {
        let mut rng = rand::thread_rng();
        let mut current = image.clone();
        for (manipulator, probability) in &self.steps {
            if rng.gen::<f64>() < *probability {
                current = manipulator.manipulate(&current);
            }
        }
        current
    }
}

/// Reasonable mix of edits: rescale 0.5-1.5x, crop to at least half the long
/// side and 80% of the short side, JPEG at any quality. Each applies half of
/// the time.
pub fn default_manipulator() -> AggregateManipulator {
    AggregateManipulator::new()
        .with(Scale::new(0.5, 1.5), 0.5)
        .with(
            Crop {
                min_major_keep: 0.5,
                min_minor_keep: 0.8,
            },
            0.5,
        )
        .with(CompressJpeg::default(), 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 100])
        }))
    }

    #[test]
    fn scale_stays_within_bounds() {
        let scale = Scale::new(0.5, 1.5);
        let image = create_test_image(200, 100);
        for _ in 0..20 {
            let scaled = scale.manipulate(&image);
            assert!((100..=300).contains(&scaled.width()), "{}", scaled.width());
            assert!((50..=150).contains(&scaled.height()), "{}", scaled.height());
        }
    }

    #[test]
    fn fixed_scale_uses_given_filter() {
        let scale = Scale {
            min_scale: 2.0,
            max_scale: 2.0,
            filters: vec![FilterType::Nearest],
        };
        let scaled = scale.manipulate(&create_test_image(10, 7));
        assert_eq!((scaled.width(), scaled.height()), (20, 14));
    }

    #[test]
    fn crop_keeps_minimum_fractions() {
        let crop = Crop {
            min_major_keep: 0.5,
            min_minor_keep: 0.8,
        };
        let image = create_test_image(150, 100);
        for _ in 0..20 {
            let cropped = crop.manipulate(&image);
            assert!((75..=150).contains(&cropped.width()), "{}", cropped.width());
            assert!((80..=100).contains(&cropped.height()), "{}", cropped.height());
        }
    }

    #[test]
    fn crop_of_square_stays_inside() {
        let crop = Crop {
            min_major_keep: 0.3,
            min_minor_keep: 0.3,
        };
        let image = create_test_image(50, 50);
        for _ in 0..20 {
            let cropped = crop.manipulate(&image);
            assert!(cropped.width() >= 15 && cropped.width() <= 50);
            assert!(cropped.height() >= 15 && cropped.height() <= 50);
        }
    }

    #[test]
    fn jpeg_round_trip_keeps_dimensions() {
        let image = create_test_image(33, 21);
        let compressed = CompressJpeg {
            min_quality: 50,
            max_quality: 60,
        }
        .manipulate(&image);
        assert_eq!((compressed.width(), compressed.height()), (33, 21));
    }

    #[test]
    fn quality_defaults_to_full_range() {
        assert_eq!(CompressJpeg::default().quality_range(), (1, 100));
        let narrow = CompressJpeg {
            min_quality: 90,
            max_quality: 0,
        };
        assert_eq!(narrow.quality_range(), (90, 100));
    }

    #[test]
    fn aggregate_with_zero_probability_is_identity() {
        let aggregate = AggregateManipulator::new().with(Scale::new(2.0, 2.0), 0.0);
        let image = create_test_image(10, 10);
        assert_eq!(aggregate.manipulate(&image), image);
    }

    #[test]
    fn aggregate_applies_in_order() {
        let aggregate = AggregateManipulator::new()
            .with(Scale::new(2.0, 2.0), 1.0)
            .with(
                Crop {
                    min_major_keep: 1.0,
                    min_minor_keep: 1.0,
                },
                1.0,
            );
        let result = aggregate.manipulate(&create_test_image(8, 4));
        assert_eq!((result.width(), result.height()), (16, 8));
    }

    #[test]
    fn default_manipulator_has_three_steps() {
        assert_eq!(default_manipulator().len(), 3);
        let image = create_test_image(64, 48);
        let manipulated = default_manipulator().manipulate(&image);
        assert!(manipulated.width() > 0 && manipulated.height() > 0);
    }
}
