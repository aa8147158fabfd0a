//! Bilinear resampling to 16-bit RGB samples.
//!
//! Uses fast_image_resize, which picks AVX2/NEON kernels when available.
//! Every strategy that needs a shrunken image goes through here so they all
//! see the same filter and the same 0-65535 channel range.

use crate::error::FingerprintError;
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::DynamicImage;

/// Largest channel value after resampling
pub const CHANNEL_MAX: f64 = u16::MAX as f64;

/// One resampled pixel, `[r, g, b]` in 0-65535
pub type Rgb16 = [u16; 3];

/// An image converted once into the resizer's 16-bit RGB layout, ready to
/// be resampled at any number of target sizes.
pub struct ResampleSource {
    image: Image<'static>,
}

impl ResampleSource {
    pub fn new(image: &DynamicImage) -> Result<Self, FingerprintError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(FingerprintError::EmptyImage {
                width: image.width(),
                height: image.height(),
            });
        }

        let rgb = image.to_rgb16();
        let (width, height) = rgb.dimensions();
        let bytes: Vec<u8> = rgb
            .as_raw()
            .iter()
            .flat_map(|channel| channel.to_ne_bytes())
            .collect();

        let image = Image::from_vec_u8(width, height, bytes, PixelType::U16x3)
            .map_err(|e| FingerprintError::ResizeFailed(format!("source buffer: {}", e)))?;
        Ok(Self { image })
    }
}

/// Resampler wrapping a reusable fast_image_resize `Resizer`
pub struct BilinearResampler {
    resizer: Resizer,
}

impl BilinearResampler {
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
        }
    }

    /// Resize `image` to exactly `width` x `height` and return its pixels in
    /// row-major order.
    pub fn resample(
        &mut self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<Vec<Rgb16>, FingerprintError> {
        let source = ResampleSource::new(image)?;
        self.resample_source(&source, width, height)
    }

    /// Like `resample`, for a source that has already been converted
    pub fn resample_source(
        &mut self,
        source: &ResampleSource,
        width: u32,
        height: u32,
    ) -> Result<Vec<Rgb16>, FingerprintError> {
        if width == 0 || height == 0 {
            return Err(FingerprintError::InvalidTarget { width, height });
        }

        let mut dst_image = Image::new(width, height, PixelType::U16x3);

        // Bilinear convolution widens its support when shrinking, so every
        // source pixel contributes even at a 1-pixel target.
        let options =
            ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));

        self.resizer
            .resize(&source.image, &mut dst_image, &options)
            .map_err(|e| FingerprintError::ResizeFailed(e.to_string()))?;

        let channels: Vec<u16> = dst_image
            .into_vec()
            .chunks_exact(2)
            .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
            .collect();

        Ok(channels
            .chunks_exact(3)
            .map(|px| [px[0], px[1], px[2]])
            .collect())
    }
}

impl Default for BilinearResampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function for one-off resampling
pub fn resample(
    image: &DynamicImage,
    width: u32,
    height: u32,
) -> Result<Vec<Rgb16>, FingerprintError> {
    BilinearResampler::new().resample(image, width, height)
}
