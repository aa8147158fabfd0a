//! # Rating Module
//!
//! Measures how often a samer gets it right.
//!
//! Half of the trials show the samer two independent manipulations of one
//! sample (it should answer "same"); the other half show it two distinct
//! samples (it should answer "different"). The two success rates are
//! reported separately since a samer can trade one for the other through its
//! threshold.

use crate::core::manipulate::Manipulator;
use crate::core::samer::Samer;
use crate::error::{ConfigError, Result, SampleError};
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Any source of sample images
pub trait SampleSource {
    /// Pick one sample at random
    fn random(&mut self) -> std::result::Result<DynamicImage, SampleError>;

    /// Pick two different samples at random
    fn random_distinct_pair(
        &mut self,
    ) -> std::result::Result<(DynamicImage, DynamicImage), SampleError>;
}

/// Success rates of a samer, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    /// Fraction of manipulated pairs reported as the same
    pub positive: f64,
    /// Fraction of distinct pairs reported as different
    pub negative: f64,
}

/// Rate a samer over `n` trials, rounded down to an even count.
///
/// The first error from `samples` aborts the run and is returned as is.
pub fn rate(
    samer: &dyn Samer,
    samples: &mut dyn SampleSource,
    manipulator: &dyn Manipulator,
    n: usize,
) -> Result<Rating> {
    rate_with_progress(samer, samples, manipulator, n, |_, _| {})
}

/// Like `rate`, calling `on_trial(completed, total)` after every trial
pub fn rate_with_progress<F>(
    samer: &dyn Samer,
    samples: &mut dyn SampleSource,
    manipulator: &dyn Manipulator,
    n: usize,
    mut on_trial: F,
) -> Result<Rating>
where
    F: FnMut(usize, usize),
{
    let half = n / 2;
    if half == 0 {
        return Err(ConfigError::TooFewTrials { requested: n }.into());
    }
    let total = half * 2;

    let mut positive_correct = 0usize;
    for i in 0..half {
        let sample = samples.random()?;
        let first = manipulator.manipulate(&sample);
        let second = manipulator.manipulate(&sample);
        if samer.same(&first, &second) {
            positive_correct += 1;
        }
        on_trial(i + 1, total);
    }

    let mut negative_correct = 0usize;
    for i in 0..half {
        let (first, second) = samples.random_distinct_pair()?;
        if !samer.same(&first, &second) {
            negative_correct += 1;
        }
        on_trial(half + i + 1, total);
    }

    let rating = Rating {
        positive: positive_correct as f64 / half as f64,
        negative: negative_correct as f64 / half as f64,
    };
    tracing::info!(
        samer = %samer.kind(),
        trials = total,
        positive = rating.positive,
        negative = rating.negative,
        "rating complete"
    );
    Ok(rating)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::samer::SamerKind;
    use crate::error::SameSubjectError;

    struct FixedSamer(bool);

    impl Samer for FixedSamer {
        fn same(&self, _: &DynamicImage, _: &DynamicImage) -> bool {
            self.0
        }

        fn kind(&self) -> SamerKind {
            SamerKind::AverageHash
        }
    }

    struct Identity;

    impl Manipulator for Identity {
        fn manipulate(&self, image: &DynamicImage) -> DynamicImage {
            image.clone()
        }
    }

    /// Hands out blank images, failing after `limit` draws
    struct CountingSamples {
        draws: usize,
        limit: usize,
    }

    impl CountingSamples {
        fn unlimited() -> Self {
            Self {
                draws: 0,
                limit: usize::MAX,
            }
        }

        fn draw(&mut self) -> std::result::Result<DynamicImage, SampleError> {
            if self.draws >= self.limit {
                return Err(SampleError::NoUsableImages);
            }
            self.draws += 1;
            Ok(DynamicImage::new_rgb8(self.draws as u32, 1))
        }
    }

    impl SampleSource for CountingSamples {
        fn random(&mut self) -> std::result::Result<DynamicImage, SampleError> {
            self.draw()
        }

        fn random_distinct_pair(
            &mut self,
        ) -> std::result::Result<(DynamicImage, DynamicImage), SampleError> {
            Ok((self.draw()?, self.draw()?))
        }
    }

    #[test]
    fn always_same_is_perfect_on_positives() {
        let rating = rate(&FixedSamer(true), &mut CountingSamples::unlimited(), &Identity, 10)
            .unwrap();
        assert_eq!(rating, Rating { positive: 1.0, negative: 0.0 });
    }

    #[test]
    fn always_different_is_perfect_on_negatives() {
        let rating = rate(&FixedSamer(false), &mut CountingSamples::unlimited(), &Identity, 2)
            .unwrap();
        assert_eq!(rating, Rating { positive: 0.0, negative: 1.0 });
    }

    #[test]
    fn odd_trial_count_rounds_down() {
        let mut samples = CountingSamples::unlimited();
        let mut calls = Vec::new();
        rate_with_progress(&FixedSamer(true), &mut samples, &Identity, 7, |done, total| {
            calls.push((done, total))
        })
        .unwrap();

        assert_eq!(calls.len(), 6);
        assert_eq!(calls.last(), Some(&(6, 6)));
        // 3 positive draws plus 3 pairs
        assert_eq!(samples.draws, 9);
    }

    #[test]
    fn too_few_trials_is_rejected() {
        let err = rate(&FixedSamer(true), &mut CountingSamples::unlimited(), &Identity, 1)
            .unwrap_err();
        assert!(matches!(
            err,
            SameSubjectError::Config(ConfigError::TooFewTrials { requested: 1 })
        ));
    }

    #[test]
    fn sample_errors_abort_the_run() {
        let mut samples = CountingSamples { draws: 0, limit: 3 };
        let err = rate(&FixedSamer(true), &mut samples, &Identity, 10).unwrap_err();
        assert!(matches!(
            err,
            SameSubjectError::Sample(SampleError::NoUsableImages)
        ));
    }

    #[test]
    fn real_samer_rates_identity_manipulation_perfectly() {
        let samer = crate::core::samer::ColorProfile::default();
        let rating = rate(&samer, &mut CountingSamples::unlimited(), &Identity, 4).unwrap();
        assert_eq!(rating.positive, 1.0);
    }
}
