//! # Batch Module
//!
//! Streams near-duplicate pairs out of a sequence of identified images.
//!
//! ## How It Works
//! 1. A single worker thread drains the input in arrival order
//! 2. Each new image is fingerprinted once
//! 3. Its fingerprint is matched against every fingerprint retained so far,
//!    and each match is sent out immediately as `Pair { earlier, new }`
//! 4. The new fingerprint joins the retained list
//!
//! Every unordered pair is therefore considered exactly once, when its later
//! member arrives. Memory grows by one fingerprint per image; comparisons
//! grow quadratically with the number of images.
//!
//! The worker owns the retained list, so there is no locking. Do not fan
//! comparisons out to several workers without serializing updates to that
//! list, or pairs may be reported twice or missed.

mod channel;

pub use channel::{pair_channel, PairReceiver, PairSender};

use crate::core::samer::BatchSamer;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::thread;

/// Default number of pairs buffered between the worker and the caller
pub const DEFAULT_CAPACITY: usize = 1;

/// An image tagged with a caller-chosen identifier.
///
/// The identifier is carried through untouched.
#[derive(Debug, Clone)]
pub struct IdImage<Id> {
    pub id: Id,
    pub image: DynamicImage,
}

impl<Id> IdImage<Id> {
    pub fn new(id: Id, image: DynamicImage) -> Self {
        Self { id, image }
    }
}

/// Two images found to show the same subject.
///
/// `first` arrived before `second`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair<Id> {
    pub first: Id,
    pub second: Id,
}

impl<Id> Pair<Id> {
    pub fn new(first: Id, second: Id) -> Self {
        Self { first, second }
    }
}

/// Runs a strategy's fingerprint/match steps over a stream of images
pub struct BatchMatcher<S> {
    samer: S,
    capacity: usize,
}

impl<S: BatchSamer> BatchMatcher<S> {
    /// Create a matcher with the default pair buffer
    pub fn new(samer: S) -> Self {
        Self {
            samer,
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Set how many found pairs may wait for the caller before the worker
    /// blocks
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Start the worker and return the stream of pairs.
    ///
    /// The stream ends after the last input image has been compared against
    /// everything before it. A panic on the worker (in the samer or in the
    /// input iterator) is re-raised by the receiver when the stream ends.
    /// Dropping or closing the receiver early stops the worker at its next
    /// send.
    pub fn spawn<Id, I>(self, images: I) -> PairReceiver<Id>
    where
        Id: Clone + Send + 'static,
        I: IntoIterator<Item = IdImage<Id>> + Send + 'static,
        I::IntoIter: Send,
    {
        let (sender, mut receiver) = pair_channel(self.capacity);
        let samer = self.samer;

        let worker = thread::spawn(move || run_worker(&samer, images, &sender));
        receiver.attach_worker(worker);

        receiver
    }
}

fn run_worker<S, Id, I>(samer: &S, images: I, pairs: &PairSender<Id>)
where
    S: BatchSamer,
    Id: Clone,
    I: IntoIterator<Item = IdImage<Id>>,
{
    let mut retained: Vec<(Id, S::Fingerprint)> = Vec::new();
    let mut skipped = 0usize;
    let mut found = 0usize;

    for IdImage { id, image } in images {
        let fingerprint = match samer.fingerprint(&image) {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                tracing::warn!("{} skipped an image it could not fingerprint: {}", samer.kind(), e);
                skipped += 1;
                continue;
            }
        };

        for (earlier_id, earlier) in &retained {
            if samer.fingerprints_match(earlier, &fingerprint) {
                found += 1;
                if !pairs.send(Pair::new(earlier_id.clone(), id.clone())) {
                    tracing::debug!("pair receiver dropped, stopping batch worker");
                    return;
                }
            }
        }

        retained.push((id, fingerprint));
        tracing::debug!(retained = retained.len(), "fingerprinted batch image");
    }

    tracing::info!(
        samer = %samer.kind(),
        images = retained.len(),
        skipped,
        pairs = found,
        "batch run complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::samer::{ColorProfile, Samer, SamerKind};
    use crate::error::FingerprintError;
    use image::{ImageBuffer, Rgb};
    use std::collections::HashSet;
    use std::panic;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Fingerprints an image by its width; widths within `tolerance` match.
    #[derive(Clone)]
    struct WidthSamer {
        tolerance: u32,
    }

    impl Samer for WidthSamer {
        fn same(&self, a: &DynamicImage, b: &DynamicImage) -> bool {
            self.same_by_fingerprint(a, b)
        }

        fn kind(&self) -> SamerKind {
            SamerKind::AverageHash
        }
    }

    impl BatchSamer for WidthSamer {
        type Fingerprint = u32;

        fn fingerprint(&self, image: &DynamicImage) -> Result<u32, FingerprintError> {
            if image.width() == 0 {
                return Err(FingerprintError::EmptyImage {
                    width: 0,
                    height: image.height(),
                });
            }
            Ok(image.width())
        }

        fn fingerprints_match(&self, a: &u32, b: &u32) -> bool {
            a.abs_diff(*b) <= self.tolerance
        }
    }

    fn blank(width: u32) -> DynamicImage {
        DynamicImage::new_rgb8(width, 2)
    }

    fn solid(color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_fn(8, 8, |_, _| Rgb(color)))
    }

    #[test]
    fn empty_input_yields_no_pairs() {
        let pairs: Vec<Pair<usize>> = BatchMatcher::new(WidthSamer { tolerance: 0 })
            .spawn(Vec::new())
            .collect();
        assert!(pairs.is_empty());
    }

    #[test]
    fn emits_exactly_the_matching_index_pairs() {
        let widths = [10, 11, 30, 10, 50, 31, 12];
        let samer = WidthSamer { tolerance: 1 };
        let images: Vec<_> = widths
            .iter()
            .enumerate()
            .map(|(i, &w)| IdImage::new(i, blank(w)))
            .collect();

        let emitted: Vec<Pair<usize>> = BatchMatcher::new(samer.clone()).spawn(images).collect();

        let mut expected = HashSet::new();
        for j in 0..widths.len() {
            for i in 0..j {
                if samer.fingerprints_match(&widths[i], &widths[j]) {
                    expected.insert(Pair::new(i, j));
                }
            }
        }

        let unique: HashSet<_> = emitted.iter().cloned().collect();
        assert_eq!(unique.len(), emitted.len(), "a pair was emitted twice");
        assert_eq!(unique, expected);
        assert!(emitted.iter().all(|p| p.first < p.second));
    }

    #[test]
    fn pairs_follow_arrival_order() {
        let images = vec![
            IdImage::new("a", blank(5)),
            IdImage::new("b", blank(5)),
            IdImage::new("c", blank(5)),
        ];
        let emitted: Vec<_> = BatchMatcher::new(WidthSamer { tolerance: 0 })
            .spawn(images)
            .collect();

        assert_eq!(
            emitted,
            vec![Pair::new("a", "b"), Pair::new("a", "c"), Pair::new("b", "c")]
        );
    }

    #[test]
    fn unfingerprintable_images_are_skipped() {
        let images = vec![
            IdImage::new(0, blank(7)),
            IdImage::new(1, blank(0)),
            IdImage::new(2, blank(7)),
        ];
        let emitted: Vec<_> = BatchMatcher::new(WidthSamer { tolerance: 0 })
            .spawn(images)
            .collect();
        assert_eq!(emitted, vec![Pair::new(0, 2)]);
    }

    #[test]
    fn consumes_a_live_channel() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let pairs = BatchMatcher::new(WidthSamer { tolerance: 0 }).spawn(rx);

        let producer = thread::spawn(move || {
            for (id, width) in [(0, 4), (1, 9), (2, 4)] {
                tx.send(IdImage::new(id, blank(width))).unwrap();
            }
        });

        let emitted: Vec<_> = pairs.collect();
        producer.join().unwrap();
        assert_eq!(emitted, vec![Pair::new(0, 2)]);
    }

    /// Counts fingerprint calls so tests can see how far the worker got
    #[derive(Clone)]
    struct CountingSamer {
        fingerprinted: Arc<AtomicUsize>,
    }

    impl Samer for CountingSamer {
        fn same(&self, a: &DynamicImage, b: &DynamicImage) -> bool {
            self.same_by_fingerprint(a, b)
        }

        fn kind(&self) -> SamerKind {
            SamerKind::AverageHash
        }
    }

    impl BatchSamer for CountingSamer {
        type Fingerprint = ();

        fn fingerprint(&self, _: &DynamicImage) -> Result<(), FingerprintError> {
            self.fingerprinted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn fingerprints_match(&self, _: &(), _: &()) -> bool {
            true
        }
    }

    /// Matches widths of equal parity and panics on a width of 99
    #[derive(Clone)]
    struct ParitySamer;

    impl Samer for ParitySamer {
        fn same(&self, a: &DynamicImage, b: &DynamicImage) -> bool {
            self.same_by_fingerprint(a, b)
        }

        fn kind(&self) -> SamerKind {
            SamerKind::AverageHash
        }
    }

    impl BatchSamer for ParitySamer {
        type Fingerprint = u32;

        fn fingerprint(&self, image: &DynamicImage) -> Result<u32, FingerprintError> {
            assert_ne!(image.width(), 99, "cannot fingerprint width 99");
            Ok(image.width() % 2)
        }

        fn fingerprints_match(&self, a: &u32, b: &u32) -> bool {
            a == b
        }
    }

    #[test]
    fn closing_receiver_stops_worker() {
        let fingerprinted = Arc::new(AtomicUsize::new(0));
        let samer = CountingSamer {
            fingerprinted: Arc::clone(&fingerprinted),
        };
        let images: Vec<_> = (0..50).map(|i| IdImage::new(i, blank(3))).collect();

        let mut pairs = BatchMatcher::new(samer).spawn(images);
        assert_eq!(pairs.next(), Some(Pair::new(0, 1)));
        pairs.close();

        // 50 images would need 1225 sends; the worker gives up at its first
        // failed one
        assert!(fingerprinted.load(Ordering::SeqCst) < 10);
    }

    #[test]
    fn worker_panic_reaches_the_caller() {
        let images: Vec<_> = [2, 4, 99, 6, 8]
            .into_iter()
            .enumerate()
            .map(|(i, w)| IdImage::new(i, blank(w)))
            .collect();

        let outcome = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            BatchMatcher::new(ParitySamer).spawn(images).collect::<Vec<_>>()
        }));

        assert!(outcome.is_err(), "a partial pair list ended normally");
    }

    #[test]
    fn parity_samer_without_panic_finds_all_pairs() {
        let images: Vec<_> = [2, 4, 6, 8]
            .into_iter()
            .enumerate()
            .map(|(i, w)| IdImage::new(i, blank(w)))
            .collect();
        let emitted: Vec<_> = BatchMatcher::new(ParitySamer).spawn(images).collect();
        assert_eq!(emitted.len(), 6);
    }

    #[test]
    fn larger_capacity_buffers_pairs() {
        let images: Vec<_> = (0..4).map(|i| IdImage::new(i, blank(6))).collect();
        let emitted: Vec<_> = BatchMatcher::new(WidthSamer { tolerance: 0 })
            .with_capacity(16)
            .spawn(images)
            .collect();
        assert_eq!(emitted.len(), 6);
    }

    #[test]
    fn color_profile_batch_finds_repeated_colors() {
        let images = vec![
            IdImage::new("red", solid([255, 0, 0])),
            IdImage::new("blue", solid([0, 0, 255])),
            IdImage::new("red again", solid([250, 2, 1])),
            IdImage::new("green", solid([0, 255, 0])),
        ];
        let emitted: Vec<_> = ColorProfile::default().same_batch(images).collect();
        assert_eq!(emitted, vec![Pair::new("red", "red again")]);
    }
}
