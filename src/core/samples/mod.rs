//! # Samples Module
//!
//! Sample sources backed by a directory of image files.
//!
//! Files that fail to decode are dropped from the pool the first time they
//! are drawn, so a directory with a few broken files still works as long as
//! enough decodable ones remain.

use crate::core::rating::SampleSource;
use crate::error::SampleError;
use image::DynamicImage;
use rand::Rng;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Draws random samples from the regular files of one directory
#[derive(Debug, Clone)]
pub struct DirSamples {
    paths: Vec<PathBuf>,
}

impl DirSamples {
    /// List the files directly inside `dir` (no recursion)
    pub fn new(dir: &Path) -> Result<Self, SampleError> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| SampleError::ReadDirectory {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })?;
            if entry.file_type().is_file() {
                paths.push(entry.into_path());
            }
        }
        tracing::debug!(dir = %dir.display(), files = paths.len(), "listed sample directory");
        Ok(Self { paths })
    }

    /// Number of candidate files not yet found to be undecodable
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn discard(&mut self, index: usize) {
        let path = self.paths.swap_remove(index);
        tracing::debug!(path = %path.display(), "dropped undecodable sample");
    }
}

/// Decode one image file
pub fn decode(path: &Path) -> Result<DynamicImage, SampleError> {
    image::open(path).map_err(|e| SampleError::DecodeError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

impl SampleSource for DirSamples {
    fn random(&mut self) -> Result<DynamicImage, SampleError> {
        let mut rng = rand::thread_rng();
        while !self.paths.is_empty() {
            let index = rng.gen_range(0..self.paths.len());
            match decode(&self.paths[index]) {
                Ok(image) => return Ok(image),
                Err(_) => self.discard(index),
            }
        }
        Err(SampleError::NoUsableImages)
    }

    fn random_distinct_pair(&mut self) -> Result<(DynamicImage, DynamicImage), SampleError> {
        let mut rng = rand::thread_rng();
        let mut first: Option<(PathBuf, DynamicImage)> = None;

        while self.paths.len() > 1 {
            let index = rng.gen_range(0..self.paths.len());
            if first.as_ref().is_some_and(|(path, _)| *path == self.paths[index]) {
                continue;
            }
            match decode(&self.paths[index]) {
                Ok(image) => match first.take() {
                    Some((_, first_image)) => return Ok((first_image, image)),
                    None => first = Some((self.paths[index].clone(), image)),
                },
                Err(_) => self.discard(index),
            }
        }
        Err(SampleError::NoUsablePair)
    }
}
