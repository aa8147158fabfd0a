//! # CLI Module
//!
//! Command-line interface for the same-subject engine.
//!
//! ## Usage
//! ```bash
//! # Print near-duplicate pairs in a directory as they are found
//! same-subject pairs ~/Photos
//!
//! # Crop-tolerant comparison with a looser threshold
//! same-subject pairs ~/Photos --samer squashcomp --threshold 0.99
//!
//! # Rate a strategy against a directory of samples
//! same-subject rate ~/Samples --count 200 --samer colorprof
//!
//! # Write one random manipulation of an image
//! same-subject manipulate original.jpg manipulated.png
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use same_subject::core::manipulate::{default_manipulator, Manipulator};
use same_subject::core::rating::rate_with_progress;
use same_subject::core::samer::{SamerConfig, SamerKind, SquashAxis};
use same_subject::core::samples::{decode, DirSamples};
use same_subject::core::{IdImage, Pair};
use same_subject::error::{ConfigError, Result, SameSubjectError, SampleError};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use walkdir::WalkDir;

/// Same Subject - find images that show the same thing
#[derive(Parser, Debug)]
#[command(name = "same-subject")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print pairs of near-duplicate images in a directory
    Pairs {
        /// Directory of images
        dir: PathBuf,

        #[command(flatten)]
        samer: SamerArgs,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Measure a strategy's accuracy on a directory of samples
    Rate {
        /// Directory of sample images
        dir: PathBuf,

        /// Number of trials (rounded down to an even number)
        #[arg(short, long, default_value = "100")]
        count: usize,

        #[command(flatten)]
        samer: SamerArgs,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Write one random manipulation of an image
    Manipulate {
        /// Image to manipulate
        input: PathBuf,

        /// Where to write the result (format from extension)
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
struct SamerArgs {
    /// Strategy to use
    #[arg(short, long)]
    samer: Option<Algorithm>,

    /// Match threshold (0 keeps the strategy default)
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Squash axis (squashcomp only)
    #[arg(long)]
    axis: Option<Axis>,

    /// JSON file with a full strategy configuration; flags override it
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Algorithm {
    /// Average Hash - fast, tolerant of rescaling (default)
    Avghash,
    /// Color Profile - compares color distributions only
    Colorprof,
    /// Squash Comparison - tolerant of cropping along one axis
    Squashcomp,
}

impl From<Algorithm> for SamerKind {
    fn from(algo: Algorithm) -> Self {
        match algo {
            Algorithm::Avghash => SamerKind::AverageHash,
            Algorithm::Colorprof => SamerKind::ColorProfile,
            Algorithm::Squashcomp => SamerKind::SquashComparison,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Axis {
    Vertical,
    Horizontal,
}

impl From<Axis> for SquashAxis {
    fn from(axis: Axis) -> Self {
        match axis {
            Axis::Vertical => SquashAxis::Vertical,
            Axis::Horizontal => SquashAxis::Horizontal,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (one path per line)
    Minimal,
}

impl SamerArgs {
    /// Config file first, then flags on top
    fn resolve(&self) -> Result<SamerConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => SamerConfig::new(),
        };
        if let Some(samer) = self.samer {
            config.kind = samer.into();
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(axis) = self.axis {
            config.axis = axis.into();
        }
        Ok(config)
    }
}

fn load_config(path: &Path) -> Result<SamerConfig> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let config = serde_json::from_str(&text).map_err(|e| ConfigError::ReadFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(config)
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Pairs { dir, samer, output } => run_pairs(&dir, samer.resolve()?, output),
        Commands::Rate {
            dir,
            count,
            samer,
            output,
        } => run_rate(&dir, count, samer.resolve()?, output),
        Commands::Manipulate { input, output } => run_manipulate(&input, &output),
    }
}

const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "gif", "bmp", "webp", "tiff"];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}

/// Decode the images of `dir` on a producer thread, handing them over one at
/// a time so decoding overlaps with matching.
fn stream_images(dir: &Path) -> Result<crossbeam_channel::Receiver<IdImage<PathBuf>>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| SampleError::ReadDirectory {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;
        if entry.file_type().is_file() && is_image(entry.path()) {
            paths.push(entry.into_path());
        }
    }

    let (sender, receiver) = crossbeam_channel::bounded(1);
    thread::spawn(move || {
        for path in paths {
            match decode(&path) {
                Ok(image) => {
                    if sender.send(IdImage::new(path, image)).is_err() {
                        return;
                    }
                }
                Err(e) => tracing::warn!("{}", e),
            }
        }
    });
    Ok(receiver)
}

fn run_pairs(dir: &Path, config: SamerConfig, output: OutputFormat) -> Result<()> {
    let term = Term::stderr();

    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Scanning").bold().cyan(),
            style(format!("{} with {}", dir.display(), config.kind)).dim()
        ))
        .ok();
    }

    let images = stream_images(dir)?;
    let (count, collected) = print_pairs(config.same_batch(images), output);

    match output {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "samer": config.kind.to_string(),
                "pairs": collected,
            });
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        }
        OutputFormat::Pretty => {
            term.write_line(&format!(
                "{} {} pairs found",
                style("✓").green().bold(),
                style(count).cyan()
            ))
            .ok();
        }
        OutputFormat::Minimal => {}
    }

    Ok(())
}

/// Print pairs as they stream in and count them. Only JSON output keeps the
/// pairs, since it prints them as one document at the end.
fn print_pairs<I>(pairs: I, output: OutputFormat) -> (usize, Vec<Pair<PathBuf>>)
where
    I: IntoIterator<Item = Pair<PathBuf>>,
{
    let mut collected = Vec::new();
    let mut count = 0usize;

    for pair in pairs {
        count += 1;
        match output {
            OutputFormat::Pretty => {
                println!("{} {}", style("≈").yellow().bold(), pair.first.display());
                println!("  {}", pair.second.display());
            }
            OutputFormat::Minimal => {
                println!("{}", pair.first.display());
                println!("{}", pair.second.display());
            }
            OutputFormat::Json => collected.push(pair),
        }
    }

    (count, collected)
}

fn run_rate(dir: &Path, count: usize, config: SamerConfig, output: OutputFormat) -> Result<()> {
    let samer = config.build();
    let mut samples = DirSamples::new(dir)?;
    let manipulator = default_manipulator();

    let progress = matches!(output, OutputFormat::Pretty).then(|| {
        let pb = ProgressBar::new((count / 2 * 2) as u64);
        let template = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}";
        if let Ok(bar_style) = ProgressStyle::default_bar().template(template) {
            pb.set_style(bar_style.progress_chars("█▓░"));
        }
        pb.set_message(config.kind.to_string());
        pb
    });

    let rating = rate_with_progress(
        samer.as_ref(),
        &mut samples,
        &manipulator,
        count,
        |done, _| {
            if let Some(pb) = &progress {
                pb.set_position(done as u64);
            }
        },
    );

    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }
    let rating = rating?;

    match output {
        OutputFormat::Pretty => {
            let term = Term::stdout();
            term.write_line(&format!(
                "{} {}",
                style("Rating").bold().underlined(),
                style(config.kind.description()).dim()
            ))
            .ok();
            term.write_line(&format!(
                "  Positive rating: {}",
                style(format!("{:.3}", rating.positive)).cyan()
            ))
            .ok();
            term.write_line(&format!(
                "  Negative rating: {}",
                style(format!("{:.3}", rating.negative)).cyan()
            ))
            .ok();
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "samer": config.kind.to_string(),
                "config": config,
                "rating": rating,
            });
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        }
        OutputFormat::Minimal => {
            println!("{} {}", rating.positive, rating.negative);
        }
    }

    Ok(())
}

fn run_manipulate(input: &Path, output: &Path) -> Result<()> {
    let image = decode(input)?;
    let manipulated = default_manipulator().manipulate(&image);
    manipulated
        .save(output)
        .map_err(|e| SameSubjectError::WriteImage {
            path: output.to_path_buf(),
            reason: e.to_string(),
        })?;
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        width = manipulated.width(),
        height = manipulated.height(),
        "wrote manipulation"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pairs() -> Vec<Pair<PathBuf>> {
        vec![
            Pair::new(PathBuf::from("a.png"), PathBuf::from("b.png")),
            Pair::new(PathBuf::from("a.png"), PathBuf::from("c.png")),
            Pair::new(PathBuf::from("b.png"), PathBuf::from("c.png")),
        ]
    }

    #[test]
    fn streaming_outputs_only_count_pairs() {
        for output in [OutputFormat::Pretty, OutputFormat::Minimal] {
            let (count, collected) = print_pairs(sample_pairs(), output);
            assert_eq!(count, 3);
            assert!(collected.is_empty());
        }
    }

    #[test]
    fn json_output_keeps_pairs_in_order() {
        let (count, collected) = print_pairs(sample_pairs(), OutputFormat::Json);
        assert_eq!(count, 3);
        assert_eq!(collected, sample_pairs());
    }

    #[test]
    fn flags_override_defaults() {
        let args = SamerArgs {
            samer: Some(Algorithm::Squashcomp),
            threshold: Some(0.98),
            axis: Some(Axis::Horizontal),
            config: None,
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.kind, SamerKind::SquashComparison);
        assert_eq!(config.threshold, 0.98);
        assert_eq!(config.axis, SquashAxis::Horizontal);
    }
}
