//! # same-subject CLI
//!
//! ## Usage
//! ```bash
//! same-subject pairs ~/Photos --samer squashcomp
//! same-subject rate ~/Samples --count 200 --samer avghash --threshold 0.85
//! same-subject manipulate original.jpg manipulated.png
//! ```

mod cli;

use same_subject::Result;

fn main() -> Result<()> {
    same_subject::init_tracing();
    cli::run()
}
