use clap::Parser;
use std::path::PathBuf;

/// Collect EL inspection images from production-line shares into one archive-ready tree.
#[derive(Clone, Parser)]
#[command(name = "elcollect")]
#[command(about = "Watch production-line shares and collect their JPEG images with normalized names.")]
pub struct Cli {
    /// Settings file. Default: `.elcollect.toml` in the working directory, if present.
    #[arg(long, short, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose output.
    #[arg(long, short = 'v')]
    pub verbose: bool,
}
