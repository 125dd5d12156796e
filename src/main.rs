//! elcollect CLI: watch production-line shares and collect their images.

use anyhow::Result;
use clap::Parser;
use elcollect::engine::arg_parser::Cli;
use elcollect::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
