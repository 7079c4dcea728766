use std::path::PathBuf;

use clap::Parser;

use crate::config;

#[derive(Parser, Debug)]
#[command(name = "find-duplicates", author, version, about = "Find duplicate files, concurrently")]
pub struct CliOptions {
    /// Minimum number of identical files for a group to be reported
    #[arg(short = 'n', long, default_value_t = config::DEFAULT_THRESHOLD)]
    pub threshold: usize,

    /// Keep going after file and directory errors
    #[arg(short, long)]
    pub keep_going: bool,

    /// Print statistics to stderr when done
    #[arg(short, long)]
    pub statistics: bool,

    /// Output file; "-" or absent means stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write a TRACE-level execution log to FILE
    #[arg(long, value_name = "FILE")]
    pub trace: Option<PathBuf>,

    /// Cap on concurrent hashers
    #[arg(long, value_name = "N", default_value_t = config::default_hasher_limit())]
    pub hasher_limit: usize,

    /// Cap on concurrent directory walkers
    #[arg(long, value_name = "N", default_value_t = config::default_walker_limit())]
    pub walker_limit: usize,

    /// Root directories to scan; defaults to the current directory
    #[arg(value_name = "PATH")]
    pub roots: Vec<PathBuf>,
}

/// Parse the command line. Argument errors exit 1; help and version output
/// exit 0.
pub fn parse() -> CliOptions {
    match CliOptions::try_parse() {
        Ok(opts) => opts,
        Err(err) => {
            let _ = err.print();
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    }
}
