use std::path::PathBuf;
use std::process;

use anyhow::Result;
use tracing::info;

use find_duplicates::{cli, config::FinderConfig, error::FindError, logging, output, DupFinder};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let opts = cli::parse();
    logging::init(opts.trace.as_deref())?;

    if opts.hasher_limit == 0 {
        return Err(FindError::Argument("hasher-limit must be at least 1".into()).into());
    }
    if opts.walker_limit == 0 {
        return Err(FindError::Argument("walker-limit must be at least 1".into()).into());
    }

    let roots = if opts.roots.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        opts.roots.clone()
    };

    let config = FinderConfig {
        roots,
        threshold: opts.threshold,
        keep_going: opts.keep_going,
        walker_limit: opts.walker_limit,
        hasher_limit: opts.hasher_limit,
        ..FinderConfig::default()
    };

    let mut finder = DupFinder::new(config);
    let result = finder.run()?;

    let mut writer = output::open_output(opts.output.as_deref())?;
    output::write_result(&mut writer, &result)?;

    let snapshot = finder.statistics();
    info!(
        files = snapshot.files,
        files_opened = snapshot.files_opened,
        bytes_hashed = snapshot.bytes_hashed,
        groups = result.len(),
        "run finished"
    );
    if opts.statistics {
        output::write_statistics(&snapshot)?;
    }

    Ok(())
}
