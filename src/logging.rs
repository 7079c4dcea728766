//! Logging setup.
//!
//! Diagnostics go to stderr, filtered by `RUST_LOG` with a default of
//! `warn`, so the result JSON on stdout stays clean. With a trace file
//! configured, a second layer captures everything down to TRACE level,
//! which includes the walker's per-directory events.

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

pub fn init(trace_file: Option<&Path>) -> io::Result<()> {
    let stderr_layer = fmt::layer().with_writer(io::stderr).with_filter(
        EnvFilter::builder()
            .with_default_directive(LevelFilter::WARN.into())
            .from_env_lossy(),
    );

    match trace_file {
        Some(path) => {
            let file = File::create(path)?;
            let trace_layer = fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .with_filter(LevelFilter::TRACE);
            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(trace_layer)
                .init();
        }
        None => {
            tracing_subscriber::registry().with(stderr_layer).init();
        }
    }
    Ok(())
}
