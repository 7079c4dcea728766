//! # Pipeline
//!
//! Orchestrates the duplicate-finding pipeline: five concurrent stages
//! connected by bounded queues, supervised over a shared error channel.
//!
//! ```text
//! roots ──▶ walker pool ──▶ deduper ──▶ size filter ──▶ hasher pool ──▶ aggregator ──▶ result
//!                │              │             │              │               │
//!                └──────────────┴──── error channel ─────────┴───────────────┘
//!                                          │
//!                                      supervisor
//! ```
//!
//! Every queue is bounded, so a slow stage applies backpressure on its
//! upstream instead of letting the walker run arbitrarily far ahead.

pub mod messages;
pub mod workers;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, never, select, Receiver};
use tracing::debug;

use crate::config::FinderConfig;
use crate::error::{ErrorAction, FindError};
use crate::stats::{Statistics, StatisticsSnapshot};
use crate::walker::{WalkControl, Walker};

use messages::PathWithSize;

/// Duplicate groups keyed by 32-character lowercase hex fingerprint. The
/// paths of each group are sorted; the map itself has no iteration order.
pub type DuplicateGroups = HashMap<String, Vec<PathBuf>>;

/// Callback consulted by the supervisor for every error. Returning
/// [`ErrorAction::Stop`] aborts the run with that error.
pub type ErrorHandler = Box<dyn FnMut(&FindError) -> ErrorAction + Send>;

/// Finds groups of files with identical content under a set of roots.
pub struct DupFinder {
    config: FinderConfig,
    error_handler: ErrorHandler,
    stats: Arc<Statistics>,
}

impl DupFinder {
    /// Build a finder from `config`. With `keep_going` set, the default
    /// error handler writes each error to stderr and continues; otherwise
    /// the first error aborts the run.
    pub fn new(config: FinderConfig) -> Self {
        let error_handler: ErrorHandler = if config.keep_going {
            Box::new(|err: &FindError| {
                eprintln!("{err}");
                ErrorAction::Continue
            })
        } else {
            Box::new(|_: &FindError| ErrorAction::Stop)
        };
        Self {
            config,
            error_handler,
            stats: Arc::new(Statistics::new()),
        }
    }

    /// Replace the error handler, overriding what `keep_going` installed.
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&FindError) -> ErrorAction + Send + 'static,
    {
        self.error_handler = Box::new(handler);
        self
    }

    /// A point-in-time copy of the run statistics.
    pub fn statistics(&self) -> StatisticsSnapshot {
        self.stats.snapshot()
    }

    /// Run the pipeline to completion and return the duplicate groups.
    ///
    /// Under fail-fast the first error observed by the supervisor is
    /// returned; the stages notice their closed channels and wind down on
    /// their own. Under keep-going the result covers every file that was
    /// read successfully.
    pub fn run(&mut self) -> Result<DuplicateGroups, FindError> {
        let threshold = self.config.threshold.max(1);
        let capacity = self.config.channel_capacity.max(1);
        let roots = self.config.roots.clone();

        let (err_tx, err_rx) = bounded::<FindError>(capacity);
        let (files_tx, files_rx) = bounded::<PathWithSize>(capacity);
        let (unique_tx, unique_rx) = bounded::<PathWithSize>(capacity);
        let (sized_tx, sized_rx) = bounded::<PathWithSize>(capacity);
        let (hashed_tx, hashed_rx) = bounded(capacity);
        let (result_tx, result_rx) = bounded::<DuplicateGroups>(1);

        let cancel = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::new();

        // Stage 1: walker pool. The entry handler feeds regular files into
        // the first queue; a failed send means everything downstream is
        // gone, so the walk is cancelled rather than continued for nothing.
        {
            let stats = Arc::clone(&self.stats);
            let err_tx = err_tx.clone();
            let cancel = Arc::clone(&cancel);
            let walker_limit = self.config.walker_limit;
            handles.push(thread::spawn(move || {
                let walker = Walker::new(walker_limit, err_tx, stats)
                    .with_cancel_flag(Arc::clone(&cancel));
                walker.run(&roots, |entry| {
                    if let Some(size) = entry.size {
                        let message = PathWithSize {
                            path: entry.path.to_path_buf(),
                            size,
                        };
                        if files_tx.send(message).is_err() {
                            cancel.store(true, Ordering::Relaxed);
                            return WalkControl::SkipAll;
                        }
                    }
                    WalkControl::Continue
                });
            }));
        }

        // Stages 2 and 3: single-owner filters.
        handles.push(workers::spawn_dedup_thread(files_rx, unique_tx));
        handles.push(workers::spawn_size_filter_thread(
            unique_rx,
            sized_tx,
            threshold,
            Arc::clone(&self.stats),
        ));

        // Stage 4: hasher pool, optionally fed largest-first through a
        // rendezvous channel so the feeder buffers as much as possible.
        let hash_rx = if self.config.prioritize_by_size {
            let (priority_tx, priority_rx) = bounded::<PathWithSize>(0);
            handles.push(workers::spawn_priority_feeder(sized_rx, priority_tx));
            priority_rx
        } else {
            sized_rx
        };
        handles.extend(workers::spawn_hash_workers(
            self.config.hasher_limit,
            hash_rx,
            hashed_tx,
            err_tx.clone(),
            Arc::clone(&self.stats),
        ));

        // Stage 5: aggregator.
        handles.push(workers::spawn_aggregator_thread(
            hashed_rx,
            result_tx,
            threshold,
        ));

        drop(err_tx);

        match self.supervise(err_rx, result_rx) {
            Ok(result) => {
                // The aggregator only delivers after every upstream stage
                // has closed, so these joins do not block.
                for handle in handles {
                    let _ = handle.join();
                }
                Ok(result)
            }
            Err(err) => {
                // Fail-fast: stop the walkers and leave the stages to drain
                // against their closed channels.
                cancel.store(true, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    /// Consume the error channel until the result arrives. Every error is
    /// counted before the handler decides whether to stop or continue.
    fn supervise(
        &mut self,
        err_rx: Receiver<FindError>,
        result_rx: Receiver<DuplicateGroups>,
    ) -> Result<DuplicateGroups, FindError> {
        let mut live_err_rx = err_rx.clone();
        loop {
            let mut err_disconnected = false;
            select! {
                recv(live_err_rx) -> msg => match msg {
                    Ok(err) => {
                        if let Some(fatal) = self.handle_error(err) {
                            return Err(fatal);
                        }
                    }
                    // Every error sender is gone; only the result remains.
                    Err(_) => err_disconnected = true,
                },
                recv(result_rx) -> msg => {
                    let result = msg.map_err(|_| {
                        FindError::Internal("aggregator exited without delivering a result")
                    })?;
                    // Account for errors still buffered when the result won
                    // the race.
                    for err in err_rx.try_iter() {
                        if let Some(fatal) = self.handle_error(err) {
                            return Err(fatal);
                        }
                    }
                    debug!(groups = result.len(), "pipeline finished");
                    return Ok(result);
                }
            }
            if err_disconnected {
                live_err_rx = never();
            }
        }
    }

    fn handle_error(&mut self, err: FindError) -> Option<FindError> {
        self.stats.errors.fetch_add(1, Ordering::Relaxed);
        match (self.error_handler)(&err) {
            ErrorAction::Stop => Some(err),
            ErrorAction::Continue => None,
        }
    }
}
