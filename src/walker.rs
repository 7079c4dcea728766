//! Concurrent directory walker.
//!
//! A fixed pool of worker threads shares one queue of directories to list.
//! Each worker pops a directory, lists it, hands every entry to the entry
//! handler, and pushes subdirectories back onto the queue. A pending-directory
//! counter closes the queue once the last directory has been processed.
//!
//! The pool is bounded on purpose: recursive fan-out with one thread per
//! directory can exceed process thread limits on filesystems with huge
//! directory fanout.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::trace;

use crate::error::FindError;
use crate::stats::Statistics;

/// Outcome of the entry handler for a single directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    /// Proceed normally; directories are descended into.
    Continue,
    /// Abandon the subtree rooted at this entry.
    SkipDir,
    /// End the current directory's iteration immediately.
    SkipAll,
}

/// A single directory entry as seen by the entry handler.
#[derive(Debug)]
pub struct WalkEntry<'a> {
    pub path: &'a Path,
    pub file_type: fs::FileType,
    /// Size reported at discovery. Present for regular files only.
    pub size: Option<u64>,
}

/// Work queue shared by the walker pool.
///
/// `pending` counts directories that are queued or being processed. The
/// worker that drops it to zero closes the queue, which releases every
/// worker blocked on `recv`.
struct DirQueue {
    tx: Mutex<Option<Sender<PathBuf>>>,
    rx: Receiver<PathBuf>,
    pending: AtomicUsize,
}

impl DirQueue {
    fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx: Mutex::new(Some(tx)),
            rx,
            pending: AtomicUsize::new(0),
        }
    }

    /// Enqueue a directory. The pending count is raised before the send so
    /// the queue cannot close while the directory is in flight.
    fn add(&self, dir: PathBuf) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if let Some(tx) = self.tx.lock().expect("dir queue lock poisoned").as_ref() {
            let _ = tx.send(dir);
        }
    }

    /// Mark one directory as fully processed.
    fn finish_one(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.tx.lock().expect("dir queue lock poisoned").take();
        }
    }
}

/// Walks directory trees with a bounded pool of worker threads.
pub struct Walker {
    limit: usize,
    stats: Arc<Statistics>,
    errors: Sender<FindError>,
    cancel: Arc<AtomicBool>,
}

impl Walker {
    pub fn new(limit: usize, errors: Sender<FindError>, stats: Arc<Statistics>) -> Self {
        Self {
            limit: limit.max(1),
            stats,
            errors,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a cancellation flag with the walker. When the flag is set the
    /// pool drains its queue without listing further directories.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Walk every root, calling `handler` for each directory entry found.
    ///
    /// Entries of one directory are visited in listing order; across
    /// directories the interleaving is arbitrary. Regular-file entries carry
    /// their discovery-time size. Returns once every reachable directory has
    /// been processed or the cancel flag has drained the queue.
    pub fn run<F>(&self, roots: &[PathBuf], handler: F)
    where
        F: Fn(WalkEntry<'_>) -> WalkControl + Send + Sync,
    {
        if roots.is_empty() {
            return;
        }

        let queue = DirQueue::new();
        for root in roots {
            queue.add(root.clone());
        }

        thread::scope(|scope| {
            for _ in 0..self.limit {
                let queue = &queue;
                let handler = &handler;
                scope.spawn(move || {
                    while let Ok(dir) = queue.rx.recv() {
                        if !self.cancel.load(Ordering::Relaxed) {
                            self.process_directory(&dir, queue, handler);
                        }
                        queue.finish_one();
                    }
                });
            }
        });
    }

    fn process_directory<F>(&self, dir: &Path, queue: &DirQueue, handler: &F)
    where
        F: Fn(WalkEntry<'_>) -> WalkControl + Send + Sync,
    {
        trace!(path = %dir.display(), "walking directory");

        let read_dir = match fs::read_dir(dir) {
            Ok(read_dir) => read_dir,
            Err(err) => {
                self.report(FindError::io(dir, err));
                return;
            }
        };

        let mut entries = Vec::new();
        for entry in read_dir {
            match entry {
                Ok(entry) => entries.push(entry),
                Err(err) => self.report(FindError::io(dir, err)),
            }
        }
        self.stats
            .dir_entries
            .fetch_add(entries.len() as u64, Ordering::Relaxed);

        for entry in entries {
            if self.cancel.load(Ordering::Relaxed) {
                return;
            }

            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    self.report(FindError::io(path, err));
                    continue;
                }
            };

            let mut size = None;
            if file_type.is_file() {
                match entry.metadata() {
                    Ok(metadata) => {
                        self.stats.files.fetch_add(1, Ordering::Relaxed);
                        self.stats
                            .total_bytes
                            .fetch_add(metadata.len(), Ordering::Relaxed);
                        size = Some(metadata.len());
                    }
                    Err(err) => {
                        self.report(FindError::io(path, err));
                        continue;
                    }
                }
            }

            let control = handler(WalkEntry {
                path: &path,
                file_type,
                size,
            });
            match control {
                WalkControl::Continue => {
                    if file_type.is_dir() {
                        queue.add(path);
                    }
                }
                WalkControl::SkipDir => {}
                WalkControl::SkipAll => return,
            }
        }
    }

    fn report(&self, err: FindError) {
        if self.errors.send(err).is_err() {
            // The supervisor is gone; there is no point walking further.
            self.cancel.store(true, Ordering::Relaxed);
        }
    }
}
