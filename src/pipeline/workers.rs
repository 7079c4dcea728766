//! # Pipeline Workers
//!
//! Worker thread spawning for the deduplication, size-filter, priority,
//! hashing, and aggregation stages. Every worker stops sending when its
//! downstream has disconnected instead of panicking on a closed channel.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{select, Receiver, Sender};
use tracing::{debug, warn};

use crate::error::FindError;
use crate::fingerprint::{self, Fingerprint};
use crate::stats::Statistics;

use super::messages::{PathWithHash, PathWithSize};
use super::DuplicateGroups;

/// Spawn the deduplication thread.
///
/// The same file reported twice via overlapping roots is forwarded once;
/// repeats of an exact (path, size) pair are dropped silently. Forwarded
/// entries keep their arrival order.
pub fn spawn_dedup_thread(
    rx: Receiver<PathWithSize>,
    tx: Sender<PathWithSize>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut seen: HashSet<PathWithSize> = HashSet::new();
        for entry in rx {
            if seen.insert(entry.clone()) {
                if tx.send(entry).is_err() {
                    warn!("size filter disconnected; stopping deduplication");
                    return;
                }
            }
        }
    })
}

/// Spawn the size-filter thread.
///
/// Entries are buffered per size class. The bucket reaching `threshold`
/// entries is released downstream in arrival order; every later entry of
/// that size is released immediately. Buckets never shrink. When the
/// upstream closes, the number of distinct sizes is recorded.
pub fn spawn_size_filter_thread(
    rx: Receiver<PathWithSize>,
    tx: Sender<PathWithSize>,
    threshold: usize,
    stats: Arc<Statistics>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut paths_by_size: HashMap<u64, Vec<PathWithSize>> = HashMap::new();
        for entry in rx {
            let bucket = paths_by_size.entry(entry.size).or_default();
            bucket.push(entry.clone());
            if bucket.len() == threshold {
                for buffered in bucket.iter().cloned() {
                    if tx.send(buffered).is_err() {
                        warn!("hasher input disconnected; stopping size filter");
                        return;
                    }
                }
            } else if bucket.len() > threshold {
                if tx.send(entry).is_err() {
                    warn!("hasher input disconnected; stopping size filter");
                    return;
                }
            }
        }
        stats
            .unique_sizes
            .fetch_add(paths_by_size.len() as u64, Ordering::Relaxed);
    })
}

/// Heap ordering for the priority feeder: larger files first, ties broken
/// by path so the order is stable.
struct BySize(PathWithSize);

impl PartialEq for BySize {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for BySize {}

impl PartialOrd for BySize {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for BySize {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.0
            .size
            .cmp(&other.0.size)
            .then_with(|| other.0.path.cmp(&self.0.path))
    }
}

/// Spawn the priority feeder between the size filter and the hasher pool.
///
/// Buffered entries are re-emitted largest-first so huge files start hashing
/// as early as possible. The output side is expected to be a rendezvous
/// channel, which lets the heap accumulate whenever the hashers are busy;
/// under saturation the order is approximate, not strict.
pub fn spawn_priority_feeder(
    rx: Receiver<PathWithSize>,
    tx: Sender<PathWithSize>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut heap: BinaryHeap<BySize> = BinaryHeap::new();
        loop {
            if heap.is_empty() {
                match rx.recv() {
                    Ok(entry) => heap.push(BySize(entry)),
                    Err(_) => break,
                }
            } else {
                let next = heap.peek().expect("heap checked non-empty").0.clone();
                select! {
                    recv(rx) -> msg => match msg {
                        Ok(entry) => heap.push(BySize(entry)),
                        Err(_) => break,
                    },
                    send(tx, next) -> sent => {
                        heap.pop();
                        if sent.is_err() {
                            warn!("hasher pool disconnected; stopping priority feeder");
                            return;
                        }
                    }
                }
            }
        }
        // Upstream closed; drain what is buffered, still largest-first.
        while let Some(BySize(entry)) = heap.pop() {
            if tx.send(entry).is_err() {
                warn!("hasher pool disconnected; stopping priority feeder");
                return;
            }
        }
    })
}

/// Spawn the hashing worker pool.
///
/// Each worker consumes entries, fingerprints file contents, and emits
/// path-with-hash messages. Open and read failures go to the error channel
/// and the entry is dropped; no placeholder fingerprint is emitted.
pub fn spawn_hash_workers(
    workers: usize,
    rx: Receiver<PathWithSize>,
    tx: Sender<PathWithHash>,
    err_tx: Sender<FindError>,
    stats: Arc<Statistics>,
) -> Vec<thread::JoinHandle<()>> {
    let mut handles = Vec::new();
    let worker_count = workers.max(1);

    for _ in 0..worker_count {
        let rx = rx.clone();
        let tx = tx.clone();
        let err_tx = err_tx.clone();
        let stats = Arc::clone(&stats);

        handles.push(thread::spawn(move || {
            for entry in rx {
                match hash_entry(entry, &stats) {
                    Ok(hashed) => {
                        if tx.send(hashed).is_err() {
                            warn!("aggregator disconnected; stopping hash worker");
                            return;
                        }
                    }
                    Err(err) => {
                        if err_tx.send(err).is_err() {
                            // Supervisor already returned; nothing left to do.
                            return;
                        }
                    }
                }
            }
        }));
    }

    handles
}

fn hash_entry(entry: PathWithSize, stats: &Statistics) -> Result<PathWithHash, FindError> {
    let PathWithSize { path, size } = entry;

    // Empty files all share one fingerprint; no need to open them.
    if size == 0 {
        return Ok(PathWithHash {
            path,
            fingerprint: Fingerprint::EMPTY,
        });
    }

    let file = match File::open(&path) {
        Ok(file) => file,
        Err(err) => return Err(FindError::io(path, err)),
    };
    stats.files_opened.fetch_add(1, Ordering::Relaxed);

    match fingerprint::fingerprint_reader(file) {
        Ok((fingerprint, bytes_read)) => {
            // The file may have grown or shrunk since discovery; count what
            // was actually read.
            stats.bytes_hashed.fetch_add(bytes_read, Ordering::Relaxed);
            Ok(PathWithHash { path, fingerprint })
        }
        Err(err) => Err(FindError::io(path, err)),
    }
}

/// Spawn the aggregation thread.
///
/// Paths are grouped by fingerprint until the upstream closes, then groups
/// below `threshold` are discarded, surviving groups are sorted by the byte
/// order of their paths, and the result map is delivered to the supervisor.
pub fn spawn_aggregator_thread(
    rx: Receiver<PathWithHash>,
    result_tx: Sender<DuplicateGroups>,
    threshold: usize,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut paths_by_hash: HashMap<Fingerprint, Vec<PathBuf>> = HashMap::new();
        for hashed in rx {
            paths_by_hash
                .entry(hashed.fingerprint)
                .or_default()
                .push(hashed.path);
        }

        let mut result = DuplicateGroups::with_capacity(paths_by_hash.len());
        for (fingerprint, mut paths) in paths_by_hash {
            if paths.len() < threshold {
                continue;
            }
            paths.sort_by(|a, b| {
                a.as_os_str()
                    .as_encoded_bytes()
                    .cmp(b.as_os_str().as_encoded_bytes())
            });
            result.insert(fingerprint.to_hex(), paths);
        }

        if result_tx.send(result).is_err() {
            debug!("supervisor returned before the aggregate was delivered");
        }
    })
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::{bounded, unbounded};

    use super::*;

    fn entry(path: &str, size: u64) -> PathWithSize {
        PathWithSize {
            path: PathBuf::from(path),
            size,
        }
    }

    #[test]
    fn dedup_forwards_first_observation_only() {
        let (in_tx, in_rx) = unbounded();
        let (out_tx, out_rx) = unbounded();
        let handle = spawn_dedup_thread(in_rx, out_tx);

        in_tx.send(entry("alpha", 1)).unwrap();
        in_tx.send(entry("alpha", 1)).unwrap();
        in_tx.send(entry("beta", 1)).unwrap();
        // Same path with a different size is a different observation.
        in_tx.send(entry("alpha", 2)).unwrap();
        drop(in_tx);
        handle.join().unwrap();

        let forwarded: Vec<_> = out_rx.iter().collect();
        assert_eq!(
            forwarded,
            vec![entry("alpha", 1), entry("beta", 1), entry("alpha", 2)]
        );
    }

    #[test]
    fn size_filter_releases_bucket_at_threshold() {
        let (in_tx, in_rx) = unbounded();
        let (out_tx, out_rx) = unbounded();
        let stats = Arc::new(Statistics::new());
        let handle = spawn_size_filter_thread(in_rx, out_tx, 2, Arc::clone(&stats));

        in_tx.send(entry("alpha", 1)).unwrap();
        in_tx.send(entry("gamma", 2)).unwrap();
        in_tx.send(entry("beta", 1)).unwrap();
        in_tx.send(entry("delta", 1)).unwrap();
        drop(in_tx);
        handle.join().unwrap();

        // Size 2 never reaches the threshold; size 1 is released in arrival
        // order once "beta" completes the pair, then "delta" immediately.
        let forwarded: Vec<_> = out_rx.iter().collect();
        assert_eq!(
            forwarded,
            vec![entry("alpha", 1), entry("beta", 1), entry("delta", 1)]
        );
        assert_eq!(stats.snapshot().unique_sizes, 2);
    }

    #[test]
    fn size_filter_threshold_one_releases_everything() {
        let (in_tx, in_rx) = unbounded();
        let (out_tx, out_rx) = unbounded();
        let stats = Arc::new(Statistics::new());
        let handle = spawn_size_filter_thread(in_rx, out_tx, 1, stats);

        in_tx.send(entry("alpha", 7)).unwrap();
        in_tx.send(entry("beta", 9)).unwrap();
        drop(in_tx);
        handle.join().unwrap();

        let forwarded: Vec<_> = out_rx.iter().collect();
        assert_eq!(forwarded, vec![entry("alpha", 7), entry("beta", 9)]);
    }

    #[test]
    fn priority_feeder_drains_largest_first() {
        let (in_tx, in_rx) = unbounded();
        let (out_tx, out_rx) = bounded(0);

        // The whole input is buffered and closed before the feeder starts,
        // and nothing receives on the rendezvous output until the feeder
        // has had time to pull everything into its heap.
        in_tx.send(entry("small", 1)).unwrap();
        in_tx.send(entry("large", 500)).unwrap();
        in_tx.send(entry("medium", 30)).unwrap();
        drop(in_tx);

        let handle = spawn_priority_feeder(in_rx, out_tx);
        std::thread::sleep(std::time::Duration::from_millis(200));

        let drained: Vec<_> = out_rx.iter().collect();
        assert_eq!(
            drained,
            vec![entry("large", 500), entry("medium", 30), entry("small", 1)]
        );
        handle.join().unwrap();
    }

    #[test]
    fn hash_workers_fingerprint_files_and_report_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alpha");
        std::fs::write(&path, b"a").unwrap();
        let missing = dir.path().join("missing");

        let (in_tx, in_rx) = unbounded();
        let (out_tx, out_rx) = unbounded();
        let (err_tx, err_rx) = unbounded();
        let stats = Arc::new(Statistics::new());
        let handles = spawn_hash_workers(2, in_rx, out_tx, err_tx, Arc::clone(&stats));

        in_tx
            .send(PathWithSize {
                path: path.clone(),
                size: 1,
            })
            .unwrap();
        in_tx
            .send(PathWithSize {
                path: missing.clone(),
                size: 10,
            })
            .unwrap();
        in_tx
            .send(PathWithSize {
                path: dir.path().join("empty-never-opened"),
                size: 0,
            })
            .unwrap();
        drop(in_tx);
        for handle in handles {
            handle.join().unwrap();
        }

        let hashed: Vec<_> = out_rx.iter().collect();
        assert_eq!(hashed.len(), 2);
        let by_path: HashMap<_, _> = hashed
            .into_iter()
            .map(|h| (h.path.clone(), h.fingerprint))
            .collect();
        assert_eq!(by_path[&path], fingerprint::fingerprint_bytes(b"a"));
        assert_eq!(
            by_path[&dir.path().join("empty-never-opened")],
            Fingerprint::EMPTY
        );

        let errors: Vec<_> = err_rx.iter().collect();
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            FindError::Io { path, .. } => assert_eq!(path, &missing),
            other => panic!("unexpected error: {other:?}"),
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.files_opened, 1);
        assert_eq!(snapshot.bytes_hashed, 1);
    }

    #[test]
    fn aggregator_filters_sorts_and_hex_encodes() {
        let (in_tx, in_rx) = unbounded();
        let (result_tx, result_rx) = bounded(1);
        let handle = spawn_aggregator_thread(in_rx, result_tx, 2);

        let fp_a = fingerprint::fingerprint_bytes(b"a");
        let fp_b = fingerprint::fingerprint_bytes(b"b");
        for (path, fingerprint) in [("beta", fp_a), ("alpha", fp_a), ("gamma", fp_b)] {
            in_tx
                .send(PathWithHash {
                    path: PathBuf::from(path),
                    fingerprint,
                })
                .unwrap();
        }
        drop(in_tx);
        handle.join().unwrap();

        let result = result_rx.recv().unwrap();
        assert_eq!(result.len(), 1);
        let group = &result[&fp_a.to_hex()];
        assert_eq!(group, &[PathBuf::from("alpha"), PathBuf::from("beta")]);
    }
}
