//! Crate-local Rayon pool used for partitioned row evaluation.

use rayon::ThreadPool;
use std::sync::OnceLock;

/// Rows per partition when evaluating in parallel. Partitions are merged in index order.
pub const PARTITION_ROWS: usize = 4_096;

/// Rayon normally uses a global pool, whose initialization can panic when the host refuses to
/// spawn threads. A crate-local pool lets callers fall back to sequential evaluation instead.
static RAYON_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

fn desired_threads() -> usize {
    std::env::var("SKIMFLOW_THREADS")
        .ok()
        .or_else(|| std::env::var("RAYON_NUM_THREADS").ok())
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
}

fn build_pool() -> Option<ThreadPool> {
    let requested = desired_threads();
    let try_build = |n| rayon::ThreadPoolBuilder::new().num_threads(n).build();

    match try_build(requested) {
        Ok(pool) => Some(pool),
        Err(err) if requested > 1 => {
            log::warn!("failed to build {requested}-thread pool ({err}); retrying with 1 thread");
            try_build(1).ok()
        }
        Err(err) => {
            log::warn!("failed to build thread pool ({err}); evaluating sequentially");
            None
        }
    }
}

/// Returns the crate-local pool, if one could be created.
pub fn rayon_pool() -> Option<&'static ThreadPool> {
    RAYON_POOL.get_or_init(build_pool).as_ref()
}
