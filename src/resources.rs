//! Resource discovery for engine process allocation.
//!
//! The number of worker processes handed to the engine comes from the batch
//! scheduler environment, and the scratch directory from the compute node's
//! `TMPDIR`. Both are read through the [`ResourceProvider`] trait so the
//! orchestrator can be tested with fixed values instead of mutating the
//! process environment.
//!
//! The process count controls intra-engine parallelism only; the
//! orchestrator itself is strictly single-threaded and blocking.

use std::env;
use std::path::PathBuf;

/// Scheduler variable holding the maximum process count (LSF).
pub const MAX_PROCESSORS_VAR: &str = "LSB_MAX_NUM_PROCESSORS";

/// Compute-node scratch directory variable.
pub const SCRATCH_VAR: &str = "TMPDIR";

/// Capability for discovering execution resources.
pub trait ResourceProvider {
    /// Maximum engine process count, or `None` outside batch mode.
    fn max_processes(&self) -> Option<usize>;

    /// Scratch directory for the engine, or `None` on a login node.
    fn scratch_dir(&self) -> Option<PathBuf>;
}

/// Resource provider backed by the process environment.
///
/// Reads `LSB_MAX_NUM_PROCESSORS` for the process count and `TMPDIR` for
/// the scratch directory. An unset or non-numeric process variable means
/// interactive mode and yields `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvResources;

impl ResourceProvider for EnvResources {
    fn max_processes(&self) -> Option<usize> {
        env::var(MAX_PROCESSORS_VAR).ok()?.trim().parse().ok()
    }

    fn scratch_dir(&self) -> Option<PathBuf> {
        env::var_os(SCRATCH_VAR).map(PathBuf::from)
    }
}

/// Memory allocation in megabytes for a given process count.
///
/// The engine gets 1024 MB per process with an 8192 MB floor.
///
/// # Examples
///
/// ```
/// use g09run::resources::memory_mb;
///
/// assert_eq!(memory_mb(1), 8192);
/// assert_eq!(memory_mb(4), 8192);
/// assert_eq!(memory_mb(16), 16384);
/// ```
pub fn memory_mb(nproc: usize) -> u64 {
    (1024 * nproc as u64).max(8192)
}
