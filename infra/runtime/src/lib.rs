//! # Runtime
//!
//! Tokio runtime profiles for hooklift processes.
//!
//! The bootstrap sequence is written for a single logical thread of control:
//! hooks interleave on a cooperative scheduler and never need locks around
//! their own records. [`RuntimeConfig::cooperative`] is therefore the default
//! profile. [`RuntimeConfig::multi_thread`] exists for embedders that run
//! CPU-heavy hooks and accept the looser interleaving.
//!
//! ## Example
//!
//! ```rust,ignore
//! #[hooklift_runtime::main(cooperative)]
//! async fn main() -> anyhow::Result<()> {
//!     let instance = hooklift::load(None).await?;
//!     Ok(())
//! }
//! ```

pub use anyhow::Result;
pub use hooklift_derive::main;

use anyhow::anyhow;
use std::{thread::available_parallelism, time::Duration};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

const DEFAULT_WORKER_THREADS: usize = 4;
const MAX_WORKER_THREADS: usize = 1024;
const DEFAULT_THREAD_NAME: &str = "hooklift-worker";
const THREAD_KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Scheduler flavor of a runtime profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// One thread drives every task.
    Cooperative,
    /// Work-stealing pool with the given number of workers.
    MultiThread { workers: usize },
}

/// Configuration for the Tokio runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub flavor: Flavor,
    pub thread_name: String,
    pub thread_keep_alive: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::cooperative()
    }
}

impl RuntimeConfig {
    /// Single-threaded profile used by the bootstrap sequence.
    #[must_use]
    pub fn cooperative() -> Self {
        Self {
            flavor: Flavor::Cooperative,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            thread_keep_alive: THREAD_KEEP_ALIVE,
        }
    }

    /// Work-stealing profile sized from `TOKIO_WORKER_THREADS` or the host parallelism.
    #[must_use]
    pub fn multi_thread() -> Self {
        Self { flavor: Flavor::MultiThread { workers: detect_workers() }, ..Self::cooperative() }
    }

    #[must_use = "Customize the number of worker threads for the runtime"]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        let workers = if workers == 0 {
            1
        } else if workers > MAX_WORKER_THREADS {
            MAX_WORKER_THREADS
        } else {
            workers
        };
        self.flavor = Flavor::MultiThread { workers };
        self
    }

    #[must_use = "Customize the thread name"]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.thread_name = if name.trim().is_empty() { DEFAULT_THREAD_NAME.to_owned() } else { name };
        self
    }
}

fn detect_workers() -> usize {
    std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|raw| raw.parse::<usize>().ok())
        .filter(|&n| (1..=MAX_WORKER_THREADS).contains(&n))
        .unwrap_or_else(|| {
            available_parallelism().map(std::num::NonZero::get).unwrap_or(DEFAULT_WORKER_THREADS)
        })
}

/// Builds a Tokio runtime from a [`RuntimeConfig`] with timers and I/O enabled.
///
/// # Errors
///
/// Returns an [`anyhow::Error`] when the OS refuses to create the runtime threads.
///
/// # Examples
///
/// ```rust
/// use hooklift_runtime::{RuntimeConfig, build_runtime};
///
/// let runtime = build_runtime(&RuntimeConfig::cooperative())?;
/// let answer = runtime.block_on(async { 42 });
/// assert_eq!(answer, 42);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn build_runtime(config: &RuntimeConfig) -> Result<Runtime> {
    debug!(config = ?config, "Building tokio runtime");

    let mut builder = match config.flavor {
        Flavor::Cooperative => Builder::new_current_thread(),
        Flavor::MultiThread { workers } => {
            let mut builder = Builder::new_multi_thread();
            builder.worker_threads(workers).thread_keep_alive(config.thread_keep_alive);
            builder
        },
    };

    builder.thread_name(&config.thread_name).enable_all();
    builder.build().map_err(|e| anyhow!("Failed to initialize runtime: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_cooperative() {
        assert_eq!(RuntimeConfig::default().flavor, Flavor::Cooperative);
    }

    #[test]
    fn worker_count_is_clamped() {
        let config = RuntimeConfig::cooperative().with_workers(0);
        assert_eq!(config.flavor, Flavor::MultiThread { workers: 1 });

        let config = RuntimeConfig::cooperative().with_workers(5000);
        assert_eq!(config.flavor, Flavor::MultiThread { workers: MAX_WORKER_THREADS });
    }

    #[test]
    fn blank_thread_name_falls_back() {
        let config = RuntimeConfig::multi_thread().with_thread_name("   ");
        assert_eq!(config.thread_name, DEFAULT_THREAD_NAME);
    }

    #[test]
    fn cooperative_runtime_runs_timers() {
        let runtime = build_runtime(&RuntimeConfig::cooperative()).unwrap();
        runtime.block_on(async {
            tokio::time::sleep(Duration::from_millis(1)).await;
        });
    }
}
