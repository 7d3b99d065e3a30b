//! The per-version pipeline and the coordinator that drives it.
//!
//! Every published version is one independent unit of work: fetch the
//! artifact, decode the mapping payload, emit the JSON document. A small
//! fixed pool of workers drains the version queue; one version failing is
//! logged and skipped without disturbing the rest of the batch.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::str;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver};
use failure::Error;
use failure_derive::Fail;
use log::{error, info, warn};
use parking_lot::{Condvar, Mutex};

use crate::archive::{ArchiveReader, ZipArchiveReader};
use crate::catalog::resolve_versions;
use crate::emit::write_json;
use crate::fetch::{CurlFetcher, Fetcher};
use crate::tiny::extract_mappings;

pub const DEFAULT_METADATA_URL: &str =
    "https://maven.fabricmc.net/net/fabricmc/intermediary/maven-metadata.xml";
pub const DEFAULT_MAVEN_BASE_URL: &str = "https://maven.fabricmc.net/net/fabricmc/intermediary/";
const DEFAULT_WORKER_COUNT: usize = 5;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60 * 60);

// Keeps concurrent workers from ever sharing a temp artifact path
static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Fail)]
#[fail(display = "Unable to fetch version catalog: {}", cause)]
pub struct CatalogFetchError {
    cause: Error,
}

/// Everything configurable about a batch run.
///
/// The defaults match the Fabric Maven repository and the historical
/// pool size and timeout; tests shrink all three.
#[derive(Clone, Debug)]
pub struct FetcherConfig {
    pub metadata_url: String,
    pub base_url: String,
    pub output_dir: PathBuf,
    /// Where workers spill downloaded artifacts for the duration of a decode.
    pub temp_dir: PathBuf,
    pub worker_count: usize,
    pub timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> FetcherConfig {
        FetcherConfig {
            metadata_url: DEFAULT_METADATA_URL.into(),
            base_url: DEFAULT_MAVEN_BASE_URL.into(),
            output_dir: PathBuf::from("intermediary_mappings"),
            temp_dir: env::temp_dir(),
            worker_count: DEFAULT_WORKER_COUNT,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Final accounting for one batch run.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Copy, Clone, Debug, Default)]
struct Progress {
    completed: usize,
    succeeded: usize,
    failed: usize,
}

/// Shared completion counter, incremented under a lock by every worker.
struct ProgressTracker {
    state: Mutex<Progress>,
    finished: Condvar,
}

impl ProgressTracker {
    fn new() -> ProgressTracker {
        ProgressTracker {
            state: Mutex::new(Progress::default()),
            finished: Condvar::new(),
        }
    }
    /// Record one completed version and return the running completion count.
    fn record(&self, success: bool) -> usize {
        let mut progress = self.state.lock();
        progress.completed += 1;
        if success {
            progress.succeeded += 1;
        } else {
            progress.failed += 1;
        }
        self.finished.notify_all();
        progress.completed
    }
    /// Block until `total` versions completed or the timeout elapsed,
    /// returning whatever progress was reached.
    fn wait(&self, total: usize, timeout: Duration) -> Progress {
        let deadline = Instant::now() + timeout;
        let mut progress = self.state.lock();
        while progress.completed < total {
            if self
                .finished
                .wait_until(&mut progress, deadline)
                .timed_out()
            {
                break;
            }
        }
        *progress
    }
}

pub struct IntermediaryFetcher {
    config: Arc<FetcherConfig>,
    fetcher: Arc<dyn Fetcher>,
    archives: Arc<dyn ArchiveReader>,
}

impl IntermediaryFetcher {
    /// A fetcher wired up with the production curl and zip backends.
    pub fn new(config: FetcherConfig) -> IntermediaryFetcher {
        IntermediaryFetcher::with_capabilities(
            config,
            Arc::new(CurlFetcher),
            Arc::new(ZipArchiveReader),
        )
    }
    pub fn with_capabilities(
        config: FetcherConfig,
        fetcher: Arc<dyn Fetcher>,
        archives: Arc<dyn ArchiveReader>,
    ) -> IntermediaryFetcher {
        IntermediaryFetcher {
            config: Arc::new(config),
            fetcher,
            archives,
        }
    }

    /// Run the whole batch: enumerate versions, fan them out across the
    /// worker pool, and wait for completion or the timeout.
    ///
    /// Catalog-level failures are fatal and returned before any worker is
    /// dispatched; per-version failures are logged and skipped. Workers
    /// still in flight when the timeout fires are abandoned in place, not
    /// cancelled.
    pub fn run(&self) -> Result<BatchSummary, Error> {
        fs::create_dir_all(&self.config.output_dir)?;
        let metadata = self
            .fetcher
            .fetch(&self.config.metadata_url)
            .map_err(|cause| CatalogFetchError { cause })?;
        let versions = resolve_versions(str::from_utf8(&metadata)?)?;
        let total = versions.len();
        info!("Found {} intermediary versions", total);
        if total == 0 {
            return Ok(BatchSummary {
                total: 0,
                completed: 0,
                succeeded: 0,
                failed: 0,
            });
        }
        let progress = Arc::new(ProgressTracker::new());
        let (sender, receiver) = channel::unbounded();
        for version in versions {
            // Unbounded queue; the pool size is the only backpressure
            sender.send(version).expect("receiver alive");
        }
        drop(sender);
        for _ in 0..self.config.worker_count.max(1) {
            let worker = VersionWorker {
                config: self.config.clone(),
                fetcher: self.fetcher.clone(),
                archives: self.archives.clone(),
                progress: progress.clone(),
                total,
            };
            let queue = receiver.clone();
            // Deliberately detached: at timeout the stragglers are abandoned
            thread::spawn(move || worker.run(queue));
        }
        let progress = progress.wait(total, self.config.timeout);
        if progress.completed < total {
            warn!(
                "Abandoned {} in-flight versions after {:?}",
                total - progress.completed,
                self.config.timeout
            );
        }
        Ok(BatchSummary {
            total,
            completed: progress.completed,
            succeeded: progress.succeeded,
            failed: progress.failed,
        })
    }
}

struct VersionWorker {
    config: Arc<FetcherConfig>,
    fetcher: Arc<dyn Fetcher>,
    archives: Arc<dyn ArchiveReader>,
    progress: Arc<ProgressTracker>,
    total: usize,
}

impl VersionWorker {
    fn run(self, queue: Receiver<String>) {
        for version in queue.iter() {
            match self.process_version(&version) {
                Ok(()) => {
                    let count = self.progress.record(true);
                    info!("Process: {}/{} - Version {}", count, self.total, version);
                }
                Err(e) => {
                    self.progress.record(false);
                    error!("Process Version {} Error!!: {}", version, e);
                }
            }
        }
    }

    /// Fetch, decode and emit a single version.
    fn process_version(&self, version: &str) -> Result<(), Error> {
        let base_version = match version.find('+') {
            Some(index) => &version[..index],
            None => version,
        };
        let url = format!(
            "{0}{1}/intermediary-{1}.jar",
            self.config.base_url, version
        );
        let buffer = self.fetcher.fetch(&url)?;
        /*
         * Spill the artifact to a private temp file for the duration of the
         * decode. The guard removes it on success and failure alike, so a
         * failed version never leaves a stray download behind.
         */
        let temp_jar = self.config.temp_dir.join(format!(
            "intermediary-{}-{}-{}.jar",
            process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed),
            sanitize_file_name(version)
        ));
        // Armed before the spill so a partially written file never leaks
        defer! {
            let _ = fs::remove_file(&temp_jar);
        }
        fs::write(&temp_jar, &buffer)?;
        let archive = fs::read(&temp_jar)?;
        let data = extract_mappings(&archive, &*self.archives)?;
        let mut document = Vec::with_capacity(64 * 1024);
        write_json(&data, &mut document)?;
        // Single write call, so a failure can't leave a partial document
        let file_name = format!("{}.json", sanitize_file_name(base_version));
        fs::write(self.config.output_dir.join(file_name), &document)?;
        Ok(())
    }
}

/// Replace every character outside `[A-Za-z0-9.-]` with `_`.
///
/// Two versions may sanitize to the same name; the last writer wins,
/// matching the historical output layout.
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
