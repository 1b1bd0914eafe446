//! Time-based status cache.
//!
//! `StatusCache` holds the last collected `StatusSnapshot` and recollects it
//! at most once per staleness window. The lock is held across the whole
//! collection, so concurrent callers hitting a stale cache wait for a single
//! refresh instead of each spawning the listing command. A caller that is
//! dropped mid-refresh leaves the collection running to completion.

use async_trait::async_trait;
use chrono::{Local, SecondsFormat};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::listing::{ListingCommand, ListingFailure};
use crate::memory::{self, MemoryStats};

/// Source of the data a refresh collects.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Version string of the running build, read once on the first refresh.
    fn runtime_version(&self) -> String;

    fn memory_stats(&self) -> MemoryStats;

    /// Runs the external listing. On failure the returned text replaces the listing.
    async fn process_listing(&self) -> Result<String, ListingFailure>;
}

/// Production source: /proc/self/status plus the configured listing command.
pub struct SystemSource {
    command: ListingCommand,
}

impl SystemSource {
    pub fn new(command: ListingCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl StatusSource for SystemSource {
    fn runtime_version(&self) -> String {
        runtime_version()
    }

    fn memory_stats(&self) -> MemoryStats {
        memory::read_memory_stats().unwrap_or_else(|e| {
            warn!("Failed to read memory statistics: {}", e);
            MemoryStats::default()
        })
    }

    async fn process_listing(&self) -> Result<String, ListingFailure> {
        self.command.run().await
    }
}

/// Crate version and the compiler it was built with.
pub fn runtime_version() -> String {
    format!(
        "{} (rustc {})",
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_RUSTC_SEMVER")
    )
}

/// One complete collection. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub memory: MemoryStats,
    pub runtime_version: String,
    /// Listing text ready for embedding in `<pre>`.
    pub listing: String,
    /// Whether the listing command succeeded.
    pub listing_ok: bool,
    pub refreshed_at: Instant,
    /// RFC 3339 wall-clock time of the collection.
    pub collected_at: String,
}

/// Shared cache of the most recent `StatusSnapshot`.
pub struct StatusCache {
    source: Arc<dyn StatusSource>,
    stale_after: Duration,
    current: Arc<Mutex<Option<Arc<StatusSnapshot>>>>,
}

impl StatusCache {
    pub fn new(source: Arc<dyn StatusSource>, stale_after: Duration) -> Self {
        Self {
            source,
            stale_after,
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the current snapshot, collecting a new one first if this is
    /// the first call or the last collection is older than the staleness window.
    ///
    /// The collection runs in its own task that owns the lock until the new
    /// snapshot is stored, so dropping the caller does not abort it.
    /// Collection failures are logged and reflected in the snapshot's listing;
    /// this never fails.
    #[instrument(skip(self))]
    pub async fn refresh_if_stale(&self) -> Arc<StatusSnapshot> {
        let mut current = Arc::clone(&self.current).lock_owned().await;
        let now = Instant::now();

        let runtime_version = match current.as_ref() {
            None => {
                info!("Collecting initial status snapshot");
                self.source.runtime_version()
            }
            Some(snapshot) if now.duration_since(snapshot.refreshed_at) <= self.stale_after => {
                debug!("Status cache hit");
                return Arc::clone(snapshot);
            }
            Some(snapshot) => snapshot.runtime_version.clone(),
        };

        let source = Arc::clone(&self.source);
        let version = runtime_version.clone();
        let task = tokio::spawn(async move {
            let snapshot = Arc::new(collect(source.as_ref(), version, now).await);
            *current = Some(Arc::clone(&snapshot));
            snapshot
        });

        match task.await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Status collection task failed: {}", e);
                Arc::new(StatusSnapshot {
                    memory: MemoryStats::default(),
                    runtime_version,
                    listing: format!("\n\nerror collecting status: {}\n", e),
                    listing_ok: false,
                    refreshed_at: now,
                    collected_at: Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
                })
            }
        }
    }
}

async fn collect(
    source: &dyn StatusSource,
    runtime_version: String,
    now: Instant,
) -> StatusSnapshot {
    let start = std::time::Instant::now();
    let memory = source.memory_stats();

    let (listing, listing_ok) = match source.process_listing().await {
        Ok(text) => (text, true),
        Err(failure) => {
            error!("Error calling process listing: {}", failure.error);
            (failure.output, false)
        }
    };

    debug!(
        "Status snapshot collected in {:.2}ms",
        start.elapsed().as_secs_f64() * 1000.0
    );

    StatusSnapshot {
        memory,
        runtime_version,
        listing,
        listing_ok,
        refreshed_at: now,
        collected_at: Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::listing::ListingError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source that counts listing invocations and numbers each listing.
    pub(crate) struct FakeSource {
        pub calls: AtomicUsize,
        pub memory: MemoryStats,
        pub delay: Duration,
        pub fail: bool,
    }

    impl FakeSource {
        pub(crate) fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                memory: MemoryStats {
                    allocated: 2_097_152,
                    sys: 4_194_304,
                    ..Default::default()
                },
                delay: Duration::ZERO,
                fail: false,
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusSource for FakeSource {
        fn runtime_version(&self) -> String {
            "test-runtime".to_string()
        }

        fn memory_stats(&self) -> MemoryStats {
            self.memory
        }

        async fn process_listing(&self) -> Result<String, ListingFailure> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(ListingFailure {
                    output: format!("\n\nerror calling [top]: run {}\n", n),
                    error: ListingError::Timeout(Duration::from_secs(1)),
                });
            }
            Ok(format!("listing {}", n))
        }
    }

    fn cache_with(source: Arc<FakeSource>) -> StatusCache {
        StatusCache::new(source, Duration::from_secs(5))
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_call_collects() {
        let source = Arc::new(FakeSource::new());
        let cache = cache_with(source.clone());

        let snapshot = cache.refresh_if_stale().await;
        assert_eq!(source.calls(), 1);
        assert_eq!(snapshot.listing, "listing 1");
        assert_eq!(snapshot.runtime_version, "test-runtime");
        assert_eq!(snapshot.memory.allocated, 2_097_152);
        assert!(snapshot.listing_ok);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hits_within_window() {
        let source = Arc::new(FakeSource::new());
        let cache = cache_with(source.clone());

        let first = cache.refresh_if_stale().await;
        for _ in 0..4 {
            tokio::time::advance(Duration::from_secs(1)).await;
            let again = cache.refresh_if_stale().await;
            assert!(Arc::ptr_eq(&first, &again));
        }
        // Exactly at the window boundary is still fresh
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.refresh_if_stale().await;
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_after_window() {
        let source = Arc::new(FakeSource::new());
        let cache = cache_with(source.clone());

        cache.refresh_if_stale().await;
        for expected in 2..=4 {
            tokio::time::advance(Duration::from_secs(6)).await;
            let snapshot = cache.refresh_if_stale().await;
            assert_eq!(source.calls(), expected);
            assert_eq!(snapshot.listing, format!("listing {}", expected));
            assert_eq!(snapshot.runtime_version, "test-runtime");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_miss_collects_once() {
        let mut fake = FakeSource::new();
        fake.delay = Duration::from_millis(500);
        let source = Arc::new(fake);
        let cache = Arc::new(cache_with(source.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.refresh_if_stale().await })
            })
            .collect();

        let mut snapshots = Vec::new();
        for h in handles {
            snapshots.push(h.await.unwrap());
        }

        assert_eq!(source.calls(), 1);
        assert!(snapshots.iter().all(|s| Arc::ptr_eq(s, &snapshots[0])));
        assert_eq!(snapshots[0].listing, "listing 1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_stale_refresh_collects_once() {
        let mut fake = FakeSource::new();
        fake.delay = Duration::from_millis(500);
        let source = Arc::new(fake);
        let cache = Arc::new(cache_with(source.clone()));

        cache.refresh_if_stale().await;
        tokio::time::advance(Duration::from_secs(10)).await;

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.refresh_if_stale().await })
            })
            .collect();

        for h in handles {
            assert_eq!(h.await.unwrap().listing, "listing 2");
        }
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_caller_does_not_abort_refresh() {
        let mut fake = FakeSource::new();
        fake.delay = Duration::from_millis(500);
        let source = Arc::new(fake);
        let cache = Arc::new(cache_with(source.clone()));

        let first = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.refresh_if_stale().await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());

        let second = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.refresh_if_stale().await })
        };
        let snapshot = second.await.unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(snapshot.listing, "listing 1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_listing_is_stored() {
        let mut fake = FakeSource::new();
        fake.fail = true;
        let source = Arc::new(fake);
        let cache = cache_with(source.clone());

        let snapshot = cache.refresh_if_stale().await;
        assert!(!snapshot.listing_ok);
        assert!(snapshot.listing.contains("error calling [top]"));

        // Failed attempts still count as a refresh for staleness
        tokio::time::advance(Duration::from_secs(2)).await;
        cache.refresh_if_stale().await;
        assert_eq!(source.calls(), 1);
    }
}
