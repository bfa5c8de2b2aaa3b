//! # Prefetch Orchestrator
//!
//! Warms the metadata caches for an item the first time it is touched, so
//! that the screens opened next (details, subtitle picker, chapter list,
//! seek-bar previews) find their data already loaded.
//!
//! Warming never blocks the caller and never fails it: every facet is fetched
//! by its own spawned task, failures are logged and counted, and the item
//! stays "seen" regardless.

use async_trait::async_trait;
use bridge_traits::PowerMonitor;
use core_runtime::events::{CoreEvent, EventBus, PrefetchEvent};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use crate::cache::FlushOutcome;
use crate::cached_provider::CachedMetadataProvider;
use crate::error::{MetadataError, Result};
use crate::models::{
    Chapter, ItemId, MetaInfo, PreviewThumbnailsInfo, RepoInfo, Stream, Subtitle, Thumbnail,
};
use crate::provider::MetadataProvider;

/// Default cap on concurrent thumbnail fetches.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;

/// Default cap on thumbnail buckets warmed per item.
pub const DEFAULT_MAX_THUMBNAIL_BUCKETS: usize = 1024;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchConfig {
    /// Include every preview thumbnail bucket in a warmup
    pub include_thumbnails: bool,
    /// Maximum thumbnail fetches in flight across all warmups
    pub max_concurrent_fetches: usize,
    /// Buckets past this index are left for foreground reads
    pub max_thumbnail_buckets: usize,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            include_thumbnails: true,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            max_thumbnail_buckets: DEFAULT_MAX_THUMBNAIL_BUCKETS,
        }
    }
}

impl PrefetchConfig {
    pub fn with_thumbnails(mut self, include: bool) -> Self {
        self.include_thumbnails = include;
        self
    }

    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = limit;
        self
    }

    pub fn with_max_thumbnail_buckets(mut self, limit: usize) -> Self {
        self.max_thumbnail_buckets = limit;
        self
    }
}

// ============================================================================
// Warmup results
// ============================================================================

/// Outcome of one warmup. Each thumbnail bucket counts as one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmupReport {
    pub item_id: ItemId,
    pub succeeded: usize,
    pub failed: usize,
}

impl WarmupReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Handle to a running warmup. Awaiting it is optional.
#[derive(Debug)]
pub struct WarmupHandle {
    item_id: ItemId,
    task: JoinHandle<WarmupReport>,
}

impl WarmupHandle {
    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    /// Waits for every fetch of the warmup to settle.
    ///
    /// Returns `None` if the warmup task was aborted.
    pub async fn wait(self) -> Option<WarmupReport> {
        match self.task.await {
            Ok(report) => Some(report),
            Err(err) => {
                warn!(item_id = %self.item_id, error = %err, "Warmup task did not complete");
                None
            }
        }
    }
}

#[derive(Default)]
struct Tally {
    succeeded: usize,
    failed: usize,
}

impl Tally {
    fn record(&mut self, facet: &'static str, item_id: &ItemId, outcome: Result<()>) {
        match outcome {
            Ok(()) => self.succeeded += 1,
            Err(err) => {
                self.failed += 1;
                debug!(item_id = %item_id, facet, error = %err, "Prefetch fetch failed");
            }
        }
    }

    fn absorb(&mut self, other: Tally) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

type FacetTask = (&'static str, JoinHandle<Tally>);

// ============================================================================
// Orchestrator
// ============================================================================

/// Issues cache-backed fetches for every facet of an item, once per item.
///
/// Items are remembered in a seen set until [`reset`](Self::reset). While
/// [`disabled`](Self::set_disabled), requests are ignored and not remembered.
pub struct PrefetchOrchestrator {
    cache: Arc<CachedMetadataProvider>,
    config: PrefetchConfig,
    seen: Mutex<HashSet<ItemId>>,
    disabled: Arc<AtomicBool>,
    thumbnail_permits: Arc<Semaphore>,
    event_bus: Option<EventBus>,
    power_watch: Mutex<Option<JoinHandle<()>>>,
}

impl PrefetchOrchestrator {
    pub fn new(cache: Arc<CachedMetadataProvider>, config: PrefetchConfig) -> Self {
        let permits = config.max_concurrent_fetches.max(1);
        Self {
            cache,
            config,
            seen: Mutex::new(HashSet::new()),
            disabled: Arc::new(AtomicBool::new(false)),
            thumbnail_permits: Arc::new(Semaphore::new(permits)),
            event_bus: None,
            power_watch: Mutex::new(None),
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn cache(&self) -> &Arc<CachedMetadataProvider> {
        &self.cache
    }

    /// Starts warming `item_id` unless it was already warmed or warming is
    /// disabled. Returns immediately.
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(skip(self, item_id), fields(item_id = %item_id))]
    pub fn ensure_warmed(&self, item_id: &ItemId) -> Option<WarmupHandle> {
        if self.is_disabled() {
            trace!("Prefetching disabled, skipping");
            return None;
        }

        if !self.seen.lock().insert(item_id.clone()) {
            trace!("Already warmed");
            return None;
        }

        Some(self.spawn_warmup(item_id.clone()))
    }

    /// Warms `item_id` ahead of any read. Same rules as
    /// [`ensure_warmed`](Self::ensure_warmed).
    pub fn prefetch(&self, item_id: &ItemId) -> Option<WarmupHandle> {
        self.ensure_warmed(item_id)
    }

    /// Forgets every warmed item, so the next request warms again.
    pub fn reset(&self) {
        let mut seen = self.seen.lock();
        debug!(items = seen.len(), "Resetting prefetch state");
        seen.clear();
    }

    pub fn set_disabled(&self, disabled: bool) {
        apply_suspension(&self.disabled, self.event_bus.as_ref(), disabled);
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    pub fn is_warmed(&self, item_id: &ItemId) -> bool {
        self.seen.lock().contains(item_id)
    }

    pub fn warmed_count(&self) -> usize {
        self.seen.lock().len()
    }

    /// Mirrors the host's power-saving state into [`is_disabled`](Self::is_disabled).
    ///
    /// Applies the current state immediately, then follows changes on a
    /// background task. Binding again replaces the previous watcher.
    #[instrument(skip(self, monitor))]
    pub async fn bind_power_monitor(&self, monitor: Arc<dyn PowerMonitor>) -> Result<()> {
        let saving = monitor.is_power_saving().await;
        self.set_disabled(saving);

        let mut changes = monitor
            .subscribe_changes()
            .await
            .map_err(MetadataError::from)?;

        let disabled = Arc::clone(&self.disabled);
        let event_bus = self.event_bus.clone();
        let watcher = tokio::spawn(async move {
            while let Some(state) = changes.next().await {
                apply_suspension(&disabled, event_bus.as_ref(), state.is_power_saving());
            }
            debug!("Power state stream closed");
        });

        if let Some(previous) = self.power_watch.lock().replace(watcher) {
            previous.abort();
        }
        info!(power_saving = saving, "Bound prefetching to power state");
        Ok(())
    }

    fn spawn_warmup(&self, item_id: ItemId) -> WarmupHandle {
        let mut facets: Vec<FacetTask> = vec![
            (
                "meta_info",
                self.spawn_fetch(&item_id, "meta_info", |cache, id| async move {
                    cache.get_meta_info(&id).await.map(drop)
                }),
            ),
            (
                "streams",
                self.spawn_fetch(&item_id, "streams", |cache, id| async move {
                    cache.get_streams(&id).await.map(drop)
                }),
            ),
            (
                "subtitles",
                self.spawn_fetch(&item_id, "subtitles", |cache, id| async move {
                    cache.get_subtitles(&id).await.map(drop)
                }),
            ),
            (
                "chapters",
                self.spawn_fetch(&item_id, "chapters", |cache, id| async move {
                    cache.get_chapters(&id).await.map(drop)
                }),
            ),
        ];

        if self.config.include_thumbnails {
            facets.push(("thumbnails", self.spawn_thumbnails(&item_id)));
        }

        debug!(item_id = %item_id, tasks = facets.len(), "Warmup started");
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Prefetch(PrefetchEvent::WarmupStarted {
                item_id: item_id.to_string(),
                tasks: facets.len(),
            }))
            .ok();
        }

        let event_bus = self.event_bus.clone();
        let report_id = item_id.clone();
        let task = tokio::spawn(async move {
            let mut tally = Tally::default();
            for (facet, task) in facets {
                match task.await {
                    Ok(result) => tally.absorb(result),
                    Err(err) => {
                        warn!(item_id = %report_id, facet, error = %err, "Prefetch task aborted");
                        tally.failed += 1;
                    }
                }
            }

            let report = WarmupReport {
                item_id: report_id,
                succeeded: tally.succeeded,
                failed: tally.failed,
            };
            debug!(
                item_id = %report.item_id,
                succeeded = report.succeeded,
                failed = report.failed,
                "Warmup completed"
            );
            if let Some(bus) = event_bus {
                bus.emit(CoreEvent::Prefetch(PrefetchEvent::WarmupCompleted {
                    item_id: report.item_id.to_string(),
                    succeeded: report.succeeded,
                    failed: report.failed,
                }))
                .ok();
            }
            report
        });

        WarmupHandle { item_id, task }
    }

    fn spawn_fetch<F, Fut>(&self, item_id: &ItemId, facet: &'static str, fetch: F) -> JoinHandle<Tally>
    where
        F: FnOnce(Arc<CachedMetadataProvider>, ItemId) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let id = item_id.clone();
        let pending = fetch(Arc::clone(&self.cache), item_id.clone());
        tokio::spawn(async move {
            let mut tally = Tally::default();
            tally.record(facet, &id, pending.await);
            tally
        })
    }

    /// Loads the thumbnail layout, then every bucket, bounded by the shared
    /// semaphore.
    fn spawn_thumbnails(&self, item_id: &ItemId) -> JoinHandle<Tally> {
        let cache = Arc::clone(&self.cache);
        let permits = Arc::clone(&self.thumbnail_permits);
        let max_buckets = self.config.max_thumbnail_buckets;
        let id = item_id.clone();

        tokio::spawn(async move {
            let mut tally = Tally::default();
            let info = match cache.get_preview_thumbnails_info(&id).await {
                Ok(info) => {
                    tally.succeeded += 1;
                    info
                }
                Err(err) => {
                    tally.record("thumbnails_info", &id, Err(err));
                    return tally;
                }
            };

            if usize::try_from(info.count).map_or(true, |count| count > max_buckets) {
                warn!(
                    item_id = %id,
                    count = info.count,
                    max_buckets,
                    "Too many thumbnail buckets, warming only the first ones"
                );
            }

            let buckets: Vec<JoinHandle<Result<()>>> = info
                .bucket_starts()
                .take(max_buckets)
                .map(|timestamp_ms| {
                    let cache = Arc::clone(&cache);
                    let permits = Arc::clone(&permits);
                    let id = id.clone();
                    tokio::spawn(async move {
                        let _permit = permits.acquire_owned().await.map_err(|_| {
                            MetadataError::Cancelled("prefetch semaphore closed".to_string())
                        })?;
                        cache
                            .get_preview_thumbnail(&id, timestamp_ms)
                            .await
                            .map(drop)
                    })
                })
                .collect();

            for bucket in buckets {
                let outcome = bucket.await.unwrap_or_else(|err| {
                    Err(MetadataError::LoaderPanicked(err.to_string()))
                });
                tally.record("thumbnail", &id, outcome);
            }
            tally
        })
    }
}

fn apply_suspension(disabled: &AtomicBool, event_bus: Option<&EventBus>, suspended: bool) {
    let previous = disabled.swap(suspended, Ordering::SeqCst);
    if previous == suspended {
        return;
    }

    info!(suspended, "Prefetching state changed");
    if let Some(bus) = event_bus {
        bus.emit(CoreEvent::Prefetch(PrefetchEvent::SuspendedChanged { suspended }))
            .ok();
    }
}

impl Drop for PrefetchOrchestrator {
    fn drop(&mut self) {
        if let Some(watcher) = self.power_watch.lock().take() {
            watcher.abort();
        }
    }
}

impl fmt::Debug for PrefetchOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefetchOrchestrator")
            .field("config", &self.config)
            .field("warmed", &self.warmed_count())
            .field("disabled", &self.is_disabled())
            .finish()
    }
}

// ============================================================================
// Prefetching decorator
// ============================================================================

/// [`MetadataProvider`] that warms an item on every read of it.
///
/// Each item-scoped read first calls
/// [`PrefetchOrchestrator::ensure_warmed`], then serves the request from the
/// shared cache, which the warmup may already be filling.
#[derive(Debug, Clone)]
pub struct PrefetchingProvider {
    orchestrator: Arc<PrefetchOrchestrator>,
}

impl PrefetchingProvider {
    pub fn new(orchestrator: Arc<PrefetchOrchestrator>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Arc<PrefetchOrchestrator> {
        &self.orchestrator
    }

    fn cache(&self) -> &CachedMetadataProvider {
        self.orchestrator.cache()
    }

    fn warm(&self, item_id: &ItemId) {
        // The handle is dropped on purpose; the warmup keeps running.
        let _ = self.orchestrator.ensure_warmed(item_id);
    }

    /// Flushes the caches and forgets warmed items.
    pub fn flush(&self) -> FlushOutcome {
        let outcome = self.cache().flush();
        self.orchestrator.reset();
        outcome
    }
}

#[async_trait]
impl MetadataProvider for PrefetchingProvider {
    async fn get_meta_info(&self, item_id: &ItemId) -> Result<MetaInfo> {
        self.warm(item_id);
        self.cache().get_meta_info(item_id).await
    }

    async fn get_streams(&self, item_id: &ItemId) -> Result<Vec<Stream>> {
        self.warm(item_id);
        self.cache().get_streams(item_id).await
    }

    async fn get_subtitles(&self, item_id: &ItemId) -> Result<Vec<Subtitle>> {
        self.warm(item_id);
        self.cache().get_subtitles(item_id).await
    }

    async fn get_chapters(&self, item_id: &ItemId) -> Result<Vec<Chapter>> {
        self.warm(item_id);
        self.cache().get_chapters(item_id).await
    }

    async fn get_preview_thumbnails_info(
        &self,
        item_id: &ItemId,
    ) -> Result<PreviewThumbnailsInfo> {
        self.warm(item_id);
        self.cache().get_preview_thumbnails_info(item_id).await
    }

    async fn get_preview_thumbnail(
        &self,
        item_id: &ItemId,
        timestamp_ms: i64,
    ) -> Result<Option<Thumbnail>> {
        self.warm(item_id);
        self.cache().get_preview_thumbnail(item_id, timestamp_ms).await
    }

    async fn get_timestamp_link(&self, item_id: &ItemId, timestamp_secs: i64) -> Result<String> {
        self.warm(item_id);
        self.cache().get_timestamp_link(item_id, timestamp_secs).await
    }

    async fn get_repo_info(&self) -> Result<RepoInfo> {
        self.cache().get_repo_info().await
    }
}
