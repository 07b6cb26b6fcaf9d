//! Feed State Store
//!
//! Owns everything the presentation layer reads:
//! - The last good snapshot, kept through later failures
//! - Loading flag, current error and last update time
//! - Filter settings and the filtered view derived from them
//! - Optional periodic refresh on a fixed interval

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use quake_core::{
    classify_failure, filter_events, system_clock, ClassifiedError, ErrorCode, FeedSnapshot,
    FeedSummary, FilterConfig, FilterUpdate, SeismicEvent, SharedClock,
};
use quake_feed::{FeedConfig, FeedEngine, HttpTransport, SharedTransport};
use quake_map::{
    ClusterConfig, ClusterNode, ClusterPipeline, RecenterIntent, RenderNode, Viewport,
};

/// Default auto-refresh period, matching the upstream publish cadence
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub feed: FeedConfig,
    pub cluster: ClusterConfig,
    /// Period of the [`FeedStore::run`] loop in seconds
    pub refresh_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            cluster: ClusterConfig::default(),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
        }
    }
}

impl StoreConfig {
    pub fn with_feed(mut self, feed: FeedConfig) -> Self {
        self.feed = feed;
        self
    }

    pub fn with_refresh_interval_secs(mut self, secs: u64) -> Self {
        self.refresh_interval_secs = secs;
        self
    }
}

/// Everything a consumer can observe, published as one value
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    /// Absent until the first successful fetch
    pub feed: Option<Arc<FeedSnapshot>>,
    pub filtered_events: Arc<Vec<SeismicEvent>>,
    pub loading: bool,
    pub error: Option<ClassifiedError>,
    pub filters: FilterConfig,
    /// Epoch milliseconds of the last successful refresh
    pub last_updated: Option<i64>,
}

/// Result of one [`FeedStore::refresh`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A snapshot (fresh or cached) was stored
    Updated,
    /// The fetch failed; the error is now current
    Failed(ErrorCode),
    /// Another refresh was already in flight
    Skipped,
}

/// Counters reported when the refresh loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub updated: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl RunStats {
    fn record(&mut self, outcome: RefreshOutcome) {
        match outcome {
            RefreshOutcome::Updated => self.updated += 1,
            RefreshOutcome::Failed(_) => self.failed += 1,
            RefreshOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Clears the loading flag if a refresh is dropped before it finishes
struct InFlight<'a> {
    state: &'a watch::Sender<StoreState>,
    armed: bool,
}

impl InFlight<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_modify(|s| s.loading = false);
        }
    }
}

/// The feed state store
pub struct FeedStore {
    engine: FeedEngine,
    pipeline: ClusterPipeline,
    clock: SharedClock,
    state: watch::Sender<StoreState>,
    activated: AtomicBool,
    refresh_interval: Duration,
}

impl FeedStore {
    /// Store over `transport`, reading time from `clock`
    pub fn new(config: StoreConfig, transport: SharedTransport, clock: SharedClock) -> Self {
        let engine = FeedEngine::new(config.feed, transport, clock.clone());
        let (state, _) = watch::channel(StoreState::default());
        Self {
            engine,
            pipeline: ClusterPipeline::new(config.cluster),
            clock,
            state,
            activated: AtomicBool::new(false),
            refresh_interval: Duration::from_secs(config.refresh_interval_secs.max(1)),
        }
    }

    /// Store over HTTPS and the wall clock
    pub fn from_config(config: StoreConfig) -> Result<Self, ClassifiedError> {
        let transport = HttpTransport::new(&config.feed).map_err(classify_failure)?;
        Ok(Self::new(config, Arc::new(transport), system_clock()))
    }

    /// Store for the default public feed
    pub fn with_defaults() -> Result<Self, ClassifiedError> {
        Self::from_config(StoreConfig::default())
    }

    pub fn engine(&self) -> &FeedEngine {
        &self.engine
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }

    /// Copy of the whole current state
    pub fn state(&self) -> StoreState {
        self.state.borrow().clone()
    }

    pub fn feed(&self) -> Option<Arc<FeedSnapshot>> {
        self.state.borrow().feed.clone()
    }

    pub fn filtered_events(&self) -> Arc<Vec<SeismicEvent>> {
        self.state.borrow().filtered_events.clone()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<ClassifiedError> {
        self.state.borrow().error.clone()
    }

    pub fn filters(&self) -> FilterConfig {
        self.state.borrow().filters
    }

    pub fn last_updated(&self) -> Option<i64> {
        self.state.borrow().last_updated
    }

    /// First activation issues the initial refresh; later calls do nothing
    pub async fn activate(&self) -> Option<RefreshOutcome> {
        if self.activated.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(self.refresh().await)
    }

    /// Fetch through the engine and publish the result.
    ///
    /// A failed fetch leaves the previous snapshot in place. A call made
    /// while another refresh is in flight returns [`RefreshOutcome::Skipped`].
    pub async fn refresh(&self) -> RefreshOutcome {
        let started = self.state.send_if_modified(|s| {
            if s.loading {
                return false;
            }
            s.loading = true;
            s.error = None;
            true
        });
        if !started {
            debug!("Refresh already in flight, skipping");
            return RefreshOutcome::Skipped;
        }

        let guard = InFlight {
            state: &self.state,
            armed: true,
        };
        let result = self.engine.fetch_default().await;
        guard.disarm();

        match result {
            Ok(snapshot) => {
                let now = self.clock.now_ms();
                let count = snapshot.event_count();
                self.state.send_modify(|s| {
                    s.filtered_events = Arc::new(filter_events(snapshot.events(), &s.filters, now));
                    s.feed = Some(snapshot);
                    s.last_updated = Some(now);
                    s.error = None;
                    s.loading = false;
                });
                info!(events = count, "Feed state updated");
                RefreshOutcome::Updated
            }
            Err(error) => {
                let code = error.code;
                warn!(
                    code = %code,
                    retryable = error.retryable,
                    "Refresh failed: {}",
                    error.message
                );
                self.state.send_modify(|s| {
                    s.error = Some(error);
                    s.loading = false;
                });
                RefreshOutcome::Failed(code)
            }
        }
    }

    /// Drop the engine cache, then refresh
    pub async fn force_refresh(&self) -> RefreshOutcome {
        self.engine.invalidate_cache();
        self.refresh().await
    }

    /// Merge `update` into the filters and recompute the filtered view.
    ///
    /// Returns whether anything changed. Never touches the network.
    pub fn set_filters(&self, update: FilterUpdate) -> bool {
        let now = self.clock.now_ms();
        self.state.send_if_modified(|s| {
            if !s.filters.apply(update) {
                return false;
            }
            let events = s.feed.as_deref().map(FeedSnapshot::events).unwrap_or(&[]);
            s.filtered_events = Arc::new(filter_events(events, &s.filters, now));
            true
        })
    }

    /// Dismiss the current error, if any
    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    /// Statistics over the filtered view
    pub fn summary(&self) -> FeedSummary {
        let state = self.state.borrow();
        let total = state.feed.as_ref().map_or(0, |f| f.event_count());
        FeedSummary::compute(&state.filtered_events, total)
    }

    /// Render nodes for the filtered view in `viewport`
    pub fn render_nodes(&self, viewport: &Viewport) -> Vec<RenderNode> {
        let (events, filters) = {
            let state = self.state.borrow();
            (state.filtered_events.clone(), state.filters)
        };
        self.pipeline.render(&events, viewport, &filters)
    }

    pub fn select_cluster(&self, cluster: &ClusterNode, current_zoom: f64) -> RecenterIntent {
        self.pipeline.select_cluster(cluster, current_zoom)
    }

    /// Activate, then refresh every interval until `shutdown` resolves
    pub async fn run<F>(&self, shutdown: F) -> RunStats
    where
        F: Future<Output = ()>,
    {
        let mut stats = RunStats::default();
        tokio::pin!(shutdown);

        info!(
            "Feed store starting, refresh every {} s",
            self.refresh_interval.as_secs()
        );

        let mut ticker = interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        if let Some(outcome) = self.activate().await {
            stats.record(outcome);
        }

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Feed store stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let outcome = self.refresh().await;
                    debug!("Scheduled refresh: {:?}", outcome);
                    stats.record(outcome);
                }
            }
        }

        stats
    }
}
