//! Fetch-with-cache-and-retry engine
//!
//! Turns an unreliable remote feed into a validated, cached snapshot:
//! - Serves a fresh cached snapshot without touching the network
//! - Bounds every attempt by a fixed deadline
//! - Retries retryable failures with capped exponential backoff
//! - Classifies every failure exactly once, here

use std::sync::Arc;

use tracing::{debug, info, warn};

use quake_core::{
    classify_failure, system_clock, ClassifiedError, FeedSnapshot, RawFailure, SharedClock,
};

use crate::{parse_feed, CacheEntry, FeedCache, FeedConfig, HttpTransport, SharedTransport};

/// The fetch-cache engine for one feed
pub struct FeedEngine {
    config: FeedConfig,
    transport: SharedTransport,
    cache: Arc<FeedCache>,
    clock: SharedClock,
}

impl FeedEngine {
    /// Engine with its own cache
    pub fn new(config: FeedConfig, transport: SharedTransport, clock: SharedClock) -> Self {
        Self::with_cache(config, transport, clock, Arc::new(FeedCache::new()))
    }

    /// Engine over an injected cache
    pub fn with_cache(
        config: FeedConfig,
        transport: SharedTransport,
        clock: SharedClock,
        cache: Arc<FeedCache>,
    ) -> Self {
        Self {
            config,
            transport,
            cache,
            clock,
        }
    }

    /// Engine over HTTPS with the wall clock
    pub fn http(config: FeedConfig) -> Result<Self, ClassifiedError> {
        let transport = HttpTransport::new(&config).map_err(classify_failure)?;
        Ok(Self::new(config, Arc::new(transport), system_clock()))
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<FeedCache> {
        &self.cache
    }

    /// Fetch using the configured TTL and retry budget
    pub async fn fetch_default(&self) -> Result<Arc<FeedSnapshot>, ClassifiedError> {
        self.fetch_events(self.config.ttl_ms, self.config.max_retries)
            .await
    }

    /// Return a fresh cached snapshot, or fetch, validate and cache a new one.
    ///
    /// Makes at most `max_retries + 1` attempts. Non-retryable failures and
    /// the failure of the last attempt are returned immediately.
    pub async fn fetch_events(
        &self,
        ttl_ms: i64,
        max_retries: u32,
    ) -> Result<Arc<FeedSnapshot>, ClassifiedError> {
        let key = self.config.source_id.as_str();

        if let Some(snapshot) = self.cache.get_fresh(key, self.clock.now_ms(), ttl_ms) {
            debug!("Serving {} events from cache", snapshot.event_count());
            return Ok(snapshot);
        }

        for attempt in 0..=max_retries {
            match self.attempt().await {
                Ok(snapshot) => {
                    let snapshot = Arc::new(snapshot);
                    self.cache.insert(
                        key,
                        CacheEntry {
                            cached_at: self.clock.now_ms(),
                            ttl_ms,
                            snapshot: snapshot.clone(),
                        },
                    );
                    return Ok(snapshot);
                }
                Err(error) => {
                    let last = attempt == max_retries;
                    if !error.retryable || last {
                        warn!(
                            code = %error.code,
                            attempt = attempt + 1,
                            "Feed fetch failed: {}",
                            error.detail.as_deref().unwrap_or(&error.message)
                        );
                        return Err(error);
                    }

                    let wait = self.config.backoff(attempt);
                    warn!(
                        code = %error.code,
                        attempt = attempt + 1,
                        "Feed fetch failed, retrying in {} ms",
                        wait.as_millis()
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }

        Err(ClassifiedError::retries_exhausted(max_retries.saturating_add(1)))
    }

    /// Drop every cached snapshot so the next fetch hits the network
    pub fn invalidate_cache(&self) {
        debug!("Invalidating feed cache ({} entries)", self.cache.len());
        self.cache.invalidate_all();
    }

    /// One bounded request plus validation
    async fn attempt(&self) -> Result<FeedSnapshot, ClassifiedError> {
        let timeout = self.config.timeout();
        let request = self.transport.get(&self.config.endpoint, timeout);

        let body = match tokio::time::timeout(timeout, request).await {
            Ok(Ok(body)) => body,
            Ok(Err(failure)) => return Err(classify_failure(failure)),
            Err(_) => {
                return Err(classify_failure(RawFailure::timeout(format!(
                    "no response within {} s",
                    self.config.timeout_secs
                ))))
            }
        };

        let parsed = parse_feed(&body, self.clock.now_ms(), &self.config.endpoint)?;
        info!(
            events = parsed.snapshot.event_count(),
            dropped = parsed.dropped,
            "Fetched feed snapshot"
        );
        Ok(parsed.snapshot)
    }
}
