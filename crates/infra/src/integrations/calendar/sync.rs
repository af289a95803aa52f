//! Periodic calendar synchronisation
//!
//! The worker mirrors the provider's window into the shared event cache and
//! keeps the embedding index in step with it. Lifecycle follows the usual
//! runtime rules: the loop's join handle is tracked, cancellation is
//! explicit, and stopping waits for the task with a timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use actionarc_core::calendar::{index_events, CacheDiff, SharedEmbeddingIndex, SharedEventCache};
use actionarc_core::{CalendarProvider, Embedder};
use actionarc_domain::constants::{DEFAULT_LOOKAHEAD_DAYS, DEFAULT_LOOKBACK_DAYS};
use actionarc_domain::{ActionArcError, CalendarEvent, EventTimeRange, Result};
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of one [`CalendarSyncWorker::sync_once`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced(CacheDiff),
    /// Another sync was already in flight.
    Skipped,
}

pub struct CalendarSyncWorker {
    provider: Arc<dyn CalendarProvider>,
    cache: SharedEventCache,
    index: SharedEmbeddingIndex,
    embedder: Option<Arc<dyn Embedder>>,
    lookback_days: i64,
    lookahead_days: i64,
    job_timeout: Duration,
    join_timeout: Duration,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag however the sync ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CalendarSyncWorker {
    pub fn new(
        provider: Arc<dyn CalendarProvider>,
        cache: SharedEventCache,
        index: SharedEmbeddingIndex,
    ) -> Self {
        Self {
            provider,
            cache,
            index,
            embedder: None,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
            job_timeout: DEFAULT_JOB_TIMEOUT,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Keep the subject index current; without one only the cache is synced.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_window(mut self, lookback_days: i64, lookahead_days: i64) -> Self {
        self.lookback_days = lookback_days;
        self.lookahead_days = lookahead_days;
        self
    }

    pub fn with_timeouts(mut self, job_timeout: Duration, join_timeout: Duration) -> Self {
        self.job_timeout = job_timeout;
        self.join_timeout = join_timeout;
        self
    }

    pub fn window(&self) -> EventTimeRange {
        EventTimeRange::around(Utc::now(), self.lookback_days, self.lookahead_days)
    }

    /// Fetches the window once and applies it to the cache and index.
    ///
    /// Provider errors leave the cache untouched. Embedding errors are logged
    /// and do not fail the sync; the affected events are simply not indexed.
    #[instrument(skip(self), fields(provider = self.provider.provider_name()))]
    pub async fn sync_once(&self) -> Result<SyncOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("calendar sync already running, skipping");
            return Ok(SyncOutcome::Skipped);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let started = Instant::now();
        let events = self.provider.list_events(self.window()).await?;
        let fetched = events.len();

        let (diff, changed) = {
            let mut cache = self.cache.write();
            let diff = cache.apply_snapshot(events);
            let changed: Vec<CalendarEvent> =
                diff.changed().filter_map(|id| cache.get(id).cloned()).collect();
            (diff, changed)
        };

        {
            let mut index = self.index.write();
            for id in &diff.removed {
                index.remove(id);
            }
        }

        if let Some(embedder) = &self.embedder {
            match index_events(embedder.as_ref(), &self.index, &changed).await {
                Ok(indexed) => debug!(indexed, "refreshed event embeddings"),
                Err(err) => warn!(error = %err, "embedding refresh failed; keeping previous vectors"),
            }
        }

        info!(
            fetched,
            added = diff.added.len(),
            updated = diff.updated.len(),
            removed = diff.removed.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "calendar synced"
        );
        Ok(SyncOutcome::Synced(diff))
    }

    /// Spawns the periodic loop. The first sync runs immediately.
    pub fn start(self: Arc<Self>, interval: Duration) -> SyncHandle {
        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        let join_timeout = self.join_timeout;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = loop_cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                tokio::select! {
                    biased;
                    _ = loop_cancel.cancelled() => break,
                    result = tokio::time::timeout(self.job_timeout, self.sync_once()) => match result {
                        Ok(Ok(_)) => {}
                        Ok(Err(err)) => error!(error = %err, "calendar sync failed"),
                        Err(_) => warn!(timeout_secs = self.job_timeout.as_secs(), "calendar sync timed out"),
                    },
                }
            }
            debug!("calendar sync loop exited");
        });

        info!(interval_secs = interval.as_secs(), "calendar sync loop started");
        SyncHandle { cancel, handle, join_timeout }
    }
}

/// Running sync loop; call [`SyncHandle::stop`] to shut it down.
pub struct SyncHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    join_timeout: Duration,
}

impl SyncHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancels the loop and waits for it to exit.
    #[instrument(skip(self))]
    pub async fn stop(self) -> Result<()> {
        self.cancel.cancel();
        match tokio::time::timeout(self.join_timeout, self.handle).await {
            Ok(Ok(())) => {
                info!("calendar sync loop stopped");
                Ok(())
            }
            Ok(Err(join)) => Err(ActionArcError::Internal(format!("calendar sync task failed: {join}"))),
            Err(_) => Err(ActionArcError::Internal(format!(
                "calendar sync task did not stop within {:?}",
                self.join_timeout
            ))),
        }
    }
}
