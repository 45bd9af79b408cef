//! Mounted view state, the poll task and force refresh.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::{FeedSource, FetchOutcome, SyncConfig, SyncError};
use crate::models::Post;

// == View State ==
/// What a mounted view currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub items: Vec<Post>,
    /// Server epoch of the applied items
    pub epoch: Option<u64>,
    /// Generation of the last applied fetch; 0 before the first one
    pub applied_generation: u64,
    /// A force refresh is running; `items` still holds the previous data
    pub refreshing: bool,
    /// Last force refresh failure, cleared by the next applied fetch
    pub error: Option<SyncError>,
    /// Maintenance message while the site is down
    pub maintenance: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Result of offering a fetch result to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// A newer fetch was already applied; the result was dropped
    Stale,
    /// The view is gone
    Unmounted,
}

/// Result of a force refresh that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied { epoch: u64 },
    /// Fresh data arrived after a newer fetch had already landed
    Stale,
    /// Another force refresh is in flight; this call did nothing
    AlreadyRunning,
}

/// Resets an in-flight flag even if the owning future is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Shows the refreshing indicator for as long as it lives.
///
/// Clears the indicator on every exit, including a dropped caller future.
struct Refreshing<'a>(&'a watch::Sender<ViewState>);

impl<'a> Refreshing<'a> {
    fn show(state: &'a watch::Sender<ViewState>, mounted: &AtomicBool) -> Self {
        state.send_if_modified(|view| {
            if !mounted.load(Ordering::SeqCst) {
                return false;
            }
            view.refreshing = true;
            true
        });
        Self(state)
    }
}

impl Drop for Refreshing<'_> {
    fn drop(&mut self) {
        self.0.send_if_modified(|view| std::mem::take(&mut view.refreshing));
    }
}

struct Inner {
    source: Arc<dyn FeedSource>,
    generation: AtomicU64,
    mounted: AtomicBool,
    poll_in_flight: AtomicBool,
    refresh_in_flight: AtomicBool,
    state: watch::Sender<ViewState>,
    force_refresh_timeout: Duration,
}

impl Inner {
    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Offers a fetch result; `finish` runs under the same lock whether or
    /// not the result wins, as long as the view is mounted.
    fn offer(
        &self,
        generation: u64,
        result: Result<FetchOutcome, SyncError>,
        finish: impl FnOnce(&mut ViewState),
    ) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::Unmounted;

        self.state.send_if_modified(|view| {
            if !self.mounted.load(Ordering::SeqCst) {
                return false;
            }
            finish(view);

            match result {
                Err(e) => {
                    outcome = ApplyOutcome::Applied;
                    view.error = Some(e);
                }
                Ok(_) if generation <= view.applied_generation => {
                    outcome = ApplyOutcome::Stale;
                }
                Ok(FetchOutcome::Feed(feed)) => {
                    outcome = ApplyOutcome::Applied;
                    view.items = feed.items;
                    view.epoch = Some(feed.epoch);
                    view.applied_generation = generation;
                    view.maintenance = None;
                    view.error = None;
                    view.last_updated = Some(Utc::now());
                }
                Ok(FetchOutcome::Maintenance(notice)) => {
                    // Keep showing the last items under the notice
                    outcome = ApplyOutcome::Applied;
                    view.applied_generation = generation;
                    view.maintenance = Some(notice.message);
                    view.error = None;
                    view.last_updated = Some(Utc::now());
                }
            }
            true
        });

        if outcome == ApplyOutcome::Stale {
            debug!(generation, "Dropped late fetch result");
        }
        outcome
    }

    async fn poll_once(&self) -> bool {
        let Some(_guard) = InFlight::acquire(&self.poll_in_flight) else {
            debug!("Previous poll still outstanding, skipping tick");
            return false;
        };

        let generation = self.next_generation();
        match self.source.fetch(None).await {
            Ok(outcome) => {
                self.offer(generation, Ok(outcome), |_| {});
            }
            Err(e) => warn!(generation, "Poll fetch failed: {}", e),
        }
        true
    }
}

// == Freshness Synchronizer ==
/// One mounted view of a content feed.
///
/// Dropping the synchronizer unmounts it.
pub struct FreshnessSynchronizer {
    inner: Arc<Inner>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl FreshnessSynchronizer {
    // == Mounting ==
    /// Creates a mounted view with no poll task running.
    pub fn new(source: Arc<dyn FeedSource>, force_refresh_timeout: Duration) -> Self {
        let (state, _) = watch::channel(ViewState::default());
        Self {
            inner: Arc::new(Inner {
                source,
                generation: AtomicU64::new(0),
                mounted: AtomicBool::new(true),
                poll_in_flight: AtomicBool::new(false),
                refresh_in_flight: AtomicBool::new(false),
                state,
                force_refresh_timeout,
            }),
            poll_task: Mutex::new(None),
        }
    }

    /// Mounts a view: fetches once right away, then polls on the interval.
    pub fn mount(source: Arc<dyn FeedSource>, config: &SyncConfig) -> Self {
        let synchronizer = Self::new(source, config.force_refresh_timeout);
        synchronizer.start_polling(config.poll_interval);
        synchronizer
    }

    /// Starts the poll task, replacing any previous one.
    pub fn start_polling(&self, every: Duration) {
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                // First tick completes immediately: that is the mount fetch
                ticker.tick().await;
                inner.poll_once().await;
            }
        });

        if let Ok(mut slot) = self.poll_task.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        }
    }

    /// Cancels polling and refuses every later apply, including the one an
    /// in-flight force refresh would make.
    pub fn unmount(&self) {
        // Flip under the state lock so no apply straddles the unmount
        self.inner.state.send_if_modified(|_| {
            self.inner.mounted.store(false, Ordering::SeqCst);
            false
        });

        if let Ok(mut slot) = self.poll_task.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
                info!("View unmounted, poll task cancelled");
            }
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.load(Ordering::SeqCst)
    }

    // == View Access ==
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> ViewState {
        self.inner.state.borrow().clone()
    }

    // == Fetching ==
    /// Runs one poll fetch now. Returns false when a poll was already
    /// outstanding and this one was skipped.
    pub async fn poll_now(&self) -> bool {
        self.inner.poll_once().await
    }

    /// Clears every server cache, waits for the acknowledgement, then
    /// fetches with caches bypassed.
    ///
    /// The previous items stay visible while this runs. Failures, including
    /// the timeout, land in [`ViewState::error`] and are returned.
    pub async fn force_refresh(&self) -> Result<RefreshOutcome, SyncError> {
        if !self.is_mounted() {
            return Err(SyncError::Unmounted);
        }
        let Some(_guard) = InFlight::acquire(&self.inner.refresh_in_flight) else {
            debug!("Force refresh already running");
            return Ok(RefreshOutcome::AlreadyRunning);
        };

        let _indicator = Refreshing::show(&self.inner.state, &self.inner.mounted);

        let inner = &self.inner;
        let limit = inner.force_refresh_timeout;
        let attempt = async {
            let acknowledged = inner.source.clear_all().await?;
            let generation = inner.next_generation();
            let outcome = inner.source.fetch(Some(acknowledged)).await?;
            Ok::<_, SyncError>((generation, acknowledged, outcome))
        };

        let (generation, epoch, result) = match tokio::time::timeout(limit, attempt).await {
            Ok(Ok((generation, acknowledged, outcome))) => {
                let epoch = match &outcome {
                    FetchOutcome::Feed(feed) => feed.epoch,
                    FetchOutcome::Maintenance(_) => acknowledged,
                };
                (generation, epoch, Ok(outcome))
            }
            Ok(Err(e)) => (0, 0, Err(e)),
            Err(_) => (0, 0, Err(SyncError::Timeout(limit))),
        };

        let failure = result.as_ref().err().cloned();
        if let Some(e) = &failure {
            warn!("Force refresh failed: {}", e);
        }

        let applied = inner.offer(generation, result, |view| view.refreshing = false);
        if applied == ApplyOutcome::Unmounted {
            return Err(SyncError::Unmounted);
        }
        if let Some(e) = failure {
            return Err(e);
        }

        match applied {
            ApplyOutcome::Stale => Ok(RefreshOutcome::Stale),
            _ => {
                info!(epoch, generation, "Force refresh applied");
                Ok(RefreshOutcome::Applied { epoch })
            }
        }
    }
}

impl Drop for FreshnessSynchronizer {
    fn drop(&mut self) {
        self.unmount();
    }
}
