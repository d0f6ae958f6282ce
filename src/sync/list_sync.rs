use crate::domain_model::*;
use crate::domain_port::*;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone)]
pub struct ListConfig {
    pub poll_interval: Duration,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5000),
        }
    }
}

/// Everything a paginated list view renders. On a failed fetch `items` and
/// `pagination.total` keep their last good values and `error` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSnapshot<T> {
    pub items: Vec<T>,
    pub pagination: PaginationState,
    pub loading: bool,
    pub error: Option<RemoteError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    Failed(RemoteError),
    /// Another request was in flight, or the list is shut down.
    Skipped,
    /// Cancelled by navigation or teardown before it completed. Nothing was
    /// applied.
    Superseded,
}

struct InFlight {
    generation: u64,
    cancel: CancellationToken,
}

struct Core {
    pagination: PaginationState,
    generation: u64,
    in_flight: Option<InFlight>,
}

struct Ticket {
    generation: u64,
    query: PageQuery,
    cancel: CancellationToken,
}

struct Shared<T> {
    fetcher: Arc<dyn PageFetcher<T>>,
    limits: PageLimits,
    core: Mutex<Core>,
    snapshot_tx: watch::Sender<ListSnapshot<T>>,
    closed: CancellationToken,
}

/// Keeps one page of a server-paginated collection fresh.
///
/// A background ticker re-fetches the current page on a fixed interval. At
/// most one request is in flight: a tick or [`ListSync::refresh`] that finds
/// one running is skipped, while navigation cancels the running request and
/// issues its own. Only the newest request may write state.
pub struct ListSync<T> {
    shared: Arc<Shared<T>>,
    ticker_handle: Mutex<Option<JoinHandle<()>>>,
}

impl<T> ListSync<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Starts polling immediately; the first tick loads page 1.
    pub fn spawn(
        fetcher: Arc<dyn PageFetcher<T>>,
        limits: PageLimits,
        config: ListConfig,
    ) -> Self {
        let pagination = PaginationState::new(limits.default_limit());
        let (snapshot_tx, _) = watch::channel(ListSnapshot {
            items: Vec::new(),
            pagination,
            loading: true,
            error: None,
        });
        let shared = Arc::new(Shared {
            fetcher,
            limits,
            core: Mutex::new(Core {
                pagination,
                generation: 0,
                in_flight: None,
            }),
            snapshot_tx,
            closed: CancellationToken::new(),
        });

        let ticker_handle = tokio::spawn(shared.clone().poll(config.poll_interval));

        Self {
            shared,
            ticker_handle: Mutex::new(Some(ticker_handle)),
        }
    }

    pub fn scope(&self) -> ListScope {
        self.shared.fetcher.scope()
    }

    pub fn limits(&self) -> &PageLimits {
        &self.shared.limits
    }

    pub fn snapshot(&self) -> ListSnapshot<T> {
        self.shared.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListSnapshot<T>> {
        self.shared.snapshot_tx.subscribe()
    }

    /// Re-fetches the current page unless a request is already running.
    pub async fn refresh(&self) -> RefreshOutcome {
        let ticket = self.shared.begin(false, |_| {});
        self.drive(ticket).await
    }

    /// Re-fetches the current page, cancelling any running request. Used
    /// after a local change that the next poll must not be allowed to miss.
    pub async fn reload(&self) -> RefreshOutcome {
        let ticket = self.shared.begin(true, |_| {});
        self.drive(ticket).await
    }

    /// Moves to `page`, clamped to the known page range.
    pub async fn set_page(&self, page: u64) -> RefreshOutcome {
        let ticket = self.shared.begin(true, |p| p.page = p.clamp_page(page));
        self.drive(ticket).await
    }

    /// Changes the page size and returns to page 1.
    pub async fn set_limit(&self, limit: u32) -> Result<RefreshOutcome, PaginationError> {
        let limit = self.shared.limits.check(limit)?;
        let ticket = self.shared.begin(true, |p| {
            p.limit = limit;
            p.page = 1;
        });
        Ok(self.drive(ticket).await)
    }

    pub async fn first_page(&self) -> RefreshOutcome {
        self.set_page(1).await
    }

    pub async fn prev_page(&self) -> RefreshOutcome {
        let page = self.shared.pagination().page.saturating_sub(1);
        self.set_page(page).await
    }

    pub async fn next_page(&self) -> RefreshOutcome {
        let page = self.shared.pagination().page.saturating_add(1);
        self.set_page(page).await
    }

    pub async fn last_page(&self) -> RefreshOutcome {
        let page = self.shared.pagination().last_page();
        self.set_page(page).await
    }

    /// Stops polling and cancels any running request. Nothing is applied
    /// afterwards.
    pub async fn shutdown(&self) {
        self.shared.closed.cancel();
        let handle = self.ticker_handle.lock().ok().and_then(|mut h| h.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(scope = %self.scope(), "list ticker ended abnormally: {e}");
            }
        }
    }

    /// Runs the request on its own task so a caller giving up on the result
    /// cannot leave the in-flight slot occupied.
    async fn drive(&self, ticket: Option<Ticket>) -> RefreshOutcome {
        let Some(ticket) = ticket else {
            return RefreshOutcome::Skipped;
        };
        let shared = self.shared.clone();
        match tokio::spawn(async move { shared.fetch(ticket).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(scope = %self.scope(), "list fetch task failed: {e}");
                RefreshOutcome::Superseded
            }
        }
    }
}

impl<T> Drop for ListSync<T> {
    fn drop(&mut self) {
        self.shared.closed.cancel();
    }
}

impl<T> Shared<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn pagination(&self) -> PaginationState {
        self.lock().pagination
    }

    /// Claims the in-flight slot. With `supersede` a running request is
    /// cancelled first; without it a running request makes this a no-op.
    fn begin(
        &self,
        supersede: bool,
        update: impl FnOnce(&mut PaginationState),
    ) -> Option<Ticket> {
        if self.closed.is_cancelled() {
            return None;
        }
        let mut core = self.lock();
        if let Some(running) = core.in_flight.as_ref() {
            if !supersede {
                trace!(scope = %self.fetcher.scope(), "request in flight, skipping refresh");
                return None;
            }
            debug!(
                scope = %self.fetcher.scope(),
                generation = running.generation,
                "superseding list request"
            );
            running.cancel.cancel();
        }

        update(&mut core.pagination);
        core.generation += 1;
        let ticket = Ticket {
            generation: core.generation,
            query: core.pagination.query(),
            cancel: self.closed.child_token(),
        };
        core.in_flight = Some(InFlight {
            generation: ticket.generation,
            cancel: ticket.cancel.clone(),
        });

        let pagination = core.pagination;
        self.snapshot_tx.send_modify(|s| {
            s.pagination = pagination;
            s.loading = true;
        });
        Some(ticket)
    }

    async fn fetch(&self, ticket: Ticket) -> RefreshOutcome {
        let result = tokio::select! {
            biased;
            _ = ticket.cancel.cancelled() => return RefreshOutcome::Superseded,
            result = self.fetcher.fetch_page(ticket.query) => result,
        };
        self.finish(ticket.generation, result)
    }

    fn finish(&self, generation: u64, result: Result<Page<T>, RemoteError>) -> RefreshOutcome {
        let mut core = self.lock();
        let current = core
            .in_flight
            .as_ref()
            .is_some_and(|f| f.generation == generation);
        if !current || self.closed.is_cancelled() {
            return RefreshOutcome::Superseded;
        }
        core.in_flight = None;

        match result {
            Ok(page) => {
                core.pagination.total = page.total;
                let pagination = core.pagination;
                self.snapshot_tx.send_modify(|s| {
                    s.items = page.items;
                    s.pagination = pagination;
                    s.loading = false;
                    s.error = None;
                });
                RefreshOutcome::Applied
            }
            Err(e) => {
                warn!(
                    scope = %self.fetcher.scope(),
                    transient = e.is_transient(),
                    "list fetch failed: {e}"
                );
                self.snapshot_tx.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(e.clone());
                });
                RefreshOutcome::Failed(e)
            }
        }
    }

    async fn poll(self: Arc<Self>, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = self.closed.cancelled() => break,
                _ = ticker.tick() => {
                    if let Some(ticket) = self.begin(false, |_| {}) {
                        self.fetch(ticket).await;
                    }
                }
            }
        }
        debug!(scope = %self.fetcher.scope(), "list ticker stopped");
    }
}
