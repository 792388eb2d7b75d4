//! Database status monitor
//!
//! Client-side view of the server's database connectivity: caches the
//! `/api/db-status` document, fans status changes out to subscribers and
//! optionally polls in the background. Fetch failures never surface as
//! errors; they become a synthetic `error` status so subscribers always
//! receive a structurally complete document.

use parking_lot::Mutex;
use shared::DbStatus;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Maximum age of a cached status document
pub const MAX_CACHE_AGE: Duration = Duration::from_secs(30);

type Listener = Arc<dyn Fn(&DbStatus) + Send + Sync>;

#[derive(Default)]
struct CachedStatus {
    value: Option<DbStatus>,
    fetched_at: Option<Instant>,
}

/// Database status monitor
///
/// Cheap to share via `Arc`; all state is interior.
pub struct DatabaseMonitor {
    http: reqwest::Client,
    base_url: String,
    cache: Mutex<CachedStatus>,
    listeners: Arc<Mutex<Vec<(u64, Listener)>>>,
    next_listener_id: AtomicU64,
}

impl DatabaseMonitor {
    /// Create a monitor for the given server base URL
    pub fn new(base_url: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            cache: Mutex::new(CachedStatus::default()),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener_id: AtomicU64::new(0),
        })
    }

    /// Check whether the database is connected
    pub async fn is_database_connected(&self, force_refresh: bool) -> bool {
        self.get_database_status(force_refresh).await.connected
    }

    /// Get the database status document
    ///
    /// Serves from cache when fresh unless `force_refresh` is set.
    /// Never fails: fetch errors produce a synthetic error status,
    /// which is cached and fanned out like any other result.
    pub async fn get_database_status(&self, force_refresh: bool) -> DbStatus {
        if !force_refresh {
            let cache = self.cache.lock();
            if let (Some(value), Some(fetched_at)) = (&cache.value, cache.fetched_at)
                && fetched_at.elapsed() < MAX_CACHE_AGE
            {
                return value.clone();
            }
        }

        let status = match self.fetch_status().await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("Failed to fetch database status: {}", e);
                DbStatus::error(e.to_string())
            }
        };

        {
            let mut cache = self.cache.lock();
            cache.value = Some(status.clone());
            cache.fetched_at = Some(Instant::now());
        }

        self.notify(&status);
        status
    }

    async fn fetch_status(&self) -> Result<DbStatus, reqwest::Error> {
        let url = format!("{}/api/db-status", self.base_url.trim_end_matches('/'));
        self.http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// Subscribe to status changes
    ///
    /// The listener is invoked on every fetched status (including
    /// synthetic error statuses). Returns a subscription handle whose
    /// [`unsubscribe`](StatusSubscription::unsubscribe) removes it.
    pub fn subscribe_to_status_changes(
        &self,
        listener: impl Fn(&DbStatus) + Send + Sync + 'static,
    ) -> StatusSubscription {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().push((id, Arc::new(listener)));
        StatusSubscription {
            id,
            listeners: Arc::clone(&self.listeners),
        }
    }

    /// Fan a status out to all listeners
    ///
    /// A panicking listener must not take down the others or the caller.
    fn notify(&self, status: &DbStatus) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(status))).is_err() {
                tracing::error!("Database status listener panicked");
            }
        }
    }

    /// Start polling for status changes in the background
    ///
    /// Each tick forces a refresh; the first fetch happens one interval
    /// after the call. Returns a handle that stops the polling task.
    pub fn start_status_polling(self: &Arc<Self>, interval: Duration) -> PollingHandle {
        let token = CancellationToken::new();
        let monitor = Arc::clone(self);
        let task_token = token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        monitor.get_database_status(true).await;
                    }
                }
            }
        });

        PollingHandle { token }
    }
}

/// Subscription handle returned by [`DatabaseMonitor::subscribe_to_status_changes`]
pub struct StatusSubscription {
    id: u64,
    listeners: Arc<Mutex<Vec<(u64, Listener)>>>,
}

impl StatusSubscription {
    /// Remove the listener (idempotent)
    pub fn unsubscribe(&self) {
        self.listeners.lock().retain(|(id, _)| *id != self.id);
    }
}

/// Handle for a background polling task
pub struct PollingHandle {
    token: CancellationToken,
}

impl PollingHandle {
    /// Stop the polling task
    pub fn stop(&self) {
        self.token.cancel();
    }
}
