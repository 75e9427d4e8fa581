//! Single-flight credential refresh.
//!
//! [`RefreshCoordinator`] wraps authenticated operations. When an operation
//! is rejected for authentication, the coordinator refreshes the credential
//! and retries the operation once. Any number of callers that are rejected
//! while a refresh is running attach to that refresh instead of starting
//! their own, so the refresh endpoint is called once per burst.
//!
//! # Example
//!
//! ```rust,ignore
//! let coordinator = RefreshCoordinator::new(store, session);
//! let inbox = coordinator.run(|| client.get::<Inbox>("/letter/inbox")).await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::store::CredentialStore;
use crate::token::{Credential, RefreshError, Refresher};

/// Interval used by [`RefreshCoordinator::spawn_refresh_ticker`] callers that
/// have no configured value.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Classifies errors that mean "the credential was not accepted".
///
/// Only these errors trigger a refresh. Everything else is returned to the
/// caller unchanged.
pub trait AuthFailure {
    fn is_auth_failure(&self) -> bool;
}

type SharedRefresh = Shared<BoxFuture<'static, Result<Credential, RefreshError>>>;

struct InFlight {
    generation: u64,
    refresh: SharedRefresh,
}

#[derive(Default)]
struct RefreshState {
    in_flight: Option<InFlight>,
    generation: u64,
}

/// Deduplicates credential refreshes and retries rejected operations once.
///
/// Each coordinator owns its own state; create one per session.
pub struct RefreshCoordinator {
    store: Arc<dyn CredentialStore>,
    refresher: Arc<dyn Refresher>,
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new(store: Arc<dyn CredentialStore>, refresher: Arc<dyn Refresher>) -> Self {
        Self {
            store,
            refresher,
            state: Mutex::new(RefreshState::default()),
        }
    }

    /// The credential store this coordinator writes to.
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Whether a refresh is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        self.state.lock().in_flight.is_some()
    }

    /// Run `operation`, refreshing the credential and retrying once if it is
    /// rejected for authentication.
    ///
    /// - Success on the first attempt returns without touching the refresher.
    /// - A non-auth error is returned unchanged.
    /// - After a successful refresh the operation is retried exactly once and
    ///   that result is returned as is, even if it is another auth failure.
    /// - If the refresh fails, the store is cleared and the refresh error is
    ///   returned converted into `E`.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: AuthFailure + From<RefreshError>,
    {
        match operation().await {
            Err(err) if err.is_auth_failure() => {
                tracing::debug!("Credential rejected, refreshing before retry");
                self.refresh_now().await?;
                operation().await
            }
            outcome => outcome,
        }
    }

    /// Refresh the credential now, joining a refresh that is already running.
    pub async fn refresh_now(&self) -> Result<Credential, RefreshError> {
        let (generation, refresh) = self.join_or_start();
        let outcome = refresh.await;
        self.settle(generation);
        outcome
    }

    /// Refresh on a fixed period while a credential is present.
    ///
    /// The first refresh happens one full `period` after the call. Failures
    /// are logged; after a failed refresh the store is empty and the ticker
    /// idles until someone signs in again.
    pub fn spawn_refresh_ticker(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;

            loop {
                interval.tick().await;
                if !coordinator.store.is_authenticated() {
                    tracing::trace!("No credential, skipping scheduled refresh");
                    continue;
                }
                if let Err(e) = coordinator.refresh_now().await {
                    tracing::warn!("Scheduled credential refresh failed: {}", e);
                }
            }
        })
    }

    fn join_or_start(&self) -> (u64, SharedRefresh) {
        let mut state = self.state.lock();

        if let Some(in_flight) = &state.in_flight {
            tracing::debug!(generation = in_flight.generation, "Joining in-flight refresh");
            return (in_flight.generation, in_flight.refresh.clone());
        }

        state.generation += 1;
        let generation = state.generation;
        let store = Arc::clone(&self.store);
        let refresher = Arc::clone(&self.refresher);

        let refresh = async move {
            tracing::info!(generation, "Refreshing credential");
            match refresher.refresh().await {
                Ok(credential) => {
                    store.set(Some(credential.clone()));
                    tracing::info!(generation, "Credential refreshed");
                    Ok(credential)
                }
                Err(e) => {
                    store.clear();
                    tracing::error!(generation, "Credential refresh failed: {}", e);
                    Err(e)
                }
            }
        }
        .boxed()
        .shared();

        state.in_flight = Some(InFlight {
            generation,
            refresh: refresh.clone(),
        });
        (generation, refresh)
    }

    /// Release the slot once its refresh has settled. A newer refresh that
    /// replaced it is left alone.
    fn settle(&self, generation: u64) {
        let mut state = self.state.lock();
        if state
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.generation == generation)
        {
            state.in_flight = None;
        }
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &state.in_flight.is_some())
            .field("generation", &state.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCredentialStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticRefresher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Refresher for StaticRefresher {
        async fn refresh(&self) -> Result<Credential, RefreshError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Credential::bearer("fresh"))
        }
    }

    #[derive(Debug, PartialEq)]
    enum TestError {
        Unauthorized,
        Refresh(RefreshError),
    }

    impl AuthFailure for TestError {
        fn is_auth_failure(&self) -> bool {
            matches!(self, Self::Unauthorized)
        }
    }

    impl From<RefreshError> for TestError {
        fn from(e: RefreshError) -> Self {
            Self::Refresh(e)
        }
    }

    #[tokio::test]
    async fn test_slot_released_after_refresh() {
        let store = Arc::new(MemoryCredentialStore::new());
        let refresher = Arc::new(StaticRefresher {
            calls: AtomicUsize::new(0),
        });
        let coordinator = RefreshCoordinator::new(store.clone(), refresher.clone());

        let credential = coordinator.refresh_now().await.unwrap();
        assert_eq!(credential.access_token.expose(), "fresh");
        assert!(!coordinator.is_refreshing());
        assert!(store.is_authenticated());

        coordinator.refresh_now().await.unwrap();
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_retries_once_after_refresh() {
        let store = Arc::new(MemoryCredentialStore::new());
        let refresher = Arc::new(StaticRefresher {
            calls: AtomicUsize::new(0),
        });
        let coordinator = RefreshCoordinator::new(store.clone(), refresher.clone());

        let result: Result<&str, TestError> = coordinator
            .run(|| {
                let store = store.clone();
                async move {
                    match store.get() {
                        Some(c) if c.access_token.expose() == "fresh" => Ok("inbox"),
                        _ => Err(TestError::Unauthorized),
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("inbox"));
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    }
}
