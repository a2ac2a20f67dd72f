//! Authenticated session state shared across the view tree.
//!
//! [`SessionStore`] is the single authoritative holder of the user's profile
//! and authentication flag. It is constructed explicitly with its
//! collaborators injected (no hidden global) and handed to the view tree as
//! an `Arc`.
//!
//! Expected failures never cross this boundary: consumers read `error` and
//! `authenticated` from the state snapshot rather than catching anything.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use larder_auth::SharedCredentialStore;
use larder_client::{LarderClient, UserInfo, UserInfoPatch};
use parking_lot::RwLock;
use tracing::{debug, warn};

/// Snapshot of the session state.
///
/// Invariant: `user` is present exactly when `authenticated` is true, and
/// `loading` is true only while a profile fetch is in flight.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Authenticated user's profile, if any.
    pub user: Option<UserInfo>,
    /// True only during an in-flight profile fetch.
    pub loading: bool,
    /// Message from the last failed fetch.
    pub error: Option<String>,
    /// Whether a profile fetch has succeeded against a valid token.
    pub authenticated: bool,
}

/// Source of the authenticated user's profile.
///
/// Implemented by [`LarderClient`]; tests inject a mock.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Fetch the profile for the currently persisted token.
    async fn fetch_profile(&self) -> larder_client::Result<UserInfo>;
}

#[async_trait]
impl ProfileSource for LarderClient {
    async fn fetch_profile(&self) -> larder_client::Result<UserInfo> {
        self.profile().get().await
    }
}

/// Single source of truth for authentication/session state.
pub struct SessionStore {
    state: RwLock<SessionState>,
    /// Bumped by every new fetch and by logout. A fetch completion whose
    /// epoch no longer matches is discarded instead of applied, so a logout
    /// issued mid-flight cannot be overwritten by the stale resolution.
    epoch: AtomicU64,
    profile: Arc<dyn ProfileSource>,
    credentials: SharedCredentialStore,
}

impl SessionStore {
    /// Create a store without fetching. Most callers want
    /// [`initialize`](Self::initialize) instead.
    pub fn new(profile: Arc<dyn ProfileSource>, credentials: SharedCredentialStore) -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            epoch: AtomicU64::new(0),
            profile,
            credentials,
        }
    }

    /// Create the store and run the initial profile fetch using any persisted
    /// token. Called once at application start; the returned handle is shared
    /// for the life of the application session.
    pub async fn initialize(
        profile: Arc<dyn ProfileSource>,
        credentials: SharedCredentialStore,
    ) -> Arc<Self> {
        let store = Arc::new(Self::new(profile, credentials));
        store.fetch_user_info().await;
        store
    }

    /// Get a snapshot of the current session state.
    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    /// Whether the session is authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.state.read().authenticated
    }

    /// The current user, if authenticated.
    pub fn user(&self) -> Option<UserInfo> {
        self.state.read().user.clone()
    }

    /// Apply a state change only when `epoch` is still current. The check
    /// and the write happen under one lock, matching the bump in
    /// [`clear_user`](Self::clear_user).
    fn apply_if_current(&self, epoch: u64, f: impl FnOnce(&mut SessionState)) -> bool {
        let mut state = self.state.write();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!("Discarding session update from a superseded fetch");
            return false;
        }
        f(&mut state);
        true
    }

    /// Fetch the user's profile using the persisted token.
    ///
    /// With no persisted token the state resolves to unauthenticated without
    /// a network call. On a 401 the persisted credentials (token and
    /// remember-me flag) are deleted as a side effect. `loading` is reset on
    /// every exit path. A completion arriving after a logout or a newer
    /// fetch is discarded.
    pub async fn fetch_user_info(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        let credentials = match self.credentials.load().await {
            Ok(credentials) => credentials,
            Err(e) => {
                self.apply_if_current(epoch, |state| {
                    state.user = None;
                    state.authenticated = false;
                    state.loading = false;
                    state.error = Some(e.to_string());
                });
                return;
            }
        };

        if credentials.is_none() {
            // Absent token: no fetch attempted.
            self.apply_if_current(epoch, |state| {
                state.user = None;
                state.authenticated = false;
                state.loading = false;
                state.error = None;
            });
            return;
        }

        self.apply_if_current(epoch, |state| state.loading = true);
        let _loading = LoadingGuard { store: self, epoch };

        match self.profile.fetch_profile().await {
            Ok(user) => {
                debug!(username = %user.username, "Profile fetched");
                self.apply_if_current(epoch, |state| {
                    state.user = Some(user);
                    state.authenticated = true;
                    state.error = None;
                });
            }
            Err(e) => {
                let applied = self.apply_if_current(epoch, |state| {
                    state.user = None;
                    state.authenticated = false;
                    state.error = Some(e.to_string());
                });

                if applied && e.is_auth_error() {
                    // Invalid/expired token: drop the persisted credentials
                    // so the next start does not retry them. Skipped for a
                    // superseded fetch, whose token may have been replaced.
                    debug!("Token rejected, clearing persisted credentials");
                    if let Err(clear_err) = self.credentials.clear().await {
                        warn!(error = %clear_err, "Failed to clear rejected credentials");
                    }
                }
            }
        }
    }

    /// Shallow-merge attributes into the current user after a confirmed
    /// mutation. Local only; does not contact the server. No-op when no user
    /// is present.
    pub fn update_user_info(&self, patch: UserInfoPatch) {
        let mut state = self.state.write();
        if let Some(user) = state.user.as_mut() {
            user.apply(patch);
        }
    }

    /// Log out: reset the session and delete the persisted credentials
    /// (token and remember-me flag together). Idempotent. A profile fetch
    /// in flight at this point is orphaned; its completion is discarded.
    pub async fn clear_user(&self) {
        {
            let mut state = self.state.write();
            self.epoch.fetch_add(1, Ordering::SeqCst);
            *state = SessionState::default();
        }

        if let Err(e) = self.credentials.clear().await {
            warn!(error = %e, "Failed to clear credentials on logout");
        }

        debug!("Session cleared");
    }
}

/// Resets `loading` when the fetch scope exits, on every path. A guard from
/// a superseded epoch leaves `loading` alone; a newer fetch owns it now.
struct LoadingGuard<'a> {
    store: &'a SessionStore,
    epoch: u64,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.store
            .apply_if_current(self.epoch, |state| state.loading = false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_auth::{Credentials, CredentialStore, InMemoryCredentialStore};
    use larder_client::Error;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::{Notify, Semaphore};

    fn alice() -> UserInfo {
        serde_json::from_value(serde_json::json!({
            "id": "u1",
            "username": "alice",
            "email": "alice@example.com",
            "role": "user"
        }))
        .unwrap()
    }

    /// Mock profile source returning queued results.
    struct MockProfile {
        results: Mutex<VecDeque<larder_client::Result<UserInfo>>>,
        calls: AtomicU32,
    }

    impl MockProfile {
        fn new(results: Vec<larder_client::Result<UserInfo>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProfileSource for MockProfile {
        async fn fetch_profile(&self) -> larder_client::Result<UserInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results.lock().pop_front().unwrap_or(Err(Error::Api {
                status: 500,
                message: "no queued result".into(),
            }))
        }
    }

    /// Profile source that blocks until released, for observing `loading`.
    /// Release permits accumulate, so releasing before the fetch parks is
    /// not lost.
    struct SlowProfile {
        entered: Notify,
        release: Semaphore,
    }

    impl SlowProfile {
        fn parked() -> Arc<Self> {
            Arc::new(Self {
                entered: Notify::new(),
                release: Semaphore::new(0),
            })
        }

        fn release_one(&self) {
            self.release.add_permits(1);
        }
    }

    #[async_trait]
    impl ProfileSource for SlowProfile {
        async fn fetch_profile(&self) -> larder_client::Result<UserInfo> {
            self.entered.notify_one();
            self.release
                .acquire()
                .await
                .expect("semaphore closed")
                .forget();
            Ok(alice())
        }
    }

    fn store_with_token() -> SharedCredentialStore {
        Arc::new(InMemoryCredentialStore::with_credentials(
            Credentials::new("tok-abc", true),
        ))
    }

    #[tokio::test]
    async fn test_successful_fetch_sets_user_and_flag() {
        let profile = MockProfile::new(vec![Ok(alice())]);
        let session = SessionStore::initialize(profile.clone(), store_with_token()).await;

        let state = session.state();
        assert_eq!(state.user.as_ref().map(|u| u.username.as_str()), Some("alice"));
        assert!(state.authenticated);
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(profile.calls(), 1);
    }

    #[tokio::test]
    async fn test_absent_token_skips_network() {
        let profile = MockProfile::new(vec![Ok(alice())]);
        let credentials: SharedCredentialStore = Arc::new(InMemoryCredentialStore::new());

        let session = SessionStore::initialize(profile.clone(), credentials).await;

        let state = session.state();
        assert!(!state.authenticated);
        assert!(!state.loading);
        assert!(state.user.is_none());
        assert_eq!(profile.calls(), 0);
    }

    #[tokio::test]
    async fn test_401_clears_persisted_credentials() {
        let profile = MockProfile::new(vec![Err(Error::Auth("token expired".into()))]);
        let credentials = Arc::new(InMemoryCredentialStore::with_credentials(
            Credentials::new("stale", true),
        ));

        let session = SessionStore::initialize(profile, credentials.clone()).await;

        let state = session.state();
        assert!(!state.authenticated);
        assert!(state.error.as_deref().unwrap().contains("token expired"));
        // Token and remember-me flag are gone together.
        assert!(!credentials.has_credentials());
    }

    #[tokio::test]
    async fn test_transient_failure_keeps_credentials() {
        let profile = MockProfile::new(vec![Err(Error::Api {
            status: 503,
            message: "unavailable".into(),
        })]);
        let credentials = Arc::new(InMemoryCredentialStore::with_credentials(
            Credentials::new("tok", false),
        ));

        let session = SessionStore::initialize(profile, credentials.clone()).await;

        let state = session.state();
        assert!(!state.authenticated);
        assert!(state.error.is_some());
        assert!(credentials.has_credentials());
    }

    #[tokio::test]
    async fn test_loading_true_only_during_flight() {
        let profile = SlowProfile::parked();
        let session = Arc::new(SessionStore::new(profile.clone(), store_with_token()));

        assert!(!session.state().loading);

        let task = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.fetch_user_info().await })
        };

        profile.entered.notified().await;
        assert!(session.state().loading);

        profile.release_one();
        task.await.unwrap();

        let state = session.state();
        assert!(!state.loading);
        assert!(state.authenticated);
    }

    #[tokio::test]
    async fn test_logout_during_fetch_discards_completion() {
        let profile = SlowProfile::parked();
        let credentials = Arc::new(InMemoryCredentialStore::with_credentials(
            Credentials::new("tok", true),
        ));
        let session = Arc::new(SessionStore::new(profile.clone(), credentials.clone()));

        let task = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.fetch_user_info().await })
        };

        // Log out while the profile fetch is parked mid-flight.
        profile.entered.notified().await;
        session.clear_user().await;
        assert!(!credentials.has_credentials());

        profile.release_one();
        task.await.unwrap();

        // The successful completion must not re-authenticate the session.
        let state = session.state();
        assert!(!state.authenticated);
        assert!(state.user.is_none());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_newer_fetch_wins_over_overlapping_older_fetch() {
        let profile = SlowProfile::parked();
        let session = Arc::new(SessionStore::new(profile.clone(), store_with_token()));

        let slow = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.fetch_user_info().await })
        };
        profile.entered.notified().await;

        // A second fetch starts while the first is still parked. Its parked
        // sibling resolves afterwards and must not reset `loading` or state.
        let fast = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.fetch_user_info().await })
        };
        profile.entered.notified().await;

        profile.release_one();
        profile.release_one();
        fast.await.unwrap();
        slow.await.unwrap();

        let state = session.state();
        assert!(state.authenticated);
        assert!(state.user.is_some());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_clear_user_then_refetch_resolves_unauthenticated() {
        let profile = MockProfile::new(vec![Ok(alice())]);
        let session = SessionStore::initialize(profile.clone(), store_with_token()).await;
        assert!(session.is_authenticated());

        session.clear_user().await;
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());

        // Token is gone, so the refetch must not hit the network.
        session.fetch_user_info().await;
        assert!(!session.is_authenticated());
        assert_eq!(profile.calls(), 1);

        // Idempotent.
        session.clear_user().await;
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_update_user_info_merges_locally() {
        let profile = MockProfile::new(vec![Ok(alice())]);
        let session = SessionStore::initialize(profile.clone(), store_with_token()).await;

        session.update_user_info(UserInfoPatch {
            city: Some("Rotterdam".into()),
            ..Default::default()
        });

        let user = session.user().unwrap();
        assert_eq!(user.city.as_deref(), Some("Rotterdam"));
        assert_eq!(user.username, "alice");
        // Purely local.
        assert_eq!(profile.calls(), 1);
    }

    #[tokio::test]
    async fn test_update_user_info_noop_when_logged_out() {
        let profile = MockProfile::new(vec![]);
        let credentials: SharedCredentialStore = Arc::new(InMemoryCredentialStore::new());
        let session = SessionStore::initialize(profile, credentials).await;

        session.update_user_info(UserInfoPatch {
            city: Some("Rotterdam".into()),
            ..Default::default()
        });

        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn test_refetch_after_auth_failure_recovers() {
        let profile = MockProfile::new(vec![
            Err(Error::Auth("expired".into())),
            Ok(alice()),
        ]);
        let credentials = Arc::new(InMemoryCredentialStore::with_credentials(
            Credentials::new("old", true),
        ));

        let session = SessionStore::initialize(profile.clone(), credentials.clone()).await;
        assert!(!session.is_authenticated());

        // A fresh login writes new credentials; the next fetch succeeds.
        credentials
            .save(&Credentials::new("fresh", true))
            .await
            .unwrap();
        session.fetch_user_info().await;

        assert!(session.is_authenticated());
        assert!(session.state().error.is_none());
        assert_eq!(profile.calls(), 2);
    }
}
