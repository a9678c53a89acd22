//! The token refresh interceptor and the slot that installs it.
//!
//! ```text
//!  request ──→ TokenInterceptor::authorize()
//!                  │
//!                  ├── access_token() ok ──→ "Bearer <token>" ──→ send
//!                  │
//!                  └── access_token() err
//!                          │
//!                          ▼
//!                   SessionClearer::clear()
//!                          │
//!                          ▼
//!                   IdentityProvider::logout(return_to)
//!                          │
//!                          ▼
//!                   ForcedLogoutListener::forced_logout()
//!                          │
//!                          ▼
//!                   Err(Unauthenticated)  (request never sent)
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use buildport_storage::SessionClearer;
use futures_util::future::BoxFuture;
use reqwest::header::HeaderValue;

use crate::{ApiClient, ApiError, IdentityProvider, LogoutOptions, RequestAuthorizer};

/// Told when an interceptor has forced a logout, so whatever else tracks
/// the session (idle monitor, installed interceptor) can be torn down.
pub trait ForcedLogoutListener: Send + Sync {
    fn forced_logout(&self) -> BoxFuture<'_, ()>;
}

/// Attaches a fresh bearer token to every request and forces a clean
/// logout when the identity provider can no longer renew the session.
pub struct TokenInterceptor<I: IdentityProvider> {
    identity: Arc<I>,
    clearer: SessionClearer,
    return_to: String,
    listener: Option<Arc<dyn ForcedLogoutListener>>,
    /// Set once the forced logout has run; later failures short-circuit.
    logged_out: AtomicBool,
}

impl<I: IdentityProvider> TokenInterceptor<I> {
    /// `return_to` is the fixed post-logout target handed to the provider.
    pub fn new(identity: Arc<I>, clearer: SessionClearer, return_to: impl Into<String>) -> Self {
        Self {
            identity,
            clearer,
            return_to: return_to.into(),
            listener: None,
            logged_out: AtomicBool::new(false),
        }
    }

    /// Notifies `listener` after the forced logout has run.
    pub fn with_listener(mut self, listener: Arc<dyn ForcedLogoutListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Whether this interceptor has already forced a logout.
    pub fn has_logged_out(&self) -> bool {
        self.logged_out.load(Ordering::SeqCst)
    }

    async fn force_logout(&self) {
        if self.logged_out.swap(true, Ordering::SeqCst) {
            return;
        }

        // `clear` reports storage failures instead of returning them, so
        // the provider logout below always runs.
        let report = self.clearer.clear();
        tracing::debug!(removed = report.removed.len(), "session cleared before forced logout");

        if let Err(e) = self
            .identity
            .logout(LogoutOptions::return_to(self.return_to.clone()))
            .await
        {
            tracing::warn!(error = %e, "identity provider logout failed");
        }

        if let Some(listener) = &self.listener {
            listener.forced_logout().await;
        }
    }
}

impl<I: IdentityProvider> RequestAuthorizer for TokenInterceptor<I> {
    fn authorize(&self) -> BoxFuture<'_, Result<HeaderValue, ApiError>> {
        Box::pin(async move {
            if self.has_logged_out() {
                return Err(ApiError::Unauthenticated);
            }

            match self.identity.access_token().await {
                Ok(token) => HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|e| ApiError::Configuration(format!("access token: {e}"))),
                Err(e) => {
                    tracing::warn!(error = %e, "silent token refresh failed, forcing logout");
                    self.force_logout().await;
                    Err(ApiError::Unauthenticated)
                }
            }
        })
    }
}

/// Installs a [`TokenInterceptor`] on the client exactly once per
/// authenticated session.
///
/// Feed it every observed authentication state with [`sync`](Self::sync).
/// Only a `false → true` flip installs; repeated `true` observations are
/// ignored, and `true → false` removes the interceptor.
pub struct InterceptorSlot<I: IdentityProvider> {
    client: ApiClient,
    identity: Arc<I>,
    clearer: SessionClearer,
    return_to: String,
    listener: Option<Arc<dyn ForcedLogoutListener>>,
    authenticated: Mutex<bool>,
    installs: AtomicU64,
}

impl<I: IdentityProvider> InterceptorSlot<I> {
    pub fn new(
        client: ApiClient,
        identity: Arc<I>,
        clearer: SessionClearer,
        return_to: impl Into<String>,
    ) -> Self {
        Self {
            client,
            identity,
            clearer,
            return_to: return_to.into(),
            listener: None,
            authenticated: Mutex::new(false),
            installs: AtomicU64::new(0),
        }
    }

    /// Every interceptor installed from now on reports its forced logout
    /// to `listener`.
    pub fn with_forced_logout_listener(mut self, listener: Arc<dyn ForcedLogoutListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Reconciles the client with the current authentication state.
    /// Returns `true` if an interceptor was installed by this call.
    pub fn sync(&self, is_authenticated: bool) -> bool {
        let mut authenticated = self.authenticated.lock().unwrap_or_else(PoisonError::into_inner);

        match (*authenticated, is_authenticated) {
            (false, true) => {
                let mut interceptor = TokenInterceptor::new(
                    Arc::clone(&self.identity),
                    self.clearer.clone(),
                    self.return_to.clone(),
                );
                if let Some(listener) = &self.listener {
                    interceptor = interceptor.with_listener(Arc::clone(listener));
                }
                self.client.install_authorizer(Arc::new(interceptor));
                *authenticated = true;
                let installs = self.installs.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::info!(installs, "token interceptor installed");
                true
            }
            (true, false) => {
                self.client.remove_authorizer();
                *authenticated = false;
                tracing::info!("token interceptor removed");
                false
            }
            _ => false,
        }
    }

    /// Whether an interceptor is currently installed by this slot.
    pub fn is_installed(&self) -> bool {
        *self
            .authenticated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// How many times an interceptor has been installed.
    pub fn install_count(&self) -> u64 {
        self.installs.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use buildport_nav::{MemoryLocation, NavigationBridge};
    use buildport_storage::{MemoryStorage, StorageArea};

    use super::*;
    use crate::IdentityError;

    /// Returns the configured token, or fails when `token` is `None`.
    struct MockIdentity {
        token: Mutex<Option<String>>,
        logouts: Mutex<Vec<LogoutOptions>>,
        fail_logout: bool,
    }

    impl MockIdentity {
        fn with_token(token: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                token: Mutex::new(token.map(str::to_string)),
                logouts: Mutex::new(Vec::new()),
                fail_logout: false,
            })
        }
    }

    impl IdentityProvider for MockIdentity {
        fn is_authenticated(&self) -> bool {
            self.token.lock().unwrap().is_some()
        }

        async fn access_token(&self) -> Result<String, IdentityError> {
            self.token
                .lock()
                .unwrap()
                .clone()
                .ok_or(IdentityError::LoginRequired)
        }

        async fn logout(&self, options: LogoutOptions) -> Result<(), IdentityError> {
            self.logouts.lock().unwrap().push(options);
            if self.fail_logout {
                Err(IdentityError::Logout("provider unreachable".into()))
            } else {
                Ok(())
            }
        }
    }

    fn clearer() -> (SessionClearer, Arc<MemoryStorage>) {
        let persistent = Arc::new(MemoryStorage::new());
        persistent.set("user", "alice").unwrap();
        persistent.set("auth0.token", "stale").unwrap();
        (
            SessionClearer::new(Arc::new(MemoryStorage::new()), persistent.clone()),
            persistent,
        )
    }

    fn client() -> ApiClient {
        ApiClient::builder()
            .base_url("http://localhost:8080")
            .navigation(Arc::new(NavigationBridge::new(Arc::new(
                MemoryLocation::new(),
            ))))
            .build()
            .unwrap()
    }

    // =====================================================================
    // TokenInterceptor
    // =====================================================================

    #[tokio::test]
    async fn test_authorize_returns_bearer_header() {
        let (clearer, _) = clearer();
        let interceptor =
            TokenInterceptor::new(MockIdentity::with_token(Some("abc")), clearer, "/login");

        let value = interceptor.authorize().await.unwrap();

        assert_eq!(value.to_str().unwrap(), "Bearer abc");
    }

    #[tokio::test]
    async fn test_authorize_failure_clears_session_and_logs_out() {
        let (clearer, persistent) = clearer();
        let identity = MockIdentity::with_token(None);
        let interceptor =
            TokenInterceptor::new(identity.clone(), clearer, "https://portal.example/login");

        let result = interceptor.authorize().await;

        assert!(matches!(result, Err(ApiError::Unauthenticated)));
        assert!(persistent.is_empty(), "session artifacts must be purged");
        assert_eq!(
            identity.logouts.lock().unwrap().as_slice(),
            &[LogoutOptions::return_to("https://portal.example/login")]
        );
    }

    #[tokio::test]
    async fn test_authorize_repeated_failure_logs_out_once() {
        let (clearer, _) = clearer();
        let identity = MockIdentity::with_token(None);
        let interceptor = TokenInterceptor::new(identity.clone(), clearer, "/login");

        let _ = interceptor.authorize().await;
        let second = interceptor.authorize().await;

        assert!(matches!(second, Err(ApiError::Unauthenticated)));
        assert_eq!(identity.logouts.lock().unwrap().len(), 1);
        assert!(interceptor.has_logged_out());
    }

    #[derive(Default)]
    struct CountingListener(AtomicUsize);

    impl ForcedLogoutListener for CountingListener {
        fn forced_logout(&self) -> BoxFuture<'_, ()> {
            Box::pin(async move {
                self.0.fetch_add(1, Ordering::SeqCst);
            })
        }
    }

    #[tokio::test]
    async fn test_authorize_failure_notifies_listener_once() {
        let (clearer, _) = clearer();
        let identity = MockIdentity::with_token(None);
        let listener = Arc::new(CountingListener::default());
        let interceptor = TokenInterceptor::new(identity.clone(), clearer, "/login")
            .with_listener(listener.clone());

        let _ = interceptor.authorize().await;
        let _ = interceptor.authorize().await;

        assert_eq!(listener.0.load(Ordering::SeqCst), 1);
        assert_eq!(identity.logouts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_authorize_success_does_not_notify_listener() {
        let (clearer, _) = clearer();
        let listener = Arc::new(CountingListener::default());
        let interceptor =
            TokenInterceptor::new(MockIdentity::with_token(Some("abc")), clearer, "/login")
                .with_listener(listener.clone());

        interceptor.authorize().await.unwrap();

        assert_eq!(listener.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_authorize_logout_error_is_swallowed() {
        let (clearer, persistent) = clearer();
        let identity = Arc::new(MockIdentity {
            token: Mutex::new(None),
            logouts: Mutex::new(Vec::new()),
            fail_logout: true,
        });
        let interceptor = TokenInterceptor::new(identity.clone(), clearer, "/login");

        let result = interceptor.authorize().await;

        assert!(matches!(result, Err(ApiError::Unauthenticated)));
        assert!(persistent.is_empty());
        assert_eq!(identity.logouts.lock().unwrap().len(), 1);
    }

    // =====================================================================
    // InterceptorSlot
    // =====================================================================

    #[test]
    fn test_sync_installs_only_on_false_to_true_flip() {
        let (clearer, _) = clearer();
        let client = client();
        let slot = InterceptorSlot::new(
            client.clone(),
            MockIdentity::with_token(Some("abc")),
            clearer,
            "/login",
        );

        assert!(!slot.sync(false));
        assert!(slot.sync(true));
        assert!(!slot.sync(true), "re-firing with the same state must not reinstall");
        assert!(!slot.sync(true));

        assert_eq!(slot.install_count(), 1);
        assert!(client.has_authorizer());
    }

    #[test]
    fn test_sync_removes_on_logout_and_reinstalls_on_next_login() {
        let (clearer, _) = clearer();
        let client = client();
        let slot = InterceptorSlot::new(
            client.clone(),
            MockIdentity::with_token(Some("abc")),
            clearer,
            "/login",
        );

        slot.sync(true);
        slot.sync(false);
        assert!(!client.has_authorizer());
        assert!(!slot.is_installed());

        assert!(slot.sync(true));
        assert_eq!(slot.install_count(), 2);
        assert!(client.has_authorizer());
    }

    #[test]
    fn test_sync_concurrent_same_state_installs_once() {
        let (clearer, _) = clearer();
        let slot = Arc::new(InterceptorSlot::new(
            client(),
            MockIdentity::with_token(Some("abc")),
            clearer,
            "/login",
        ));
        let installed = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let slot = Arc::clone(&slot);
                let installed = Arc::clone(&installed);
                std::thread::spawn(move || {
                    if slot.sync(true) {
                        installed.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(installed.load(Ordering::SeqCst), 1);
        assert_eq!(slot.install_count(), 1);
    }

    #[tokio::test]
    async fn test_slot_hands_listener_to_installed_interceptor() {
        let (clearer, _) = clearer();
        let client = client();
        let listener = Arc::new(CountingListener::default());
        let slot =
            InterceptorSlot::new(client.clone(), MockIdentity::with_token(None), clearer, "/login")
                .with_forced_logout_listener(listener.clone());
        slot.sync(true);

        let result: Result<serde_json::Value, _> = client.get("/jobs").await;

        assert!(matches!(result, Err(ApiError::Unauthenticated)));
        assert_eq!(listener.0.load(Ordering::SeqCst), 1);
    }
}
