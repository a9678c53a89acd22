//! `SessionRuntime` builder and session lifecycle.
//!
//! The runtime ties the layers together: it owns the navigation bridge the
//! router registers with, the shared API client, the session clearer, and
//! the idle monitor for the current session.
//!
//! ```text
//!   identity provider ── on_authentication_changed(true) ──→ interceptor + idle monitor
//!                     ── on_authentication_changed(false) ─→ both torn down
//!
//!   idle monitor ─ countdown expired ─→ SessionTerminator ─→ clear → provider logout → /login
//!   logout()     ──────────────────────→ SessionTerminator ─→ clear → provider logout → /
//!   interceptor  ─ token refresh failed ─→ SessionReleaser ─→ monitor + interceptor torn down
//! ```
//!
//! Whichever path ends the session, the runtime is left with no running
//! monitor and no installed interceptor, ready for the next login.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use buildport_http::{
    ApiClient, ForcedLogoutListener, IdentityProvider, InterceptorSlot, LogoutOptions,
};
use buildport_idle::{IdleMonitor, IdleMonitorHandle, LogoutHook, LogoutReason};
use buildport_nav::{Location, NavigationBridge, Navigator, Route};
use buildport_storage::{MemoryStorage, Role, RoleCache, SessionClearer, StorageArea};
use futures_util::future::BoxFuture;

use crate::{BuildportError, PortalConfig};

/// Ends a session: purges storage, logs out at the provider, then leaves
/// the authenticated part of the app.
///
/// Idle expiry lands on the login route with the configured provider
/// return target; an explicit logout lands on the home route.
pub struct SessionTerminator<I: IdentityProvider> {
    identity: Arc<I>,
    clearer: SessionClearer,
    navigation: Arc<NavigationBridge>,
    home: Route,
    login: Route,
    login_return_to: String,
    session: Weak<RuntimeInner<I>>,
}

impl<I: IdentityProvider> Clone for SessionTerminator<I> {
    fn clone(&self) -> Self {
        Self {
            identity: Arc::clone(&self.identity),
            clearer: self.clearer.clone(),
            navigation: Arc::clone(&self.navigation),
            home: self.home.clone(),
            login: self.login.clone(),
            login_return_to: self.login_return_to.clone(),
            session: Weak::clone(&self.session),
        }
    }
}

impl<I: IdentityProvider> SessionTerminator<I> {
    /// Runs the logout sequence. Never fails; each step that goes wrong is
    /// logged and the next one still runs.
    pub async fn terminate(&self, reason: LogoutReason) {
        let (route, return_to) = match reason {
            LogoutReason::IdleExpired => (&self.login, self.login_return_to.clone()),
            LogoutReason::UserRequested => (&self.home, self.home.to_string()),
        };

        self.clearer.clear();

        if let Err(e) = self
            .identity
            .logout(LogoutOptions::return_to(return_to))
            .await
        {
            tracing::warn!(error = %e, %reason, "identity provider logout failed");
        }

        let outcome = self.navigation.navigate(route);
        tracing::info!(%reason, %route, ?outcome, "session ended");
    }
}

impl<I: IdentityProvider> LogoutHook for SessionTerminator<I> {
    async fn on_logout(&self, reason: LogoutReason) {
        if let Some(session) = self.session.upgrade() {
            session.release_terminated_monitor();
        }
        self.terminate(reason).await;
    }
}

/// Tears the session layer down after an interceptor forced a logout.
struct SessionReleaser<I: IdentityProvider> {
    session: Weak<RuntimeInner<I>>,
}

impl<I: IdentityProvider> ForcedLogoutListener for SessionReleaser<I> {
    fn forced_logout(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let Some(session) = self.session.upgrade() else {
                return;
            };
            session.stop_idle_monitor().await;
            session.interceptor.sync(false);
            tracing::info!("session released after forced logout");
        })
    }
}

/// Builder for a [`SessionRuntime`].
///
/// # Example
///
/// ```rust,ignore
/// let runtime = SessionRuntimeBuilder::new()
///     .config(PortalConfig::from_env()?)
///     .location(browser_location)
///     .persistent(Arc::new(JsonFileStorage::open("session.json")?))
///     .build(identity)?;
///
/// runtime.register_router(router)?;
/// runtime.on_authentication_changed(true, "?tab=jobs").await;
/// ```
#[derive(Default)]
pub struct SessionRuntimeBuilder {
    config: Option<PortalConfig>,
    location: Option<Arc<dyn Location>>,
    short_lived: Option<Arc<dyn StorageArea>>,
    persistent: Option<Arc<dyn StorageArea>>,
}

impl SessionRuntimeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults to [`PortalConfig::default`].
    pub fn config(mut self, config: PortalConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// The full-page redirect used before a router registers. Required.
    pub fn location(mut self, location: Arc<dyn Location>) -> Self {
        self.location = Some(location);
        self
    }

    /// Per-tab storage. Defaults to an in-memory area.
    pub fn short_lived(mut self, area: Arc<dyn StorageArea>) -> Self {
        self.short_lived = Some(area);
        self
    }

    /// Storage that survives restarts. Defaults to an in-memory area.
    pub fn persistent(mut self, area: Arc<dyn StorageArea>) -> Self {
        self.persistent = Some(area);
        self
    }

    /// Wires everything up around `identity`.
    ///
    /// # Errors
    /// [`BuildportError::Config`] when no location was given, or
    /// [`BuildportError::Api`] when the API base URL is invalid.
    pub fn build<I: IdentityProvider>(
        self,
        identity: Arc<I>,
    ) -> Result<SessionRuntime<I>, BuildportError> {
        let config = self.config.unwrap_or_default();
        let location = self
            .location
            .ok_or_else(|| BuildportError::Config("a fallback location is required".into()))?;
        let short_lived = self
            .short_lived
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        let persistent = self
            .persistent
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));

        let navigation = Arc::new(NavigationBridge::new(location));
        let client = ApiClient::builder()
            .base_url(config.api_base_url.as_str())
            .navigation(Arc::clone(&navigation))
            .error_route(config.routes.error())
            .build()?;

        let clearer = SessionClearer::new(short_lived, Arc::clone(&persistent))
            .with_credential_cache(Arc::new(client.clone()));

        let inner = Arc::new_cyclic(|session: &Weak<RuntimeInner<I>>| {
            let releaser = SessionReleaser {
                session: Weak::clone(session),
            };
            let interceptor = InterceptorSlot::new(
                client.clone(),
                Arc::clone(&identity),
                clearer.clone(),
                config.logout_return_to.as_str(),
            )
            .with_forced_logout_listener(Arc::new(releaser));
            let terminator = SessionTerminator {
                identity: Arc::clone(&identity),
                clearer: clearer.clone(),
                navigation: Arc::clone(&navigation),
                home: config.routes.home(),
                login: config.routes.login(),
                login_return_to: config.logout_return_to.clone(),
                session: Weak::clone(session),
            };

            RuntimeInner {
                roles: RoleCache::new(persistent),
                config,
                identity,
                navigation,
                client,
                clearer,
                interceptor,
                terminator,
                idle: Mutex::new(None),
            }
        });

        Ok(SessionRuntime { inner })
    }
}

struct RuntimeInner<I: IdentityProvider> {
    config: PortalConfig,
    identity: Arc<I>,
    navigation: Arc<NavigationBridge>,
    client: ApiClient,
    clearer: SessionClearer,
    interceptor: InterceptorSlot<I>,
    terminator: SessionTerminator<I>,
    roles: RoleCache,
    idle: Mutex<Option<IdleMonitorHandle>>,
}

impl<I: IdentityProvider> RuntimeInner<I> {
    fn idle_slot(&self) -> MutexGuard<'_, Option<IdleMonitorHandle>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn stop_idle_monitor(&self) {
        let handle = self.idle_slot().take();
        if let Some(handle) = handle {
            if handle.dispose().await.is_err() {
                tracing::debug!("idle monitor had already stopped");
            }
        }
    }

    /// Called from the monitor's own logout hook, so the monitor is only
    /// dropped from the slot, never disposed.
    fn release_terminated_monitor(&self) {
        {
            let mut slot = self.idle_slot();
            if slot.as_ref().is_some_and(|handle| !handle.is_running()) {
                slot.take();
            }
        }
        self.interceptor.sync(false);
    }
}

/// The session layer of one running portal. Cheap to clone.
pub struct SessionRuntime<I: IdentityProvider> {
    inner: Arc<RuntimeInner<I>>,
}

impl<I: IdentityProvider> Clone for SessionRuntime<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I: IdentityProvider> SessionRuntime<I> {
    pub fn config(&self) -> &PortalConfig {
        &self.inner.config
    }

    pub fn identity(&self) -> &Arc<I> {
        &self.inner.identity
    }

    /// The shared backend client.
    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    pub fn navigation(&self) -> &Arc<NavigationBridge> {
        &self.inner.navigation
    }

    pub fn clearer(&self) -> &SessionClearer {
        &self.inner.clearer
    }

    /// Hands the router's navigator to the bridge. Call once when the
    /// router mounts.
    pub fn register_router(&self, navigator: Arc<dyn Navigator>) -> Result<(), BuildportError> {
        self.inner.navigation.register(navigator)?;
        Ok(())
    }

    /// Feeds the provider's authentication state into the session layer.
    ///
    /// A `false → true` flip installs the token interceptor and starts an
    /// idle monitor; repeated `true` observations do nothing. `false` stops
    /// the monitor and removes the interceptor. `query` is the current
    /// page's query string, checked for `forceIdle=true`.
    ///
    /// Returns `true` if this call started a session.
    pub async fn on_authentication_changed(&self, is_authenticated: bool, query: &str) -> bool {
        let started = self.inner.interceptor.sync(is_authenticated);
        if started {
            self.start_idle_monitor(query);
        } else if !is_authenticated {
            self.inner.stop_idle_monitor().await;
        }
        started
    }

    /// Whether a session is currently being tracked.
    pub fn is_session_active(&self) -> bool {
        self.inner.interceptor.is_installed()
    }

    /// The running idle monitor, for rendering the warning modal.
    pub fn idle(&self) -> Option<IdleMonitorHandle> {
        self.inner.idle_slot().clone()
    }

    /// Explicit logout. Stops the idle monitor, then runs the logout
    /// sequence towards the home route.
    pub async fn logout(&self) {
        self.inner.stop_idle_monitor().await;
        self.inner.interceptor.sync(false);
        self.inner
            .terminator
            .terminate(LogoutReason::UserRequested)
            .await;
    }

    /// The user's cached role, if any.
    pub fn role(&self) -> Result<Option<Role>, BuildportError> {
        Ok(self.inner.roles.get()?)
    }

    pub fn set_role(&self, role: Role) -> Result<(), BuildportError> {
        self.inner.roles.set(role)?;
        Ok(())
    }

    fn start_idle_monitor(&self, query: &str) {
        let config = self.inner.config.idle_config(query);
        let handle = IdleMonitor::start(config, self.inner.terminator.clone());
        // A leftover handle belongs to a monitor that already terminated.
        self.inner.idle_slot().replace(handle);
    }
}

impl<I: IdentityProvider> std::fmt::Debug for SessionRuntime<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRuntime")
            .field("config", &self.inner.config)
            .field("session_active", &self.is_session_active())
            .finish_non_exhaustive()
    }
}
