//! The navigation bridge: a late-bound navigator with a redirect fallback.

use std::sync::{Arc, OnceLock};

use crate::{Location, NavigationError, Navigator, Route};

/// How a [`NavigationBridge::navigate`] call was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The registered router handled it.
    Routed,
    /// The fallback performed a full-page redirect.
    FullPageRedirect,
}

/// Late-bound access to the router for code that lives outside it.
///
/// ```text
///  navigate(route)
///       │
///       ├── navigator registered? ──no──→ Location::assign(route)
///       │          │yes
///       │          ▼
///       │   Navigator::navigate ──err──→ Location::assign(route)
///       │          │ok
///       ▼          ▼
///              [Routed]
/// ```
///
/// The navigator slot is written once per app lifetime (when the router
/// mounts). Every caller gets a redirect regardless of whether that has
/// happened yet.
pub struct NavigationBridge {
    navigator: OnceLock<Arc<dyn Navigator>>,
    fallback: Arc<dyn Location>,
}

impl NavigationBridge {
    /// Creates a bridge with no navigator registered yet.
    pub fn new(fallback: Arc<dyn Location>) -> Self {
        Self {
            navigator: OnceLock::new(),
            fallback,
        }
    }

    /// Registers the router's navigator.
    ///
    /// # Errors
    /// Returns [`NavigationError::AlreadyRegistered`] if a navigator is
    /// already in place. The first registration is kept.
    pub fn register(
        &self,
        navigator: Arc<dyn Navigator>,
    ) -> Result<(), NavigationError> {
        self.navigator
            .set(navigator)
            .map_err(|_| NavigationError::AlreadyRegistered)?;
        tracing::info!("router navigator registered");
        Ok(())
    }

    /// Returns `true` once a navigator has been registered.
    pub fn is_registered(&self) -> bool {
        self.navigator.get().is_some()
    }

    /// Sends the user to `route`. Never fails.
    pub fn navigate(&self, route: &Route) -> NavigationOutcome {
        let Some(navigator) = self.navigator.get() else {
            tracing::debug!(%route, "no navigator registered, full-page redirect");
            self.fallback.assign(route.as_str());
            return NavigationOutcome::FullPageRedirect;
        };

        match navigator.navigate(route) {
            Ok(()) => {
                tracing::debug!(%route, "navigated");
                NavigationOutcome::Routed
            }
            Err(e) => {
                tracing::warn!(%route, error = %e, "navigation failed, full-page redirect");
                self.fallback.assign(route.as_str());
                NavigationOutcome::FullPageRedirect
            }
        }
    }

    /// Skips the router and redirects the whole page.
    pub fn hard_redirect(&self, route: &Route) {
        self.fallback.assign(route.as_str());
    }
}

impl std::fmt::Debug for NavigationBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationBridge")
            .field("registered", &self.is_registered())
            .finish()
    }
}
