//! In-process navigator and location.
//!
//! Hosts without a browser (CLI shells, headless test harnesses) record
//! where the user was sent instead of actually moving a window.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::{Location, NavigationError, Navigator, Route};

/// A [`Location`] that records every full-page redirect.
#[derive(Debug, Default)]
pub struct MemoryLocation {
    history: Mutex<Vec<String>>,
}

impl MemoryLocation {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent redirect target, if any.
    pub fn current(&self) -> Option<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Every redirect so far, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Location for MemoryLocation {
    fn assign(&self, href: &str) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(href.to_string());
    }
}

/// A [`Navigator`] that records routes and can be told to refuse them.
#[derive(Debug, Default)]
pub struct MemoryNavigator {
    routes: Mutex<Vec<Route>>,
    blocked: AtomicBool,
}

impl MemoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// While blocked, every navigation returns [`NavigationError::Rejected`].
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// The route the navigator is currently on.
    pub fn current(&self) -> Option<Route> {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Every route navigated to, oldest first.
    pub fn history(&self) -> Vec<Route> {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for MemoryNavigator {
    fn navigate(&self, route: &Route) -> Result<(), NavigationError> {
        if self.blocked.load(Ordering::SeqCst) {
            return Err(NavigationError::Rejected {
                route: route.to_string(),
                reason: "navigation blocked".into(),
            });
        }
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_location_records_history_in_order() {
        let location = MemoryLocation::new();
        location.assign("/");
        location.assign("/login");

        assert_eq!(location.history(), vec!["/", "/login"]);
        assert_eq!(location.current().as_deref(), Some("/login"));
    }

    #[test]
    fn test_memory_navigator_blocked_returns_rejected() {
        let nav = MemoryNavigator::new();
        nav.set_blocked(true);

        let result = nav.navigate(&Route::new("/error"));

        assert!(matches!(result, Err(NavigationError::Rejected { .. })));
        assert!(nav.history().is_empty());
    }
}
