//! Navigation seam for Buildport.
//!
//! Code outside the view tree (the HTTP client's error path, the idle
//! monitor's logout) still needs to send the user somewhere. This crate
//! provides the two capabilities it can ask for:
//!
//! - [`Navigator`]: the router's in-app navigation, registered once the
//!   router is mounted.
//! - [`Location`]: a raw full-page redirect. Always available, never fails.
//!
//! [`NavigationBridge`] ties them together: it routes through the
//! registered navigator when there is one and degrades to the location
//! otherwise, so a redirect can never be lost.

mod bridge;
mod error;
mod memory;

pub use bridge::{NavigationBridge, NavigationOutcome};
pub use error::NavigationError;
pub use memory::{MemoryLocation, MemoryNavigator};

use std::fmt;

/// An in-app path such as `/login` or `/error`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route(String);

impl Route {
    /// Creates a route from any string-like path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Route {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for Route {
    fn from(path: String) -> Self {
        Self(path)
    }
}

/// The router's imperative navigation function.
pub trait Navigator: Send + Sync {
    /// Moves the app to `route` without a page reload.
    ///
    /// # Errors
    /// Returns [`NavigationError::Rejected`] when the router refuses
    /// (blocked transition, unmounted router, etc.).
    fn navigate(&self, route: &Route) -> Result<(), NavigationError>;
}

/// A full-page redirect, the equivalent of setting `window.location.href`.
pub trait Location: Send + Sync {
    /// Replaces the current location with `href`.
    fn assign(&self, href: &str);
}
