//! # Buildport
//!
//! Session lifecycle for the Buildport client portal.
//!
//! Buildport keeps an authenticated portal session honest: it attaches
//! fresh tokens to every backend call, signs the user out cleanly when a
//! token can no longer be renewed, routes server faults to the error page,
//! and ends sessions that have been left idle.
//!
//! The pieces live in their own crates and are re-exported here:
//!
//! - [`buildport_nav`]: the navigation bridge non-UI code redirects through
//! - [`buildport_storage`]: storage areas, the session clearer, role cache
//! - [`buildport_http`]: the API client and token refresh interceptor
//! - [`buildport_idle`]: the idle monitor
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use buildport::prelude::*;
//!
//! buildport::logging::init_tracing("buildport=info")?;
//!
//! let runtime = SessionRuntimeBuilder::new()
//!     .config(PortalConfig::from_env()?)
//!     .location(browser_location)
//!     .build(identity)?;
//! runtime.register_router(router)?;
//!
//! // Whenever the identity provider reports a change:
//! runtime.on_authentication_changed(identity.is_authenticated(), query).await;
//! ```

mod config;
mod error;
pub mod logging;
mod runtime;

pub use buildport_http;
pub use buildport_idle;
pub use buildport_nav;
pub use buildport_storage;

pub use config::{
    IdentityConfig, PortalConfig, RouteConfig, ENV_ALLOW_FORCE_IDLE, ENV_API_BASE_URL,
    ENV_AUTH0_AUDIENCE, ENV_AUTH0_CLIENT_ID, ENV_AUTH0_DOMAIN, ENV_LOGOUT_RETURN_TO,
    ENV_SESSION_TIMEOUT_MINUTES,
};
pub use error::BuildportError;
pub use runtime::{SessionRuntime, SessionRuntimeBuilder, SessionTerminator};

/// The types most hosts need.
pub mod prelude {
    pub use crate::{BuildportError, PortalConfig, SessionRuntime, SessionRuntimeBuilder};
    pub use buildport_http::{ApiClient, ApiError, IdentityError, IdentityProvider, LogoutOptions};
    pub use buildport_idle::{IdleSnapshot, IdleState, Interaction, LogoutReason};
    pub use buildport_nav::{Location, Navigator, Route};
    pub use buildport_storage::{JsonFileStorage, MemoryStorage, Role, StorageArea};
}
