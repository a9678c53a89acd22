//! Authenticated HTTP access to the Buildport backend.
//!
//! Every feature screen talks to the backend through one shared
//! [`ApiClient`]. This crate owns the cross-cutting behavior of that client:
//!
//! 1. **Authorization**: a [`RequestAuthorizer`] installed per session
//!    attaches a bearer token to each request ([`TokenInterceptor`]).
//! 2. **Server faults**: any response with status ≥ 500 sends the user to
//!    the error route. The error is still returned to the caller.
//! 3. **Everything else**: 4xx and network failures are returned untouched
//!    so each screen can present them in context.
//!
//! # How it fits in the stack
//!
//! ```text
//! Session runtime (above)  ← installs the interceptor on login
//!     ↕
//! HTTP layer (this crate)  ← attaches tokens, routes 5xx to /error
//!     ↕
//! Navigation + storage (below)  ← redirects, session clearing
//! ```

mod client;
mod error;
mod identity;
mod interceptor;

pub use client::{ApiClient, ApiClientBuilder, RequestAuthorizer};
pub use error::ApiError;
pub use identity::{IdentityError, IdentityProvider, LogoutOptions};
pub use interceptor::{ForcedLogoutListener, InterceptorSlot, TokenInterceptor};

/// Re-exported so callers can build requests without a direct reqwest dependency.
pub use reqwest::{header::HeaderValue, Method, StatusCode};
