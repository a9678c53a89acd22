//! The identity provider seam.
//!
//! Buildport doesn't implement login itself. A hosted identity provider
//! (Auth0 in production) owns credentials, silent token renewal and the
//! provider-side logout. The session layer only needs three things from
//! it, captured by the [`IdentityProvider`] trait:
//!
//! - is the user signed in?
//! - give me a currently valid access token (refreshing if needed)
//! - end the session and send the browser to `return_to`
//!
//! Production wires this to the provider SDK, tests use a mock.

/// Errors reported by the identity provider.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IdentityError {
    /// The provider needs an interactive login; silent renewal is impossible.
    #[error("login required")]
    LoginRequired,

    /// Silent token renewal failed for another reason.
    #[error("token refresh failed: {0}")]
    Refresh(String),

    /// The provider-side logout failed.
    #[error("logout failed: {0}")]
    Logout(String),
}

/// Where to send the browser after the provider has ended the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutOptions {
    /// Absolute URL or app route the provider redirects to.
    pub return_to: String,
}

impl LogoutOptions {
    pub fn return_to(target: impl Into<String>) -> Self {
        Self {
            return_to: target.into(),
        }
    }
}

/// The identity provider as seen by the session layer.
///
/// # Trait bounds
///
/// - `Send + Sync` → shared between the HTTP interceptor and the idle
///   monitor's logout, which may run on different Tokio worker threads.
/// - `'static` → it lives for the whole session.
///
/// # Example
///
/// ```rust
/// use buildport_http::{IdentityError, IdentityProvider, LogoutOptions};
///
/// /// Hands out a fixed token. Only for local development.
/// struct StaticIdentity(String);
///
/// impl IdentityProvider for StaticIdentity {
///     fn is_authenticated(&self) -> bool {
///         true
///     }
///
///     async fn access_token(&self) -> Result<String, IdentityError> {
///         Ok(self.0.clone())
///     }
///
///     async fn logout(&self, _options: LogoutOptions) -> Result<(), IdentityError> {
///         Ok(())
///     }
/// }
/// ```
pub trait IdentityProvider: Send + Sync + 'static {
    /// Whether the provider currently holds an authenticated session.
    fn is_authenticated(&self) -> bool;

    /// Returns a valid bearer token, silently renewing it if it expired.
    ///
    /// # Errors
    /// [`IdentityError::LoginRequired`] or [`IdentityError::Refresh`] when
    /// the session cannot be renewed without user interaction.
    fn access_token(
        &self,
    ) -> impl std::future::Future<Output = Result<String, IdentityError>> + Send;

    /// Ends the provider session and redirects to `options.return_to`.
    fn logout(
        &self,
        options: LogoutOptions,
    ) -> impl std::future::Future<Output = Result<(), IdentityError>> + Send;
}
