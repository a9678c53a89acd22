//! Portal configuration.
//!
//! Read once at startup, either from `BUILDPORT_*` environment variables or
//! from a JSON document with the same shape as [`PortalConfig`].

use buildport_idle::{force_idle_requested, IdleConfig, DEFAULT_TIMEOUT_MINUTES};
use buildport_nav::Route;
use serde::Deserialize;
use tracing::warn;

use crate::BuildportError;

pub const ENV_API_BASE_URL: &str = "BUILDPORT_API_BASE_URL";
pub const ENV_SESSION_TIMEOUT_MINUTES: &str = "BUILDPORT_SESSION_TIMEOUT_MINUTES";
pub const ENV_AUTH0_DOMAIN: &str = "BUILDPORT_AUTH0_DOMAIN";
pub const ENV_AUTH0_CLIENT_ID: &str = "BUILDPORT_AUTH0_CLIENT_ID";
pub const ENV_AUTH0_AUDIENCE: &str = "BUILDPORT_AUTH0_AUDIENCE";
pub const ENV_LOGOUT_RETURN_TO: &str = "BUILDPORT_LOGOUT_RETURN_TO";
pub const ENV_ALLOW_FORCE_IDLE: &str = "BUILDPORT_ALLOW_FORCE_IDLE";

/// Identity provider tenant settings, handed to the host's provider SDK.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub domain: String,
    pub client_id: String,
    pub audience: String,
}

/// Well-known app routes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Where an explicit logout lands.
    pub home: String,
    /// Where an idle logout lands.
    pub login: String,
    /// Where server faults land.
    pub error: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            home: "/".into(),
            login: "/login".into(),
            error: "/error".into(),
        }
    }
}

impl RouteConfig {
    pub fn home(&self) -> Route {
        Route::new(self.home.as_str())
    }

    pub fn login(&self) -> Route {
        Route::new(self.login.as_str())
    }

    pub fn error(&self) -> Route {
        Route::new(self.error.as_str())
    }
}

/// Everything the session runtime needs to know about its deployment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Base URL of the backend API.
    pub api_base_url: String,

    /// Idle threshold in minutes, kept as the raw configured text.
    /// See [`timeout_minutes`](Self::timeout_minutes).
    pub session_timeout_minutes: String,

    pub identity: IdentityConfig,

    pub routes: RouteConfig,

    /// Post-logout target handed to the identity provider when a session
    /// ends on its own (token failure, idle expiry). Usually the absolute
    /// URL of the login page.
    pub logout_return_to: String,

    /// Honour `forceIdle=true` in the query string.
    pub allow_force_idle: bool,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".into(),
            session_timeout_minutes: DEFAULT_TIMEOUT_MINUTES.to_string(),
            identity: IdentityConfig::default(),
            routes: RouteConfig::default(),
            logout_return_to: "/login".into(),
            allow_force_idle: cfg!(debug_assertions),
        }
    }
}

impl PortalConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, BuildportError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, falling back to the
    /// defaults for every unset variable.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, BuildportError> {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_BASE_URL) {
            config.api_base_url = url;
        }
        if let Some(minutes) = lookup(ENV_SESSION_TIMEOUT_MINUTES) {
            config.session_timeout_minutes = minutes;
        }
        if let Some(domain) = lookup(ENV_AUTH0_DOMAIN) {
            config.identity.domain = domain;
        }
        if let Some(client_id) = lookup(ENV_AUTH0_CLIENT_ID) {
            config.identity.client_id = client_id;
        }
        if let Some(audience) = lookup(ENV_AUTH0_AUDIENCE) {
            config.identity.audience = audience;
        }
        if let Some(target) = lookup(ENV_LOGOUT_RETURN_TO) {
            config.logout_return_to = target;
        }
        if let Some(flag) = lookup(ENV_ALLOW_FORCE_IDLE) {
            config.allow_force_idle = parse_flag(&flag).ok_or_else(|| {
                BuildportError::Config(format!(
                    "{ENV_ALLOW_FORCE_IDLE}: expected true or false, got {flag:?}"
                ))
            })?;
        }

        Ok(config)
    }

    /// Parses a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, BuildportError> {
        serde_json::from_str(json).map_err(|e| BuildportError::Config(e.to_string()))
    }

    /// The configured idle threshold.
    ///
    /// Text that is not an integer falls back to the default of 30 minutes.
    /// Values below 1 are left for [`IdleConfig`] to clamp.
    pub fn timeout_minutes(&self) -> i64 {
        let raw = self.session_timeout_minutes.trim();
        match raw.parse::<i64>() {
            Ok(minutes) => minutes,
            Err(_) => {
                warn!(
                    configured = raw,
                    default = DEFAULT_TIMEOUT_MINUTES,
                    "session timeout is not a number, using default"
                );
                DEFAULT_TIMEOUT_MINUTES
            }
        }
    }

    /// Builds the idle monitor settings for a session that started on a
    /// page with the given query string.
    pub fn idle_config(&self, query: &str) -> IdleConfig {
        let requested = force_idle_requested(query);
        if requested && !self.allow_force_idle {
            warn!("forceIdle requested but not allowed in this build, ignoring");
        }
        IdleConfig {
            timeout_minutes: self.timeout_minutes(),
            force_idle: requested && self.allow_force_idle,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
