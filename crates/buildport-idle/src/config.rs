//! Idle monitor configuration and the vocabulary of the state machine.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Inactivity threshold used when none is configured.
pub const DEFAULT_TIMEOUT_MINUTES: i64 = 30;

/// Longest inactivity threshold honoured (30 days). Larger values are
/// clamped.
pub const MAX_TIMEOUT_MINUTES: i64 = 60 * 24 * 30;

/// Length of the logout countdown shown in the warning.
pub const WARNING_SECS: u64 = 120;

// ---------------------------------------------------------------------------
// IdleConfig
// ---------------------------------------------------------------------------

/// Configuration for one idle monitor.
///
/// Read once when the session starts; changing the environment afterwards
/// has no effect on a running monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdleConfig {
    /// Minutes without interaction before the warning shows.
    /// Values below 1 behave as 1, values above [`MAX_TIMEOUT_MINUTES`] as
    /// the maximum.
    pub timeout_minutes: i64,

    /// Enter the warning immediately on start. Development aid, set from a
    /// `forceIdle=true` query parameter when the host allows it.
    pub force_idle: bool,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: DEFAULT_TIMEOUT_MINUTES,
            force_idle: false,
        }
    }
}

impl IdleConfig {
    pub fn with_timeout_minutes(timeout_minutes: i64) -> Self {
        Self {
            timeout_minutes,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values. Called by [`IdleMachine::new`](crate::IdleMachine::new).
    pub fn validated(mut self) -> Self {
        if self.timeout_minutes < 1 {
            warn!(
                configured = self.timeout_minutes,
                "idle timeout below 1 minute, clamping to 1"
            );
            self.timeout_minutes = 1;
        } else if self.timeout_minutes > MAX_TIMEOUT_MINUTES {
            warn!(
                configured = self.timeout_minutes,
                max = MAX_TIMEOUT_MINUTES,
                "idle timeout too large, clamping to the maximum"
            );
            self.timeout_minutes = MAX_TIMEOUT_MINUTES;
        }
        self
    }

    /// The inactivity threshold, `timeout_minutes` clamped to
    /// `1..=MAX_TIMEOUT_MINUTES`.
    pub fn timeout(&self) -> Duration {
        let minutes = self.timeout_minutes.clamp(1, MAX_TIMEOUT_MINUTES) as u64;
        Duration::from_secs(minutes * 60)
    }

    /// The countdown length. Always [`WARNING_SECS`].
    pub fn warning(&self) -> Duration {
        Duration::from_secs(WARNING_SECS)
    }
}

/// Returns `true` when a URL query string carries `forceIdle=true`.
///
/// Accepts the query with or without its leading `?`.
pub fn force_idle_requested(query: &str) -> bool {
    query
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .any(|(key, value)| key == "forceIdle" && value == "true")
}

// ---------------------------------------------------------------------------
// Interaction
// ---------------------------------------------------------------------------

/// A user interaction that counts as "still here".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interaction {
    PointerMove,
    PointerDown,
    KeyDown,
    TouchStart,
    Click,
}

/// Every interaction the monitor listens for.
pub const TRACKED_INTERACTIONS: [Interaction; 5] = [
    Interaction::PointerMove,
    Interaction::PointerDown,
    Interaction::KeyDown,
    Interaction::TouchStart,
    Interaction::Click,
];

impl Interaction {
    /// The DOM event name hosts subscribe to.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::PointerMove => "mousemove",
            Self::PointerDown => "mousedown",
            Self::KeyDown => "keydown",
            Self::TouchStart => "touchstart",
            Self::Click => "click",
        }
    }
}

impl FromStr for Interaction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TRACKED_INTERACTIONS
            .into_iter()
            .find(|i| i.event_name() == s)
            .ok_or_else(|| format!("untracked event: {s}"))
    }
}

// ---------------------------------------------------------------------------
// IdleState
// ---------------------------------------------------------------------------

/// The lifecycle state of an idle monitor.
///
/// ```text
///            inactivity timer fires
///   Active ─────────────────────────→ Warning
///     ↑  ↺ activity                      │  ↺ activity ignored
///     └──────────── stay() ──────────────┤
///                                        │ countdown hits 0 / force_logout()
///                                        ▼
///                                   Terminated
///
///   any non-final state ── dispose() ──→ Disposed
/// ```
///
/// - **Active**: inactivity timer armed; interactions push it back.
/// - **Warning**: countdown armed, modal showing. Only an explicit "stay"
///   keeps the session.
/// - **Terminated**: session ended, logout hook called. Terminal.
/// - **Disposed**: torn down without a logout (unmount, explicit logout
///   handled elsewhere). Terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleState {
    Active,
    Warning,
    Terminated,
    Disposed,
}

impl IdleState {
    /// Returns `true` for the two terminal states.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Terminated | Self::Disposed)
    }
}

impl fmt::Display for IdleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Warning => write!(f, "Warning"),
            Self::Terminated => write!(f, "Terminated"),
            Self::Disposed => write!(f, "Disposed"),
        }
    }
}

// ---------------------------------------------------------------------------
// LogoutReason
// ---------------------------------------------------------------------------

/// Why the monitor ended the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The countdown ran out. The user lands on the login page.
    IdleExpired,
    /// The user clicked "log out now". The user lands on the home page.
    UserRequested,
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdleExpired => write!(f, "idle_expired"),
            Self::UserRequested => write!(f, "user_requested"),
        }
    }
}
