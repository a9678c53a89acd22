//! Idle timeout monitor for Buildport sessions.
//!
//! Signs the user out when they walk away. After a configurable period
//! without interaction the monitor shows a warning with a 2:00 countdown;
//! if nobody clicks "stay signed in" before it runs out, the session ends.
//!
//! # Key types
//!
//! - [`IdleMachine`]: the state machine itself, no I/O, driven by explicit
//!   `now` instants so it can be tested with a fake clock
//! - [`IdleMonitor`] / [`IdleMonitorHandle`]: a Tokio task that drives the
//!   machine with real (or paused) timers
//! - [`LogoutHook`]: what the monitor calls when the session ends
//! - [`IdleConfig`]: inactivity threshold and the dev-only force-idle flag
//!
//! # Integration
//!
//! ```ignore
//! let monitor = IdleMonitor::start(IdleConfig::with_timeout_minutes(30), terminator);
//!
//! // From the host's input listeners:
//! monitor.try_record_activity(Interaction::KeyDown)?;
//!
//! // From the warning modal:
//! monitor.stay().await?;
//! ```

mod config;
mod error;
mod machine;
mod monitor;

pub use config::{
    force_idle_requested, IdleConfig, IdleState, Interaction, LogoutReason,
    DEFAULT_TIMEOUT_MINUTES, MAX_TIMEOUT_MINUTES, TRACKED_INTERACTIONS, WARNING_SECS,
};
pub use error::IdleError;
pub use machine::{format_countdown, IdleEvent, IdleMachine, IdleSnapshot, IdleTimer};
pub use monitor::{IdleMonitor, IdleMonitorHandle, LogoutHook};
