//! The idle state machine.
//!
//! [`IdleMachine`] owns no timers of its own. It records *when* the next
//! timer is due in a single [`IdleTimer`] slot and is told the current time
//! on every call, so the driving task (or a test) decides how time passes.
//! One slot means at most one live timer: arming the countdown replaces the
//! inactivity deadline and vice versa.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::config::{IdleConfig, IdleState, Interaction, LogoutReason, WARNING_SECS};

const TICK: Duration = Duration::from_secs(1);

/// The one timer a machine may have armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleTimer {
    Disarmed,
    /// Fires the warning when the user has been quiet until `deadline`.
    Inactivity { deadline: Instant },
    /// Counts the warning down one second at a time.
    Countdown { next_tick: Instant, remaining: u64 },
}

impl IdleTimer {
    /// When this timer next needs attention, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        match *self {
            Self::Disarmed => None,
            Self::Inactivity { deadline } => Some(deadline),
            Self::Countdown { next_tick, .. } => Some(next_tick),
        }
    }

    pub fn is_armed(&self) -> bool {
        !matches!(self, Self::Disarmed)
    }
}

/// Something observable that happened during a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleEvent {
    /// Entered `Warning`; the countdown starts at `remaining_secs`.
    WarningShown { remaining_secs: u64 },
    CountdownTick { remaining_secs: u64 },
    /// The user chose to stay; back to `Active`.
    WarningDismissed,
    /// The session ended. Exactly one per machine.
    Terminated(LogoutReason),
    Disposed,
}

/// What a warning modal needs to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleSnapshot {
    pub state: IdleState,
    /// Seconds left on the countdown while in `Warning`.
    pub remaining_secs: Option<u64>,
}

impl IdleSnapshot {
    /// The warning modal is visible exactly while in `Warning`.
    pub fn warning_visible(&self) -> bool {
        self.state == IdleState::Warning
    }

    /// The countdown as `M:SS`, e.g. `"2:00"`.
    pub fn countdown_label(&self) -> Option<String> {
        self.remaining_secs.map(format_countdown)
    }
}

/// Formats seconds as `M:SS`.
///
/// ```
/// assert_eq!(buildport_idle::format_countdown(120), "2:00");
/// assert_eq!(buildport_idle::format_countdown(65), "1:05");
/// assert_eq!(buildport_idle::format_countdown(9), "0:09");
/// ```
pub fn format_countdown(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Session idle-timeout state machine.
///
/// Every method that can change state returns the [`IdleEvent`] it
/// produced, or `None` when the input was ignored. Final states ignore
/// everything.
#[derive(Debug)]
pub struct IdleMachine {
    config: IdleConfig,
    state: IdleState,
    timer: IdleTimer,
}

impl IdleMachine {
    /// Creates a machine in `Active` with no timer armed. Call
    /// [`start`](Self::start) to arm it.
    pub fn new(config: IdleConfig) -> Self {
        Self {
            config: config.validated(),
            state: IdleState::Active,
            timer: IdleTimer::Disarmed,
        }
    }

    pub fn state(&self) -> IdleState {
        self.state
    }

    pub fn timer(&self) -> IdleTimer {
        self.timer
    }

    pub fn config(&self) -> &IdleConfig {
        &self.config
    }

    /// When the driver should next call [`on_timer`](Self::on_timer).
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    pub fn snapshot(&self) -> IdleSnapshot {
        let remaining_secs = match self.timer {
            IdleTimer::Countdown { remaining, .. } if self.state == IdleState::Warning => {
                Some(remaining)
            }
            _ => None,
        };
        IdleSnapshot {
            state: self.state,
            remaining_secs,
        }
    }

    /// Arms the inactivity timer, or goes straight to `Warning` when
    /// `force_idle` is set.
    pub fn start(&mut self, now: Instant) -> Option<IdleEvent> {
        if self.state != IdleState::Active || self.timer.is_armed() {
            return None;
        }
        if self.config.force_idle {
            info!("force idle requested, showing warning immediately");
            return Some(self.enter_warning(now));
        }
        self.arm_inactivity(now);
        info!(timeout_minutes = self.config.timeout_minutes, "idle monitor started");
        None
    }

    /// Pushes the inactivity deadline back. Returns `true` if it did.
    ///
    /// Only counts in `Active` after [`start`](Self::start). During the
    /// warning the user has to choose explicitly.
    pub fn record_activity(&mut self, interaction: Interaction, now: Instant) -> bool {
        match (self.state, self.timer) {
            (IdleState::Active, IdleTimer::Inactivity { .. }) => {
                self.arm_inactivity(now);
                trace!(event = interaction.event_name(), "activity, inactivity timer reset");
                true
            }
            _ => false,
        }
    }

    /// "Stay signed in". Leaves `Warning` and restarts the inactivity timer.
    pub fn stay(&mut self, now: Instant) -> Option<IdleEvent> {
        if self.state != IdleState::Warning {
            return None;
        }
        self.state = IdleState::Active;
        self.arm_inactivity(now);
        info!("user chose to stay signed in");
        Some(IdleEvent::WarningDismissed)
    }

    /// "Log out now".
    pub fn force_logout(&mut self) -> Option<IdleEvent> {
        self.terminate(LogoutReason::UserRequested)
    }

    /// Tears the machine down without ending the session.
    pub fn dispose(&mut self) -> Option<IdleEvent> {
        if self.state.is_final() {
            return None;
        }
        self.state = IdleState::Disposed;
        self.timer = IdleTimer::Disarmed;
        debug!("idle monitor disposed");
        Some(IdleEvent::Disposed)
    }

    /// Advances whichever timer is due at `now`. Early calls are ignored.
    ///
    /// Each countdown tick is scheduled one second after the previous
    /// tick's deadline, not after `now`, so a late wakeup does not stretch
    /// the countdown.
    pub fn on_timer(&mut self, now: Instant) -> Option<IdleEvent> {
        match self.timer {
            IdleTimer::Inactivity { deadline } if now >= deadline => {
                info!("inactivity timeout reached, showing warning");
                Some(self.enter_warning(now))
            }
            IdleTimer::Countdown {
                next_tick,
                remaining,
            } if now >= next_tick => {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    info!("logout countdown expired");
                    return self.terminate(LogoutReason::IdleExpired);
                }
                self.timer = IdleTimer::Countdown {
                    next_tick: next_tick + TICK,
                    remaining,
                };
                debug!(remaining, "countdown tick");
                Some(IdleEvent::CountdownTick {
                    remaining_secs: remaining,
                })
            }
            _ => None,
        }
    }

    fn enter_warning(&mut self, now: Instant) -> IdleEvent {
        self.state = IdleState::Warning;
        self.timer = IdleTimer::Countdown {
            next_tick: now + TICK,
            remaining: WARNING_SECS,
        };
        IdleEvent::WarningShown {
            remaining_secs: WARNING_SECS,
        }
    }

    fn arm_inactivity(&mut self, now: Instant) {
        self.timer = IdleTimer::Inactivity {
            deadline: now + self.config.timeout(),
        };
    }

    fn terminate(&mut self, reason: LogoutReason) -> Option<IdleEvent> {
        if self.state.is_final() {
            return None;
        }
        self.state = IdleState::Terminated;
        self.timer = IdleTimer::Disarmed;
        info!(%reason, "session terminated");
        Some(IdleEvent::Terminated(reason))
    }
}
