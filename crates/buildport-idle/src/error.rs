//! Error types for the idle monitor.

/// Errors returned by [`IdleMonitorHandle`](crate::IdleMonitorHandle) calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdleError {
    /// The monitor has terminated or been disposed. Its interaction
    /// listeners are gone; nothing sent now has any effect.
    #[error("idle monitor is no longer running")]
    Stopped,
}
