/// Errors that can occur in the navigation layer.
#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    /// A navigator was already registered. The bridge is write-once.
    #[error("a navigator is already registered")]
    AlreadyRegistered,

    /// The router refused to navigate.
    #[error("navigation to {route} rejected: {reason}")]
    Rejected {
        /// The path that was requested.
        route: String,
        /// Why the router refused.
        reason: String,
    },
}
