//! Unified error type for the Buildport session runtime.

use buildport_http::ApiError;
use buildport_idle::IdleError;
use buildport_nav::NavigationError;
use buildport_storage::StorageError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `buildport` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
#[derive(Debug, thiserror::Error)]
pub enum BuildportError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Idle(#[from] IdleError),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),
}
