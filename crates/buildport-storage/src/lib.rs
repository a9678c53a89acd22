//! Client-side session storage for Buildport.
//!
//! The identity provider SDK owns its own token cache, but the portal keeps
//! a few artifacts of its own next to it (the signed-in user, the selected
//! portal, the cached role). This crate provides:
//!
//! - **Storage areas** ([`StorageArea`], [`MemoryStorage`], [`JsonFileStorage`]):
//!   the short-lived and persistent key/value stores.
//! - **The session clearer** ([`SessionClearer`]): purges every known
//!   session artifact from both areas and drops cached authorization
//!   headers.
//! - **The role cache** ([`RoleCache`]): the locally cached [`Role`] of the
//!   signed-in user.

mod area;
mod clearer;
mod error;
mod file;
mod role;

pub use area::{MemoryStorage, StorageArea};
pub use clearer::{
    keys_to_remove, ClearReport, CredentialCache, SessionClearer,
    IDENTITY_PREFIXES, SESSION_KEYS,
};
pub use error::StorageError;
pub use file::JsonFileStorage;
pub use role::{Role, RoleCache, ROLE_KEY};
