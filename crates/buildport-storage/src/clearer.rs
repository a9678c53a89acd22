//! The session clearer: purges locally cached session artifacts.
//!
//! Logging out through the identity provider only clears what the provider
//! owns. Everything the portal cached on its own (the user profile, the
//! selected portal, the last visited route) and anything the provider SDK
//! left behind under its well-known prefixes has to be swept separately.
//!
//! The decision of WHAT to remove is a pure function, [`keys_to_remove`].
//! The actual I/O is a thin loop around it in [`SessionClearer::clear`].

use std::collections::HashSet;
use std::sync::Arc;

use crate::StorageArea;

/// Application keys removed from both storage areas.
pub const SESSION_KEYS: [&str; 6] = [
    "user",
    "userProfile",
    "roles",
    "portal",
    "selectedPortal",
    "lastVisitedRoute",
];

/// Key prefixes used by the identity provider SDK's own cache.
pub const IDENTITY_PREFIXES: [&str; 2] = ["auth0", "@@auth0spajs@@"];

/// Something that caches a default `Authorization` header.
///
/// The shared HTTP client implements this so clearing a session also
/// drops the header it would otherwise keep sending.
pub trait CredentialCache: Send + Sync {
    /// Forgets any default authorization header.
    fn clear_default_authorization(&self);
}

/// Picks the session keys out of a storage snapshot.
///
/// A key is selected when it is one of [`SESSION_KEYS`] or starts with one
/// of [`IDENTITY_PREFIXES`]. Order follows the snapshot; duplicates are
/// reported once.
pub fn keys_to_remove(snapshot: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    snapshot
        .iter()
        .filter(|key| is_session_key(key))
        .filter(|key| seen.insert(key.as_str()))
        .cloned()
        .collect()
}

fn is_session_key(key: &str) -> bool {
    SESSION_KEYS.contains(&key)
        || IDENTITY_PREFIXES.iter().any(|prefix| key.starts_with(prefix))
}

/// What a [`SessionClearer::clear`] call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearReport {
    /// Keys that were present and got removed (both areas, in sweep order).
    pub removed: Vec<String>,
    /// Storage operations that failed and were skipped.
    pub failures: usize,
}

/// Purges session artifacts from the short-lived and persistent areas.
///
/// Cheap to clone; all clones share the same areas.
#[derive(Clone)]
pub struct SessionClearer {
    short_lived: Arc<dyn StorageArea>,
    persistent: Arc<dyn StorageArea>,
    caches: Vec<Arc<dyn CredentialCache>>,
}

impl SessionClearer {
    pub fn new(short_lived: Arc<dyn StorageArea>, persistent: Arc<dyn StorageArea>) -> Self {
        Self {
            short_lived,
            persistent,
            caches: Vec::new(),
        }
    }

    /// Adds a credential cache to clear along with the storage areas.
    pub fn with_credential_cache(mut self, cache: Arc<dyn CredentialCache>) -> Self {
        self.caches.push(cache);
        self
    }

    /// Removes every session artifact. Idempotent and infallible.
    ///
    /// Storage failures are logged and counted in the report, never returned.
    pub fn clear(&self) -> ClearReport {
        let mut report = ClearReport::default();

        sweep("short_lived", self.short_lived.as_ref(), &mut report);
        sweep("persistent", self.persistent.as_ref(), &mut report);

        for cache in &self.caches {
            cache.clear_default_authorization();
        }

        tracing::info!(
            removed = report.removed.len(),
            failures = report.failures,
            "session artifacts cleared"
        );
        report
    }
}

impl std::fmt::Debug for SessionClearer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClearer")
            .field("caches", &self.caches.len())
            .finish_non_exhaustive()
    }
}

fn sweep(area_name: &str, area: &dyn StorageArea, report: &mut ClearReport) {
    // If the area can't be listed, still try the fixed keys.
    let candidates = match area.keys() {
        Ok(keys) => keys_to_remove(&keys),
        Err(e) => {
            tracing::warn!(area = area_name, error = %e, "listing storage keys failed");
            report.failures += 1;
            SESSION_KEYS.iter().map(|k| k.to_string()).collect()
        }
    };

    for key in candidates {
        match area.remove(&key) {
            Ok(true) => report.removed.push(key),
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(area = area_name, %key, error = %e, "removing storage key failed");
                report.failures += 1;
            }
        }
    }
}
