//! The portal role of the signed-in user and its local cache.
//!
//! The identity provider knows WHO the user is; the backend knows WHICH
//! portal they belong to. The role is fetched once after login and cached
//! next to the session so screens can pick a portal without another
//! round-trip. It is one of the keys the [`SessionClearer`](crate::SessionClearer)
//! purges on logout.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{StorageArea, StorageError};

/// Storage key holding the cached role.
pub const ROLE_KEY: &str = "roles";

/// Which portal a user belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Owner,
    Salesperson,
    Contractor,
    Customer,
}

impl Role {
    /// The wire name, e.g. `"OWNER"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Salesperson => "SALESPERSON",
            Self::Contractor => "CONTRACTOR",
            Self::Customer => "CUSTOMER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    /// Parses a wire name. Case-insensitive, since older cached values
    /// were stored lower-case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OWNER" => Ok(Self::Owner),
            "SALESPERSON" => Ok(Self::Salesperson),
            "CONTRACTOR" => Ok(Self::Contractor),
            "CUSTOMER" => Ok(Self::Customer),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// Reads and writes the cached [`Role`] in a storage area.
#[derive(Clone)]
pub struct RoleCache {
    area: Arc<dyn StorageArea>,
}

impl RoleCache {
    pub fn new(area: Arc<dyn StorageArea>) -> Self {
        Self { area }
    }

    /// The cached role, or `None` when nothing is cached.
    ///
    /// # Errors
    /// [`StorageError::InvalidValue`] if the cached value isn't a known role.
    pub fn get(&self) -> Result<Option<Role>, StorageError> {
        let Some(raw) = self.area.get(ROLE_KEY)? else {
            return Ok(None);
        };
        raw.parse().map(Some).map_err(|_| StorageError::InvalidValue {
            key: ROLE_KEY.to_string(),
            value: raw,
        })
    }

    pub fn set(&self, role: Role) -> Result<(), StorageError> {
        self.area.set(ROLE_KEY, role.as_str())?;
        tracing::debug!(%role, "role cached");
        Ok(())
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.area.remove(ROLE_KEY)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;

    fn cache() -> (RoleCache, Arc<MemoryStorage>) {
        let area = Arc::new(MemoryStorage::new());
        (RoleCache::new(area.clone()), area)
    }

    #[test]
    fn test_role_from_str_is_case_insensitive() {
        assert_eq!("owner".parse::<Role>(), Ok(Role::Owner));
        assert_eq!(" Contractor ".parse::<Role>(), Ok(Role::Contractor));
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde_uses_uppercase_names() {
        let json = serde_json::to_string(&Role::Salesperson).unwrap();
        assert_eq!(json, "\"SALESPERSON\"");
        let role: Role = serde_json::from_str("\"CUSTOMER\"").unwrap();
        assert_eq!(role, Role::Customer);
    }

    #[test]
    fn test_role_cache_empty_returns_none() {
        let (cache, _area) = cache();

        assert_eq!(cache.get().unwrap(), None);
    }

    #[test]
    fn test_role_cache_set_then_get() {
        let (cache, area) = cache();

        cache.set(Role::Owner).unwrap();

        assert_eq!(cache.get().unwrap(), Some(Role::Owner));
        assert_eq!(area.get(ROLE_KEY).unwrap().as_deref(), Some("OWNER"));
    }

    #[test]
    fn test_role_cache_garbage_value_returns_invalid_value() {
        let (cache, area) = cache();
        area.set(ROLE_KEY, "ADMIN").unwrap();

        let result = cache.get();

        assert!(matches!(
            result,
            Err(StorageError::InvalidValue { ref value, .. }) if value == "ADMIN"
        ));
    }

    #[test]
    fn test_role_cache_clear_removes_key() {
        let (cache, area) = cache();
        cache.set(Role::Customer).unwrap();

        cache.clear().unwrap();

        assert!(area.is_empty());
    }
}
