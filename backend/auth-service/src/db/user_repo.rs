//! User store access
//!
//! Persistence is out of scope for this service: the store is an in-memory map
//! seeded at startup. The `UserStore` trait is the seam a database-backed store
//! would implement.
use async_trait::async_trait;
use crypto_core::Roles;
use dashmap::DashMap;
use std::sync::Arc;

use crate::error::{AuthError, Result};
use crate::models::StoredUser;
use crate::security::password::is_valid_phc;

/// Role granted when a seed entry lists none
pub const DEFAULT_ROLE: &str = "USER";

const ENTRY_SEPARATOR: char = ';';
const FIELD_SEPARATOR: char = ':';
const SEED_ROLE_SEPARATOR: char = '|';

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<StoredUser>>;
}

#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<DashMap<String, StoredUser>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a `SEED_USERS` value
    pub fn from_seed(seed: &str) -> Result<Self> {
        let store = Self::new();
        for user in parse_seed_users(seed)? {
            store.insert(user);
        }
        Ok(store)
    }

    /// Insert or replace a user, keyed by identifier
    pub fn insert(&self, user: StoredUser) {
        self.users.insert(user.identifier.clone(), user);
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<StoredUser>> {
        Ok(self.users.get(identifier).map(|entry| entry.value().clone()))
    }
}

/// Parse `email:phc-hash:ROLE1|ROLE2;email:phc-hash;...`
///
/// PHC strings never contain `:` or `;`, so both separators are unambiguous.
/// An entry without roles gets [`DEFAULT_ROLE`].
pub fn parse_seed_users(seed: &str) -> Result<Vec<StoredUser>> {
    seed.split(ENTRY_SEPARATOR)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_seed_entry)
        .collect()
}

fn parse_seed_entry(entry: &str) -> Result<StoredUser> {
    let mut fields = entry.splitn(3, FIELD_SEPARATOR);
    let identifier = fields.next().unwrap_or_default().trim();
    let hashed_secret = fields.next().unwrap_or_default().trim();
    let roles = fields.next().unwrap_or_default().trim();

    if identifier.is_empty() {
        return Err(AuthError::InvalidSeed("missing identifier".to_string()));
    }
    if !is_valid_phc(hashed_secret) {
        return Err(AuthError::InvalidSeed(format!(
            "{identifier}: password hash is not a PHC string"
        )));
    }

    let roles = if roles.is_empty() {
        Roles::single(DEFAULT_ROLE)
    } else {
        Roles::try_from_iter(roles.split(SEED_ROLE_SEPARATOR))
    }
    .map_err(|e| AuthError::InvalidSeed(format!("{identifier}: {e}")))?;

    Ok(StoredUser {
        identifier: identifier.to_string(),
        hashed_secret: hashed_secret.to_string(),
        roles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHC: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$RdescudvJCsgt3ub+b+dWRWJTmaaJObG";

    #[test]
    fn test_parse_seed_users_with_roles() {
        let seed = format!("admin@pms.com:{PHC}:ADMIN|USER; doctor@pms.com:{PHC}:DOCTOR");
        let users = parse_seed_users(&seed).unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].identifier, "admin@pms.com");
        assert_eq!(users[0].roles.to_csv(), "ADMIN,USER");
        assert_eq!(users[0].hashed_secret, PHC);
        assert_eq!(users[1].roles.to_csv(), "DOCTOR");
    }

    #[test]
    fn test_missing_roles_default_to_user() {
        let users = parse_seed_users(&format!("nurse@pms.com:{PHC}")).unwrap();
        assert_eq!(users[0].roles.to_csv(), DEFAULT_ROLE);

        let users = parse_seed_users(&format!("nurse@pms.com:{PHC}:")).unwrap();
        assert_eq!(users[0].roles.to_csv(), DEFAULT_ROLE);
    }

    #[test]
    fn test_invalid_hash_rejected() {
        let result = parse_seed_users("admin@pms.com:plaintext:ADMIN");
        assert!(matches!(result, Err(AuthError::InvalidSeed(_))));
    }

    #[test]
    fn test_empty_seed_is_empty_store() {
        assert!(parse_seed_users("  ;  ").unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_in_memory_lookup_is_exact() {
        let store = InMemoryUserStore::from_seed(&format!("admin@pms.com:{PHC}:ADMIN")).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.find_by_identifier("admin@pms.com").await.unwrap().is_some());
        assert!(store.find_by_identifier("ADMIN@pms.com").await.unwrap().is_none());
        assert!(store.find_by_identifier("other@pms.com").await.unwrap().is_none());
    }
}
