//! Authenticated identity shared by the issuer, the gateway and downstream services.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Separator used when roles travel as a single string (token claim, trust header)
pub const ROLE_SEPARATOR: char = ',';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RolesError {
    #[error("role set must contain at least one role")]
    Empty,

    #[error("invalid role name: {0:?}")]
    InvalidRole(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("subject must not be blank")]
    BlankSubject,

    #[error("subject contains control characters")]
    InvalidSubject,

    #[error(transparent)]
    Roles(#[from] RolesError),
}

/// Non-empty, case-sensitive set of role names.
///
/// Entries are trimmed and empty entries are dropped, so `" ADMIN, ,USER"` and
/// `"USER,ADMIN"` parse to the same set. Iteration and `to_csv` are sorted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Roles(BTreeSet<String>);

impl Roles {
    /// Parse a comma-joined role list as carried in claims and trust headers
    pub fn parse_csv(csv: &str) -> Result<Self, RolesError> {
        Self::try_from_iter(csv.split(ROLE_SEPARATOR))
    }

    pub fn try_from_iter<I, S>(roles: I) -> Result<Self, RolesError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for role in roles {
            let role = role.as_ref().trim();
            if role.is_empty() {
                continue;
            }
            if role.contains(ROLE_SEPARATOR) || role.chars().any(|c| c.is_control()) {
                return Err(RolesError::InvalidRole(role.to_string()));
            }
            set.insert(role.to_string());
        }

        if set.is_empty() {
            return Err(RolesError::Empty);
        }
        Ok(Self(set))
    }

    pub fn single(role: &str) -> Result<Self, RolesError> {
        Self::try_from_iter([role])
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_csv(&self) -> String {
        self.iter().collect::<Vec<_>>().join(",")
    }
}

impl TryFrom<Vec<String>> for Roles {
    type Error = RolesError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::try_from_iter(value)
    }
}

impl From<Roles> for Vec<String> {
    fn from(roles: Roles) -> Self {
        roles.0.into_iter().collect()
    }
}

impl fmt::Display for Roles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_csv())
    }
}

/// Who the request acts as: the unique user identifier plus the granted roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IdentityFields")]
pub struct Identity {
    subject: String,
    roles: Roles,
}

/// Unchecked wire form; deserialization goes through [`Identity::new`]
#[derive(Deserialize)]
struct IdentityFields {
    subject: String,
    roles: Roles,
}

impl TryFrom<IdentityFields> for Identity {
    type Error = IdentityError;

    fn try_from(fields: IdentityFields) -> Result<Self, Self::Error> {
        Identity::new(fields.subject, fields.roles)
    }
}

impl Identity {
    pub fn new(subject: impl Into<String>, roles: Roles) -> Result<Self, IdentityError> {
        let subject = subject.into();
        if subject.trim().is_empty() {
            return Err(IdentityError::BlankSubject);
        }
        // Subjects end up in header values; CR/LF and friends must never get that far
        if subject.chars().any(|c| c.is_control()) {
            return Err(IdentityError::InvalidSubject);
        }
        Ok(Self { subject, roles })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}
