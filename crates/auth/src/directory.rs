//! Role lookup against the portal's user directory.
//!
//! The student and staff tables live outside this crate. At login the
//! callback asks the directory which role an email address carries; a user
//! the directory does not know gets no role.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::AuthResult;

/// Trait for role lookups
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Returns the role for an email address, or `None` if it has no role.
    async fn role_for(&self, email: &str) -> AuthResult<Option<String>>;
}

/// Directory backed by a fixed email → role map
#[derive(Debug, Clone, Default)]
pub struct MemoryRoleDirectory {
    roles: HashMap<String, String>,
}

impl MemoryRoleDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a role to an email address
    pub fn with_role(mut self, email: impl Into<String>, role: impl Into<String>) -> Self {
        self.roles.insert(normalize(&email.into()), role.into());
        self
    }

    /// Number of assignments
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Returns true if no role is assigned
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl<E, R> FromIterator<(E, R)> for MemoryRoleDirectory
where
    E: Into<String>,
    R: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (E, R)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |dir, (email, role)| dir.with_role(email, role))
    }
}

#[async_trait]
impl RoleDirectory for MemoryRoleDirectory {
    async fn role_for(&self, email: &str) -> AuthResult<Option<String>> {
        Ok(self
            .roles
            .get(&normalize(email))
            .filter(|role| !role.is_empty())
            .cloned())
    }
}

// Email addresses are compared case-insensitively
fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}
