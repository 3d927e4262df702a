//! User identity and role types

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A user authenticated through Google.
///
/// Built once per successful login and never mutated while its session lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Provider's user ID
    pub id: String,

    /// Email address
    pub email: String,

    /// Display name
    pub name: String,

    /// Avatar URL
    pub picture: String,

    /// Google's unique identifier
    pub google_id: String,

    /// Authorization role; `None` means no elevated access
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl User {
    /// Creates a user with only the provider ID set
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            google_id: id.clone(),
            id,
            email: String::new(),
            name: String::new(),
            picture: String::new(),
            role: None,
        }
    }

    /// Sets the email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Sets the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the avatar URL
    pub fn with_picture(mut self, picture: impl Into<String>) -> Self {
        self.picture = picture.into();
        self
    }

    /// Sets the role. An empty string clears it.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        let role = role.into();
        self.role = if role.is_empty() { None } else { Some(role) };
        self
    }

    /// Returns the role, if any
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }
}

/// The set of roles allowed through a protected route.
///
/// Membership is an exact string match. There is no hierarchy: a route that
/// should admit both `admin` and `staff` lists both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet {
    roles: BTreeSet<String>,
}

impl RoleSet {
    /// Creates a role set from any list of role names
    pub fn new<I, R>(roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Checks whether the role is in the set
    pub fn contains(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Checks whether the user's role is in the set. Users without a role
    /// are never allowed.
    pub fn allows(&self, user: &User) -> bool {
        user.role().is_some_and(|role| self.contains(role))
    }

    /// Iterates over the role names in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }

    /// Returns true if no role is allowed
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let roles: Vec<&str> = self.iter().collect();
        write!(f, "{{{}}}", roles.join(", "))
    }
}
