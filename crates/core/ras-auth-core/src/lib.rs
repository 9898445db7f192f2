//! Principal and role-membership types for endpoint handshakes.
//!
//! The handshake layer never authenticates anybody itself. It receives an
//! already authenticated [`AuthenticatedUser`] (if any) and an optional
//! [`RoleCheck`] delegate from whatever sits in front of it.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while resolving the caller behind a handshake.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthError {
    /// Authentication is required but no credentials were presented.
    #[error("Authentication required")]
    AuthenticationRequired,
}

/// The authenticated caller of an inbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Unique identifier for the user.
    pub user_id: String,

    /// Roles / permissions granted to this user.
    pub permissions: HashSet<String>,

    /// Optional additional metadata about the user.
    pub metadata: Option<serde_json::Value>,
}

impl AuthenticatedUser {
    /// Create a principal with no permissions.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            permissions: HashSet::new(),
            metadata: None,
        }
    }

    /// Add a permission, builder style.
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    /// Name of the principal.
    pub fn name(&self) -> &str {
        &self.user_id
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

impl fmt::Display for AuthenticatedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_id)
    }
}

/// Answers role-membership questions for the caller of a request.
///
/// Role membership is owned by whatever authenticated the caller, so it is
/// injected into the handshake as a delegate rather than derived from the
/// principal.
pub trait RoleCheck: Send + Sync {
    /// Returns `true` if the authenticated caller belongs to `role`.
    ///
    /// Implementations should return `false` for unauthenticated callers.
    fn is_user_in_role(&self, role: &str) -> bool;
}

impl<F> RoleCheck for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_user_in_role(&self, role: &str) -> bool {
        self(role)
    }
}

/// A user answers role checks from its own permission set.
impl RoleCheck for AuthenticatedUser {
    fn is_user_in_role(&self, role: &str) -> bool {
        self.has_permission(role)
    }
}
