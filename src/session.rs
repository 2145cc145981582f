//! Login and the explicit session context.
//!
//! Every workflow operation receives the acting user as a [`Session`] value rather than
//! looking it up from ambient state. The persisted "current user" pointer lives in the
//! store and is only consulted by the CLI when it builds a session.

use tracing::warn;

use crate::error::{Result, WorkflowError};
use crate::fields::Role;
use crate::user::User;

/// The user on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    user: User,
}

impl Session {
    pub fn new(user: User) -> Self {
        Session { user }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn user_id(&self) -> u64 {
        self.user.id
    }

    pub fn name(&self) -> &str {
        &self.user.name
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    /// Fail with `PermissionDenied` unless the session holds `role`.
    pub fn require_role(&self, role: Role, action: &str) -> Result<()> {
        if self.user.role == role {
            Ok(())
        } else {
            Err(WorkflowError::denied(format!(
                "only {role} users may {action} ({} is {})",
                self.user.name, self.user.role
            )))
        }
    }
}

/// Find the user whose name and password both match exactly.
///
/// Names are compared case-sensitively. Every candidate with a matching name has its
/// credential checked, so a duplicate name cannot shadow another account.
pub fn authenticate(users: &[User], name: &str, password: &str) -> Result<User> {
    let found = users
        .iter()
        .filter(|u| u.name == name)
        .find(|u| u.credential.verify(password));
    match found {
        Some(u) => Ok(u.clone()),
        None => {
            warn!(name, "login rejected");
            Err(WorkflowError::InvalidCredentials)
        }
    }
}
