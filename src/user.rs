//! User records and account administration.
//!
//! Users are identified by a numeric id that never changes. Their display name doubles
//! as the login handle and as the by-value reference stored on reports and tasks, so
//! renaming a user does not rewrite earlier records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::credential::Credential;
use crate::error::{Result, WorkflowError};
use crate::fields::Role;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub credential: Credential,
    pub role: Role,
}

impl User {
    pub fn new(id: u64, name: &str, password: &str, role: Role) -> Self {
        User {
            id,
            name: name.to_string(),
            credential: Credential::new(password),
            role,
        }
    }
}

/// Field changes for [`update_user`]; `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

/// The account set written on first run: one user per role.
pub fn default_users() -> Vec<User> {
    vec![
        User::new(1, "Admin", "admin123", Role::Admin),
        User::new(2, "TU User", "tu123", Role::Tu),
        User::new(3, "Suwati, S.h", "koordinator123", Role::Koordinator),
        User::new(4, "Roza Erlinda", "staff123", Role::Staff),
    ]
}

pub fn next_user_id(users: &[User]) -> u64 {
    users.iter().map(|u| u.id).max().unwrap_or(0) + 1
}

pub fn find_by_name<'a>(users: &'a [User], name: &str) -> Option<&'a User> {
    users.iter().find(|u| u.name == name)
}

/// Names of all users holding `role`, in collection order.
pub fn names_with_role(users: &[User], role: Role) -> Vec<&str> {
    users.iter().filter(|u| u.role == role).map(|u| u.name.as_str()).collect()
}

pub fn role_counts(users: &[User]) -> BTreeMap<Role, usize> {
    let mut counts: BTreeMap<Role, usize> = Role::ALL.iter().map(|r| (*r, 0)).collect();
    for u in users {
        *counts.entry(u.role).or_default() += 1;
    }
    counts
}

fn check_name(users: &[User], name: &str, except: Option<u64>) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(WorkflowError::validation("user name must not be empty"));
    }
    if users.iter().any(|u| u.name == name && Some(u.id) != except) {
        return Err(WorkflowError::validation(format!("a user named '{name}' already exists")));
    }
    Ok(name.to_string())
}

fn check_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(WorkflowError::validation("password must not be empty"));
    }
    Ok(())
}

/// Add an account. Admin only.
pub fn create_user(users: &mut Vec<User>, session: &Session, name: &str, password: &str, role: Role) -> Result<User> {
    session.require_role(Role::Admin, "create users")?;
    let name = check_name(users, name, None)?;
    check_password(password)?;

    let user = User::new(next_user_id(users), &name, password, role);
    users.push(user.clone());
    info!(user_id = user.id, role = %role, by = session.name(), "user created");
    Ok(user)
}

/// Change name, password or role of an account. Admin only; the id is immutable.
pub fn update_user(users: &mut [User], session: &Session, id: u64, update: UserUpdate) -> Result<User> {
    session.require_role(Role::Admin, "update users")?;
    let name = match update.name.as_deref() {
        Some(n) => Some(check_name(users, n, Some(id))?),
        None => None,
    };
    if let Some(p) = update.password.as_deref() {
        check_password(p)?;
    }

    let user = users
        .iter_mut()
        .find(|u| u.id == id)
        .ok_or_else(|| WorkflowError::not_found("user", id))?;
    if let Some(n) = name {
        user.name = n;
    }
    if let Some(p) = update.password.as_deref() {
        user.credential = Credential::new(p);
    }
    if let Some(r) = update.role {
        user.role = r;
    }
    info!(user_id = id, by = session.name(), "user updated");
    Ok(user.clone())
}

/// Remove an account. Admin only; admins cannot remove themselves.
pub fn delete_user(users: &mut Vec<User>, session: &Session, id: u64) -> Result<User> {
    session.require_role(Role::Admin, "delete users")?;
    if id == session.user_id() {
        return Err(WorkflowError::validation("cannot delete the account you are logged in with"));
    }
    let idx = users
        .iter()
        .position(|u| u.id == id)
        .ok_or_else(|| WorkflowError::not_found("user", id))?;
    let removed = users.remove(idx);
    info!(user_id = id, by = session.name(), "user deleted");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin_session(users: &[User]) -> Session {
        Session::new(users[0].clone())
    }

    #[test]
    fn test_default_users_cover_every_role() {
        let users = default_users();
        let counts = role_counts(&users);
        assert!(Role::ALL.iter().all(|r| counts[r] == 1));
        assert!(users[1].credential.verify("tu123"));
    }

    #[test]
    fn test_create_user_allocates_fresh_id() {
        let mut users = default_users();
        let session = admin_session(&users);
        let u = create_user(&mut users, &session, "  Citra Dewi ", "pw", Role::Staff).unwrap();
        assert_eq!(u.id, 5);
        assert_eq!(u.name, "Citra Dewi");
        assert_eq!(users.len(), 5);
        assert_eq!(names_with_role(&users, Role::Staff), vec!["Roza Erlinda", "Citra Dewi"]);
    }

    #[test]
    fn test_create_user_rejects_duplicates_and_blanks() {
        let mut users = default_users();
        let session = admin_session(&users);
        assert!(matches!(
            create_user(&mut users, &session, "Roza Erlinda", "pw", Role::Staff),
            Err(WorkflowError::ValidationFailed(_))
        ));
        assert!(matches!(
            create_user(&mut users, &session, "  ", "pw", Role::Staff),
            Err(WorkflowError::ValidationFailed(_))
        ));
        assert!(matches!(
            create_user(&mut users, &session, "New", "", Role::Staff),
            Err(WorkflowError::ValidationFailed(_))
        ));
        assert_eq!(users.len(), 4);
    }

    #[test]
    fn test_non_admin_cannot_manage_users() {
        let mut users = default_users();
        let staff = Session::new(users[3].clone());
        assert!(matches!(
            create_user(&mut users, &staff, "X", "pw", Role::Admin),
            Err(WorkflowError::PermissionDenied(_))
        ));
        assert!(matches!(delete_user(&mut users, &staff, 2), Err(WorkflowError::PermissionDenied(_))));
    }

    #[test]
    fn test_update_user_keeps_id() {
        let mut users = default_users();
        let session = admin_session(&users);
        let update = UserUpdate {
            name: Some("Roza E.".into()),
            password: Some("new-pass".into()),
            role: None,
        };
        let u = update_user(&mut users, &session, 4, update).unwrap();
        assert_eq!(u.id, 4);
        assert_eq!(u.name, "Roza E.");
        assert!(u.credential.verify("new-pass"));
        assert!(!u.credential.verify("staff123"));
        assert_eq!(u.role, Role::Staff);

        let missing = update_user(&mut users, &session, 99, UserUpdate::default());
        assert!(matches!(missing, Err(WorkflowError::NotFound { .. })));
    }

    #[test]
    fn test_update_user_allows_keeping_own_name() {
        let mut users = default_users();
        let session = admin_session(&users);
        let update = UserUpdate { name: Some("TU User".into()), ..Default::default() };
        assert!(update_user(&mut users, &session, 2, update).is_ok());
        let clash = UserUpdate { name: Some("Admin".into()), ..Default::default() };
        assert!(update_user(&mut users, &session, 2, clash).is_err());
    }

    #[test]
    fn test_delete_user() {
        let mut users = default_users();
        let session = admin_session(&users);
        assert!(delete_user(&mut users, &session, 1).is_err());
        let removed = delete_user(&mut users, &session, 2).unwrap();
        assert_eq!(removed.name, "TU User");
        assert_eq!(users.len(), 3);
        assert!(matches!(delete_user(&mut users, &session, 2), Err(WorkflowError::NotFound { .. })));
    }
}
