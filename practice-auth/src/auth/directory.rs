//! UserDirectory — the in-process owner of user records
//!
//! Uniqueness of username and email (case-insensitive) is enforced here on
//! create and edit. Permission checks happen in the engine before any call
//! reaches the directory; the directory only guards invariants about the
//! records themselves.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AuthError, Result};
use crate::roles::RoleCatalog;

use super::hasher::{strength, CredentialHasher};
use super::types::{eq_ignore_case, NewUser, User, UserPatch, UserStats};

/// Permission whose holders must never drop to zero
pub const USER_MANAGEMENT_PERMISSION: &str = "users.edit";

pub struct UserDirectory {
    roles: Arc<RoleCatalog>,
    hasher: CredentialHasher,
    enforce_password_policy: bool,
    /// Creation order
    users: Vec<User>,
}

impl UserDirectory {
    pub fn new(roles: Arc<RoleCatalog>, hasher: CredentialHasher, enforce_password_policy: bool) -> Self {
        Self {
            roles,
            hasher,
            enforce_password_policy,
            users: Vec::new(),
        }
    }

    /// Adopt records loaded from storage. Every `role_id` must exist in the catalog.
    pub fn load(&mut self, users: Vec<User>) -> Result<()> {
        for user in &users {
            if !self.roles.contains(&user.role_id) {
                return Err(AuthError::Config(format!(
                    "user '{}' references unknown role '{}'",
                    user.username, user.role_id
                )));
            }
        }
        debug!(count = users.len(), "User directory loaded");
        self.users = users;
        Ok(())
    }

    // ─── Queries ───

    pub fn get(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn find_by_login_identifier(&self, identifier: &str) -> Result<&User> {
        let identifier = identifier.trim();
        self.users
            .iter()
            .find(|u| u.matches_identifier(identifier))
            .ok_or_else(|| AuthError::NotFound(format!("user '{identifier}'")))
    }

    pub fn all(&self) -> &[User] {
        &self.users
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn stats(&self) -> UserStats {
        UserStats {
            total: self.users.len(),
            active: self.users.iter().filter(|u| u.is_active).count(),
        }
    }

    /// True if the user's role grants `permission`. Unknown roles grant nothing.
    pub fn user_grants(&self, user: &User, permission: &str) -> bool {
        self.roles
            .role_by_id(&user.role_id)
            .map(|role| role.grants(permission))
            .unwrap_or(false)
    }

    // ─── Mutations ───

    pub async fn create(&mut self, fields: NewUser, password: &str) -> Result<User> {
        let username = fields.username.trim().to_string();
        let email = fields.email.trim().to_string();
        validate_username(&username)?;
        validate_email(&email)?;
        self.ensure_unique(&username, &email, None)?;
        self.roles.role_by_id(&fields.role_id)?;
        self.check_policy(password)?;

        let password_hash = self.hasher.hash_async(password.to_string()).await?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            password_hash,
            first_name: fields.first_name.trim().to_string(),
            last_name: fields.last_name.trim().to_string(),
            role_id: fields.role_id,
            is_active: true,
            created_at: Utc::now(),
            last_login_at: None,
        };
        info!(user_id = %user.id, username = %user.username, role = %user.role_id, "User created");
        self.users.push(user.clone());
        Ok(user)
    }

    pub fn edit(&mut self, id: &str, patch: UserPatch) -> Result<User> {
        let index = self.index_of(id)?;

        let username = patch.username.as_deref().map(str::trim);
        let email = patch.email.as_deref().map(str::trim);
        if let Some(username) = username {
            validate_username(username)?;
        }
        if let Some(email) = email {
            validate_email(email)?;
        }
        self.ensure_unique(
            username.unwrap_or(&self.users[index].username),
            email.unwrap_or(&self.users[index].email),
            Some(id),
        )?;

        if let Some(role_id) = &patch.role_id {
            let new_role = self.roles.role_by_id(role_id)?;
            let current = &self.users[index];
            if current.is_active
                && self.user_grants(current, USER_MANAGEMENT_PERMISSION)
                && !new_role.grants(USER_MANAGEMENT_PERMISSION)
                && self.user_managers_except(id) == 0
            {
                return Err(AuthError::LastAdministrator);
            }
        }

        let username = username.map(str::to_string);
        let email = email.map(str::to_string);
        let user = &mut self.users[index];
        if let Some(username) = username {
            user.username = username;
        }
        if let Some(email) = email {
            user.email = email;
        }
        if let Some(first_name) = patch.first_name {
            user.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = patch.last_name {
            user.last_name = last_name.trim().to_string();
        }
        if let Some(role_id) = patch.role_id {
            user.role_id = role_id;
        }
        info!(user_id = %id, "User updated");
        Ok(user.clone())
    }

    /// Replace the stored hash. The only write path for credentials after creation.
    pub async fn set_password(&mut self, id: &str, password: &str) -> Result<()> {
        let index = self.index_of(id)?;
        self.check_policy(password)?;
        let password_hash = self.hasher.hash_async(password.to_string()).await?;
        self.users[index].password_hash = password_hash;
        info!(user_id = %id, "Password updated");
        Ok(())
    }

    pub fn delete(&mut self, id: &str, acting_user_id: &str) -> Result<User> {
        if id == acting_user_id {
            return Err(AuthError::CannotDeleteSelf);
        }
        let index = self.index_of(id)?;
        self.guard_last_manager(&self.users[index])?;
        let removed = self.users.remove(index);
        info!(user_id = %id, username = %removed.username, "User deleted");
        Ok(removed)
    }

    pub fn set_active(&mut self, id: &str, is_active: bool, acting_user_id: &str) -> Result<User> {
        let index = self.index_of(id)?;
        if !is_active {
            if id == acting_user_id {
                return Err(AuthError::CannotDeactivateSelf);
            }
            self.guard_last_manager(&self.users[index])?;
        }
        let user = &mut self.users[index];
        user.is_active = is_active;
        info!(user_id = %id, is_active, "User activation changed");
        Ok(user.clone())
    }

    /// Copy of the table, kept to undo a change the store refuses
    pub fn snapshot(&self) -> Vec<User> {
        self.users.clone()
    }

    pub fn restore(&mut self, users: Vec<User>) {
        self.users = users;
    }

    pub fn record_login(&mut self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let index = self.index_of(id)?;
        self.users[index].last_login_at = Some(at);
        Ok(())
    }

    // ─── Helpers ───

    fn index_of(&self, id: &str) -> Result<usize> {
        self.users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| AuthError::NotFound(format!("user {id}")))
    }

    fn ensure_unique(&self, username: &str, email: &str, except_id: Option<&str>) -> Result<()> {
        let others = self.users.iter().filter(|u| Some(u.id.as_str()) != except_id);
        for other in others {
            if eq_ignore_case(&other.username, username) {
                return Err(AuthError::DuplicateUser {
                    field: "username",
                    value: username.to_string(),
                });
            }
            if eq_ignore_case(&other.email, email) {
                return Err(AuthError::DuplicateUser {
                    field: "email",
                    value: email.to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_policy(&self, password: &str) -> Result<()> {
        if !self.enforce_password_policy {
            return Ok(());
        }
        let report = strength(password);
        if report.is_valid {
            Ok(())
        } else {
            Err(AuthError::WeakPassword(report.violations))
        }
    }

    /// Active users holding user-management permission, other than `id`
    fn user_managers_except(&self, id: &str) -> usize {
        self.users
            .iter()
            .filter(|u| u.id != id && u.is_active && self.user_grants(u, USER_MANAGEMENT_PERMISSION))
            .count()
    }

    /// Removing or disabling `target` must leave someone able to manage users.
    fn guard_last_manager(&self, target: &User) -> Result<()> {
        if target.is_active
            && self.user_grants(target, USER_MANAGEMENT_PERMISSION)
            && self.user_managers_except(&target.id) == 0
        {
            return Err(AuthError::LastAdministrator);
        }
        Ok(())
    }
}

fn validate_username(username: &str) -> Result<()> {
    if username.chars().count() < 3 {
        return Err(AuthError::Validation(
            "Username must be at least 3 characters".into(),
        ));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(AuthError::Validation(
            "Username cannot contain spaces".into(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AuthError::Validation("Invalid email address".into())),
    }
}
