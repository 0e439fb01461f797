//! Error types for practice-auth — Railway Programming
//!
//! All operations return `Result<T, AuthError>`.
//! The `Display` text of each variant is the message surfaced to the user.

use thiserror::Error;

/// Unified error type for all authentication and authorization operations
#[derive(Error, Debug)]
pub enum AuthError {
    // ─── Credential Errors ───

    /// Same message whether the identifier or the password was wrong.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("This account has been deactivated")]
    AccountInactive,

    #[error("Password does not meet the requirements: {}", .0.join("; "))]
    WeakPassword(Vec<String>),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    // ─── Directory Errors ───

    #[error("A user with {field} '{value}' already exists")]
    DuplicateUser { field: &'static str, value: String },

    #[error("Unknown role: {0}")]
    InvalidRole(String),

    #[error("You cannot delete your own account")]
    CannotDeleteSelf,

    #[error("You cannot deactivate your own account")]
    CannotDeactivateSelf,

    #[error("At least one active user must keep user-management access")]
    LastAdministrator,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    // ─── Authorization Errors ───

    #[error("You do not have permission to perform this action ({0})")]
    PermissionDenied(String),

    // ─── Infrastructure Errors ───

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Actor unavailable: {0}")]
    ActorUnavailable(String),
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::Serialization(err.to_string())
    }
}

/// Result type alias for auth operations
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weak_password_lists_violations() {
        let err = AuthError::WeakPassword(vec![
            "at least 8 characters".into(),
            "a digit".into(),
        ]);
        assert_eq!(
            err.to_string(),
            "Password does not meet the requirements: at least 8 characters; a digit"
        );
    }

    #[test]
    fn test_duplicate_user_message() {
        let err = AuthError::DuplicateUser {
            field: "email",
            value: "a@b.com".into(),
        };
        assert_eq!(err.to_string(), "A user with email 'a@b.com' already exists");
    }
}
