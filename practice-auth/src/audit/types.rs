//! Audit domain types — AuditKind, AuditEvent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Security-relevant event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    // Session events
    LoginSuccess,
    LoginFailure,
    Logout,
    SessionExpired,
    // Authorization events
    PermissionDenied,
    // User management events
    UserCreated,
    UserModified,
    UserDeleted,
    PasswordChanged,
    UserMutationRejected,
}

impl AuditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginSuccess => "login_success",
            Self::LoginFailure => "login_failure",
            Self::Logout => "logout",
            Self::SessionExpired => "session_expired",
            Self::PermissionDenied => "permission_denied",
            Self::UserCreated => "user_created",
            Self::UserModified => "user_modified",
            Self::UserDeleted => "user_deleted",
            Self::PasswordChanged => "password_changed",
            Self::UserMutationRejected => "user_mutation_rejected",
        }
    }

    /// Failure-side events, surfaced as warnings by `TracingAnnouncer`
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::LoginFailure | Self::PermissionDenied | Self::UserMutationRejected
        )
    }
}

impl std::fmt::Display for AuditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: AuditKind,
    /// `None` when identity was never confirmed (failed logins)
    pub actor_user_id: Option<String>,
    pub target_user_id: Option<String>,
    /// Diagnostic text; never a password, hash, or token
    pub detail: String,
}

impl AuditEvent {
    /// True if `user_id` is the actor or the target
    pub fn involves(&self, user_id: &str) -> bool {
        self.actor_user_id.as_deref() == Some(user_id) || self.target_user_id.as_deref() == Some(user_id)
    }
}
