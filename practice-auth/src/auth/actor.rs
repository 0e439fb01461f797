//! AuthEngine — Tokio actor owning all auth state
//!
//! Every operation is a message processed in order on one task, so the
//! user directory, session registry, and audit log have a single writer.
//! Argon2 work runs on the blocking pool; while it runs, further messages
//! wait in the channel.
//!
//! # Usage
//!
//! ```rust,no_run
//! use practice_auth::{AuthConfig, AuthEngine, BootstrapAdmin, NewUser};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthConfig::new("/data/practice")
//!         .with_bootstrap_admin(BootstrapAdmin::new("admin", "admin@firm.test", "Chang3-me!now"));
//!
//!     let auth = AuthEngine::spawn(config).await?;
//!
//!     // Username or email
//!     let outcome = auth.login("admin@firm.test", "Chang3-me!now").await?;
//!     println!("signed in as {}", outcome.user.display_name());
//!
//!     // Action checks are audited; has_permission is for UI gating only
//!     if auth.has_permission("users.create").await {
//!         auth.create_user(
//!             NewUser::new("jdoe", "jdoe@firm.test", "associate").with_name("Jane", "Doe"),
//!             "Welc0me!2024",
//!         ).await?;
//!     }
//!
//!     auth.logout().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::audit::{AuditAnnouncer, AuditEvent, AuditKind, AuditLog, NoopAnnouncer};
use crate::config::{AuthConfig, BootstrapAdmin};
use crate::error::{AuthError, Result};
use crate::roles::RoleCatalog;
use crate::store::{open_store, AuthStore};

use super::directory::UserDirectory;
use super::hasher::{generate_secure_password, CredentialHasher};
use super::sessions::{fingerprint, SessionRegistry};
use super::types::*;

pub const PERM_USERS_VIEW: &str = "users.view";
pub const PERM_USERS_CREATE: &str = "users.create";
pub const PERM_USERS_EDIT: &str = "users.edit";
pub const PERM_USERS_DELETE: &str = "users.delete";

// ─── Actor Messages ───

enum AuthMsg {
    Login {
        identifier: String,
        password: String,
        reply: oneshot::Sender<Result<LoginOutcome>>,
    },
    Logout {
        reply: oneshot::Sender<bool>,
    },
    CurrentSession {
        reply: oneshot::Sender<Option<Session>>,
    },
    CurrentUser {
        reply: oneshot::Sender<Option<User>>,
    },
    ExtendSession {
        reply: oneshot::Sender<Option<Session>>,
    },
    HasPermission {
        permission: String,
        reply: oneshot::Sender<bool>,
    },
    RequirePermission {
        permission: String,
        reply: oneshot::Sender<Result<User>>,
    },
    PurgeExpired {
        reply: oneshot::Sender<usize>,
    },
    ActiveSessions {
        reply: oneshot::Sender<usize>,
    },
    AuditLog {
        reply: oneshot::Sender<Result<Vec<AuditEvent>>>,
    },
    RecentAudit {
        limit: usize,
        reply: oneshot::Sender<Result<Vec<AuditEvent>>>,
    },
    UserActivity {
        user_id: String,
        limit: usize,
        reply: oneshot::Sender<Result<Vec<AuditEvent>>>,
    },
    CreateUser {
        fields: NewUser,
        password: String,
        reply: oneshot::Sender<Result<User>>,
    },
    EditUser {
        user_id: String,
        patch: UserPatch,
        reply: oneshot::Sender<Result<User>>,
    },
    DeleteUser {
        user_id: String,
        reply: oneshot::Sender<Result<()>>,
    },
    SetUserActive {
        user_id: String,
        is_active: bool,
        reply: oneshot::Sender<Result<User>>,
    },
    ListUsers {
        reply: oneshot::Sender<Result<Vec<User>>>,
    },
    UserStats {
        reply: oneshot::Sender<Result<UserStats>>,
    },
    ChangePassword {
        current_password: String,
        new_password: String,
        reply: oneshot::Sender<Result<()>>,
    },
    ResetPassword {
        user_id: String,
        reply: oneshot::Sender<Result<String>>,
    },
}

// ─── Actor ───

/// Auth engine actor: login, logout, permission checks, user management
pub struct AuthEngine {
    hasher: CredentialHasher,
    directory: UserDirectory,
    sessions: SessionRegistry,
    audit: AuditLog,
    store: Arc<dyn AuthStore>,
    generated_password_length: usize,
    /// Token of the session the application is acting under
    current: Option<String>,
    /// Verified against when the identifier is unknown, so both failure paths cost one hash
    dummy_hash: String,
    rx: mpsc::Receiver<AuthMsg>,
}

impl AuthEngine {
    /// Spawn with the store selected by `config.data_dir`
    pub async fn spawn(config: AuthConfig) -> Result<AuthHandle> {
        let store = open_store(&config).await?;
        Self::spawn_with_store(config, store, Arc::new(NoopAnnouncer)).await
    }

    /// Spawn with an explicit store and audit announcer
    pub async fn spawn_with_store(
        config: AuthConfig,
        store: Arc<dyn AuthStore>,
        announcer: Arc<dyn AuditAnnouncer>,
    ) -> Result<AuthHandle> {
        let roles = Arc::new(RoleCatalog::standard());
        let hasher = CredentialHasher::new(config.hash_cost)?;

        let mut directory = UserDirectory::new(roles.clone(), hasher.clone(), config.enforce_password_policy);
        directory.load(store.load_users().await?)?;
        let audit = AuditLog::with_events(announcer, store.load_audit().await?);

        let dummy_hash = hasher.hash_async(generate_secure_password(16)).await?;

        let (tx, rx) = mpsc::channel(256);
        let mut engine = Self {
            hasher,
            directory,
            sessions: SessionRegistry::new(config.session_ttl),
            audit,
            store,
            generated_password_length: config.generated_password_length,
            current: None,
            dummy_hash,
            rx,
        };

        if engine.directory.is_empty() {
            if let Some(admin) = config.bootstrap_admin {
                engine.bootstrap(admin, roles.most_senior().id.clone()).await?;
            }
        }

        let stats = engine.directory.stats();
        tokio::spawn(engine.run());
        info!(users = stats.total, active = stats.active, "AuthEngine spawned");
        Ok(AuthHandle { tx, roles })
    }

    /// Main event loop
    async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                AuthMsg::Login { identifier, password, reply } => {
                    let _ = reply.send(self.handle_login(identifier, password).await);
                }
                AuthMsg::Logout { reply } => {
                    let _ = reply.send(self.handle_logout().await);
                }
                AuthMsg::CurrentSession { reply } => {
                    let _ = reply.send(self.current_session().await);
                }
                AuthMsg::CurrentUser { reply } => {
                    let _ = reply.send(self.current_user().await);
                }
                AuthMsg::ExtendSession { reply } => {
                    let _ = reply.send(self.handle_extend().await);
                }
                AuthMsg::HasPermission { permission, reply } => {
                    let _ = reply.send(self.handle_has_permission(&permission).await);
                }
                AuthMsg::RequirePermission { permission, reply } => {
                    let _ = reply.send(self.authorize(&permission).await);
                }
                AuthMsg::PurgeExpired { reply } => {
                    let _ = reply.send(self.handle_purge().await);
                }
                AuthMsg::ActiveSessions { reply } => {
                    let _ = reply.send(self.sessions.active_count_at(Utc::now()));
                }
                AuthMsg::AuditLog { reply } => {
                    let _ = reply.send(self.handle_audit_log().await);
                }
                AuthMsg::RecentAudit { limit, reply } => {
                    let _ = reply.send(self.handle_recent_audit(limit).await);
                }
                AuthMsg::UserActivity { user_id, limit, reply } => {
                    let _ = reply.send(self.handle_user_activity(&user_id, limit).await);
                }
                AuthMsg::CreateUser { fields, password, reply } => {
                    let _ = reply.send(self.handle_create_user(fields, password).await);
                }
                AuthMsg::EditUser { user_id, patch, reply } => {
                    let _ = reply.send(self.handle_edit_user(&user_id, patch).await);
                }
                AuthMsg::DeleteUser { user_id, reply } => {
                    let _ = reply.send(self.handle_delete_user(&user_id).await);
                }
                AuthMsg::SetUserActive { user_id, is_active, reply } => {
                    let _ = reply.send(self.handle_set_active(&user_id, is_active).await);
                }
                AuthMsg::ListUsers { reply } => {
                    let _ = reply.send(self.handle_list_users().await);
                }
                AuthMsg::UserStats { reply } => {
                    let _ = reply.send(self.handle_user_stats().await);
                }
                AuthMsg::ChangePassword { current_password, new_password, reply } => {
                    let _ = reply.send(self.handle_change_password(current_password, new_password).await);
                }
                AuthMsg::ResetPassword { user_id, reply } => {
                    let _ = reply.send(self.handle_reset_password(&user_id).await);
                }
            }
        }
        info!("AuthEngine stopped");
    }

    // ─── Startup ───

    async fn bootstrap(&mut self, admin: BootstrapAdmin, role_id: String) -> Result<()> {
        let fields = NewUser::new(admin.username, admin.email, role_id)
            .with_name(admin.first_name, admin.last_name);
        let user = self.directory.create(fields, &admin.password).await?;
        self.persist_users().await?;
        let detail = format!("bootstrap administrator '{}' created as {}", user.username, user.role_id);
        self.record(AuditKind::UserCreated, None, Some(&user.id), detail).await;
        info!(user_id = %user.id, "Bootstrap administrator created");
        Ok(())
    }

    // ─── Session Handlers ───

    async fn handle_login(&mut self, identifier: String, password: String) -> Result<LoginOutcome> {
        let found = self
            .directory
            .find_by_login_identifier(&identifier)
            .ok()
            .map(|u| (u.id.clone(), u.password_hash.clone(), u.is_active));

        let Some((user_id, stored_hash, is_active)) = found else {
            self.hasher.verify_async(password, self.dummy_hash.clone()).await;
            // The identifier field sometimes holds a mistyped password
            let detail = format!("unknown identifier ({} chars)", identifier.trim().chars().count());
            self.record(AuditKind::LoginFailure, None, None, detail).await;
            debug!("Login failed: unknown identifier");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify_async(password, stored_hash).await {
            self.record(AuditKind::LoginFailure, None, Some(&user_id), "wrong password").await;
            debug!(user_id = %user_id, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        if !is_active {
            self.record(AuditKind::LoginFailure, Some(&user_id), Some(&user_id), "account inactive")
                .await;
            info!(user_id = %user_id, "Login refused: account inactive");
            return Err(AuthError::AccountInactive);
        }

        // The application acts as one user at a time
        if let Some(previous) = self.current.take() {
            if let SessionLookup::Active(session) = self.sessions.get(&previous) {
                self.sessions.terminate(&previous);
                self.record(
                    AuditKind::Logout,
                    Some(&session.user_id),
                    Some(&session.user_id),
                    "session replaced by a new login",
                )
                .await;
            }
        }

        let now = Utc::now();
        let session = match self.sessions.issue_at(&user_id, now) {
            Ok(session) => session,
            Err(e) => {
                self.record(AuditKind::LoginFailure, Some(&user_id), Some(&user_id), "session could not be issued")
                    .await;
                return Err(e);
            }
        };
        self.directory.record_login(&user_id, now)?;
        if let Err(e) = self.persist_users().await {
            warn!(error = %e, "Failed to persist last login time");
        }
        self.record(AuditKind::LoginSuccess, Some(&user_id), Some(&user_id), "login").await;
        self.current = Some(session.token.clone());

        let user = self
            .directory
            .get(&user_id)
            .cloned()
            .ok_or_else(|| AuthError::NotFound(format!("user {user_id}")))?;
        info!(user_id = %user.id, username = %user.username, token = %fingerprint(&session.token), "Login successful");
        Ok(LoginOutcome { user, session })
    }

    async fn handle_logout(&mut self) -> bool {
        let Some(token) = self.current.take() else {
            return false;
        };
        match self.sessions.get(&token) {
            SessionLookup::Active(session) => {
                self.sessions.terminate(&token);
                self.record(AuditKind::Logout, Some(&session.user_id), Some(&session.user_id), "logout")
                    .await;
                info!(user_id = %session.user_id, "Logged out");
                true
            }
            SessionLookup::Expired(session) => {
                self.record_expired(&session).await;
                false
            }
            SessionLookup::NotFound => false,
        }
    }

    /// The current session if still active. Observing it expired clears it.
    async fn current_session(&mut self) -> Option<Session> {
        let token = self.current.clone()?;
        match self.sessions.get(&token) {
            SessionLookup::Active(session) => Some(session),
            SessionLookup::Expired(session) => {
                self.current = None;
                self.record_expired(&session).await;
                None
            }
            SessionLookup::NotFound => {
                self.current = None;
                None
            }
        }
    }

    async fn current_user(&mut self) -> Option<User> {
        let session = self.current_session().await?;
        self.directory.get(&session.user_id).cloned()
    }

    async fn handle_extend(&mut self) -> Option<Session> {
        let session = self.current_session().await?;
        self.sessions.extend(&session.token).ok()
    }

    async fn handle_has_permission(&mut self, permission: &str) -> bool {
        match self.current_user().await {
            Some(user) => user.is_active && self.directory.user_grants(&user, permission),
            None => false,
        }
    }

    async fn handle_purge(&mut self) -> usize {
        // Resolve the current session first so its expiry is audited
        self.current_session().await;
        let purged = self.sessions.purge_expired();
        if purged > 0 {
            debug!(purged, "Expired sessions purged");
        }
        purged
    }

    /// Action-level check: denial is audited. Returns the acting user.
    async fn authorize(&mut self, permission: &str) -> Result<User> {
        let Some(session) = self.current_session().await else {
            let detail = format!("{permission}: not logged in");
            self.record(AuditKind::PermissionDenied, None, None, detail).await;
            return Err(AuthError::PermissionDenied(permission.to_string()));
        };
        let Some(user) = self.directory.get(&session.user_id).cloned() else {
            self.sessions.terminate(&session.token);
            self.current = None;
            let detail = format!("{permission}: session user no longer exists");
            self.record(AuditKind::PermissionDenied, Some(&session.user_id), None, detail).await;
            return Err(AuthError::PermissionDenied(permission.to_string()));
        };
        if !user.is_active || !self.directory.user_grants(&user, permission) {
            self.record(AuditKind::PermissionDenied, Some(&user.id), None, permission).await;
            warn!(user_id = %user.id, permission, "Permission denied");
            return Err(AuthError::PermissionDenied(permission.to_string()));
        }
        self.sessions.touch(&session.token);
        Ok(user)
    }

    // ─── Audit Handlers ───

    async fn handle_audit_log(&mut self) -> Result<Vec<AuditEvent>> {
        self.authorize(PERM_USERS_VIEW).await?;
        Ok(self.audit.events().to_vec())
    }

    async fn handle_recent_audit(&mut self, limit: usize) -> Result<Vec<AuditEvent>> {
        self.authorize(PERM_USERS_VIEW).await?;
        Ok(self.audit.recent(limit))
    }

    async fn handle_user_activity(&mut self, user_id: &str, limit: usize) -> Result<Vec<AuditEvent>> {
        self.authorize(PERM_USERS_VIEW).await?;
        Ok(self.audit.for_user(user_id, limit))
    }

    // ─── User Management Handlers ───

    async fn handle_create_user(&mut self, fields: NewUser, password: String) -> Result<User> {
        let actor = self.authorize(PERM_USERS_CREATE).await?;
        let username = fields.username.trim().to_string();
        let before = self.directory.snapshot();
        let result = match self.directory.create(fields, &password).await {
            Ok(user) => self.commit_users(before).await.map(|()| user),
            Err(e) => Err(e),
        };
        match result {
            Ok(user) => {
                let detail = format!("created '{}' as {}", user.username, user.role_id);
                self.record(AuditKind::UserCreated, Some(&actor.id), Some(&user.id), detail).await;
                Ok(user)
            }
            Err(e) => {
                self.reject(&actor.id, None, format!("create '{username}'"), &e).await;
                Err(e)
            }
        }
    }

    async fn handle_edit_user(&mut self, user_id: &str, patch: UserPatch) -> Result<User> {
        let actor = self.authorize(PERM_USERS_EDIT).await?;
        if patch.is_empty() {
            let e = AuthError::Validation("Nothing to update".into());
            self.reject(&actor.id, Some(user_id), "edit".into(), &e).await;
            return Err(e);
        }
        let changed = changed_fields(&patch).join(", ");
        let before = self.directory.snapshot();
        let result = match self.directory.edit(user_id, patch) {
            Ok(user) => self.commit_users(before).await.map(|()| user),
            Err(e) => Err(e),
        };
        match result {
            Ok(user) => {
                let detail = format!("changed {changed}");
                self.record(AuditKind::UserModified, Some(&actor.id), Some(user_id), detail).await;
                Ok(user)
            }
            Err(e) => {
                self.reject(&actor.id, Some(user_id), format!("edit {changed}"), &e).await;
                Err(e)
            }
        }
    }

    async fn handle_delete_user(&mut self, user_id: &str) -> Result<()> {
        let actor = self.authorize(PERM_USERS_DELETE).await?;
        let before = self.directory.snapshot();
        let result = match self.directory.delete(user_id, &actor.id) {
            Ok(removed) => self.commit_users(before).await.map(|()| removed),
            Err(e) => Err(e),
        };
        match result {
            Ok(removed) => {
                self.sessions.terminate_user(user_id);
                let detail = format!("deleted '{}'", removed.username);
                self.record(AuditKind::UserDeleted, Some(&actor.id), Some(user_id), detail).await;
                Ok(())
            }
            Err(e) => {
                self.reject(&actor.id, Some(user_id), "delete".into(), &e).await;
                Err(e)
            }
        }
    }

    async fn handle_set_active(&mut self, user_id: &str, is_active: bool) -> Result<User> {
        let actor = self.authorize(PERM_USERS_EDIT).await?;
        let action = if is_active { "activate" } else { "deactivate" };
        let before = self.directory.snapshot();
        let result = match self.directory.set_active(user_id, is_active, &actor.id) {
            Ok(user) => self.commit_users(before).await.map(|()| user),
            Err(e) => Err(e),
        };
        match result {
            Ok(user) => {
                if !is_active {
                    self.sessions.terminate_user(user_id);
                }
                let detail = format!("{action}d");
                self.record(AuditKind::UserModified, Some(&actor.id), Some(user_id), detail).await;
                Ok(user)
            }
            Err(e) => {
                self.reject(&actor.id, Some(user_id), action.into(), &e).await;
                Err(e)
            }
        }
    }

    async fn handle_list_users(&mut self) -> Result<Vec<User>> {
        self.authorize(PERM_USERS_VIEW).await?;
        Ok(self.directory.all().to_vec())
    }

    async fn handle_user_stats(&mut self) -> Result<UserStats> {
        self.authorize(PERM_USERS_VIEW).await?;
        Ok(self.directory.stats())
    }

    /// Self-service: any logged-in user, proven by the current password
    async fn handle_change_password(&mut self, current_password: String, new_password: String) -> Result<()> {
        let Some(user) = self.current_user().await else {
            self.record(AuditKind::PermissionDenied, None, None, "change password: not logged in").await;
            return Err(AuthError::PermissionDenied("login required".into()));
        };
        let stored_hash = user.password_hash.clone();
        if !self.hasher.verify_async(current_password, stored_hash).await {
            self.reject(&user.id, Some(&user.id), "change password".into(), &AuthError::InvalidCredentials)
                .await;
            return Err(AuthError::InvalidCredentials);
        }
        let before = self.directory.snapshot();
        let result = match self.directory.set_password(&user.id, &new_password).await {
            Ok(()) => self.commit_users(before).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            self.reject(&user.id, Some(&user.id), "change password".into(), &e).await;
            return Err(e);
        }
        self.record(AuditKind::PasswordChanged, Some(&user.id), Some(&user.id), "changed by user").await;
        Ok(())
    }

    /// Administrative reset: returns the generated password once
    async fn handle_reset_password(&mut self, user_id: &str) -> Result<String> {
        let actor = self.authorize(PERM_USERS_EDIT).await?;
        let password = generate_secure_password(self.generated_password_length);
        let before = self.directory.snapshot();
        let result = match self.directory.set_password(user_id, &password).await {
            Ok(()) => self.commit_users(before).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            self.reject(&actor.id, Some(user_id), "reset password".into(), &e).await;
            return Err(e);
        }
        self.sessions.terminate_user(user_id);
        self.record(AuditKind::PasswordChanged, Some(&actor.id), Some(user_id), "reset by administrator")
            .await;
        Ok(password)
    }

    // ─── Helpers ───

    /// Append to the in-memory log, then to the store. A store failure is logged, not returned.
    async fn record(
        &mut self,
        kind: AuditKind,
        actor_user_id: Option<&str>,
        target_user_id: Option<&str>,
        detail: impl Into<String>,
    ) {
        let event = self.audit.record(kind, actor_user_id, target_user_id, detail);
        if let Err(e) = self.store.append_audit(&event).await {
            warn!(error = %e, kind = %event.kind, "Failed to persist audit event");
        }
    }

    async fn record_expired(&mut self, session: &Session) {
        self.record(
            AuditKind::SessionExpired,
            Some(&session.user_id),
            Some(&session.user_id),
            format!("expired at {}", session.expires_at.to_rfc3339()),
        )
        .await;
        info!(user_id = %session.user_id, "Session expired");
    }

    async fn reject(&mut self, actor_id: &str, target_id: Option<&str>, action: String, err: &AuthError) {
        self.record(
            AuditKind::UserMutationRejected,
            Some(actor_id),
            target_id,
            format!("{action}: {err}"),
        )
        .await;
    }

    async fn persist_users(&self) -> Result<()> {
        self.store.save_users(self.directory.all()).await
    }

    /// Save the mutated table; if the store refuses, put `before` back
    async fn commit_users(&mut self, before: Vec<User>) -> Result<()> {
        if let Err(e) = self.persist_users().await {
            warn!(error = %e, "Failed to persist users, change rolled back");
            self.directory.restore(before);
            return Err(e);
        }
        Ok(())
    }
}

/// Names of the fields a patch sets, for audit detail
fn changed_fields(patch: &UserPatch) -> Vec<&'static str> {
    [
        ("username", patch.username.is_some()),
        ("email", patch.email.is_some()),
        ("first_name", patch.first_name.is_some()),
        ("last_name", patch.last_name.is_some()),
        ("role", patch.role_id.is_some()),
    ]
    .into_iter()
    .filter_map(|(name, set)| set.then_some(name))
    .collect()
}

// ─── Handle (client-facing API) ───

/// Cloneable handle to the AuthEngine
#[derive(Clone)]
pub struct AuthHandle {
    tx: mpsc::Sender<AuthMsg>,
    roles: Arc<RoleCatalog>,
}

impl AuthHandle {
    async fn call<T>(&self, msg: impl FnOnce(oneshot::Sender<T>) -> AuthMsg) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(msg(reply))
            .await
            .map_err(|_| AuthError::ActorUnavailable("AuthEngine".into()))?;
        rx.await
            .map_err(|_| AuthError::ActorUnavailable("AuthEngine dropped".into()))
    }

    /// Read-only role catalog; no round-trip to the actor
    pub fn roles(&self) -> &RoleCatalog {
        &self.roles
    }

    // ─── Sessions ───

    /// Authenticate by username or email
    pub async fn login(&self, identifier: impl Into<String>, password: impl Into<String>) -> Result<LoginOutcome> {
        let (identifier, password) = (identifier.into(), password.into());
        self.call(|reply| AuthMsg::Login { identifier, password, reply }).await?
    }

    /// End the current session. Returns `false` if there was none.
    pub async fn logout(&self) -> bool {
        self.call(|reply| AuthMsg::Logout { reply }).await.unwrap_or(false)
    }

    pub async fn is_logged_in(&self) -> bool {
        self.current_session().await.is_some()
    }

    pub async fn current_session(&self) -> Option<Session> {
        self.call(|reply| AuthMsg::CurrentSession { reply }).await.ok()?
    }

    pub async fn current_user(&self) -> Option<User> {
        self.call(|reply| AuthMsg::CurrentUser { reply }).await.ok()?
    }

    /// Push the current session's expiry forward. `None` when not logged in.
    pub async fn extend_session(&self) -> Option<Session> {
        self.call(|reply| AuthMsg::ExtendSession { reply }).await.ok()?
    }

    /// Passive check for UI gating; never audited
    pub async fn has_permission(&self, permission: impl Into<String>) -> bool {
        let permission = permission.into();
        self.call(|reply| AuthMsg::HasPermission { permission, reply })
            .await
            .unwrap_or(false)
    }

    /// Check before an action; a denial is recorded as `permission_denied`
    pub async fn require_permission(&self, permission: impl Into<String>) -> Result<User> {
        let permission = permission.into();
        self.call(|reply| AuthMsg::RequirePermission { permission, reply }).await?
    }

    /// Drop every expired session; returns how many were removed
    pub async fn purge_expired_sessions(&self) -> usize {
        self.call(|reply| AuthMsg::PurgeExpired { reply }).await.unwrap_or(0)
    }

    pub async fn active_session_count(&self) -> usize {
        self.call(|reply| AuthMsg::ActiveSessions { reply }).await.unwrap_or(0)
    }

    // ─── Audit ───

    /// Full trail, oldest first. Requires `users.view`.
    pub async fn audit_log(&self) -> Result<Vec<AuditEvent>> {
        self.call(|reply| AuthMsg::AuditLog { reply }).await?
    }

    /// Newest first. Requires `users.view`.
    pub async fn recent_audit_events(&self, limit: usize) -> Result<Vec<AuditEvent>> {
        self.call(|reply| AuthMsg::RecentAudit { limit, reply }).await?
    }

    /// Events where `user_id` is actor or target, newest first. Requires `users.view`.
    pub async fn user_activity(&self, user_id: impl Into<String>, limit: usize) -> Result<Vec<AuditEvent>> {
        let user_id = user_id.into();
        self.call(|reply| AuthMsg::UserActivity { user_id, limit, reply }).await?
    }

    // ─── Users ───

    pub async fn create_user(&self, fields: NewUser, password: impl Into<String>) -> Result<User> {
        let password = password.into();
        self.call(|reply| AuthMsg::CreateUser { fields, password, reply }).await?
    }

    pub async fn edit_user(&self, user_id: impl Into<String>, patch: UserPatch) -> Result<User> {
        let user_id = user_id.into();
        self.call(|reply| AuthMsg::EditUser { user_id, patch, reply }).await?
    }

    pub async fn delete_user(&self, user_id: impl Into<String>) -> Result<()> {
        let user_id = user_id.into();
        self.call(|reply| AuthMsg::DeleteUser { user_id, reply }).await?
    }

    pub async fn set_user_active(&self, user_id: impl Into<String>, is_active: bool) -> Result<User> {
        let user_id = user_id.into();
        self.call(|reply| AuthMsg::SetUserActive { user_id, is_active, reply }).await?
    }

    /// Creation order
    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.call(|reply| AuthMsg::ListUsers { reply }).await?
    }

    pub async fn user_stats(&self) -> Result<UserStats> {
        self.call(|reply| AuthMsg::UserStats { reply }).await?
    }

    pub async fn change_password(
        &self,
        current_password: impl Into<String>,
        new_password: impl Into<String>,
    ) -> Result<()> {
        let (current_password, new_password) = (current_password.into(), new_password.into());
        self.call(|reply| AuthMsg::ChangePassword { current_password, new_password, reply })
            .await?
    }

    /// Generate a new password for `user_id` and end their session
    pub async fn reset_password(&self, user_id: impl Into<String>) -> Result<String> {
        let user_id = user_id.into();
        self.call(|reply| AuthMsg::ResetPassword { user_id, reply }).await?
    }
}
