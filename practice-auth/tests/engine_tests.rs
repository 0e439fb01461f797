//! AuthEngine integration tests — login, sessions, permissions, user management, audit

use std::sync::Arc;

use chrono::Duration;
use parking_lot::Mutex;

use practice_auth::auth::strength;
use practice_auth::{
    AuditAnnouncer, AuditEvent, AuditKind, AuthConfig, AuthEngine, AuthError, AuthHandle, AuthStore,
    BootstrapAdmin, HashCost, MemoryStore, NewUser, NoopAnnouncer, User, UserPatch, UserStats,
};

const ADMIN_PASSWORD: &str = "Adm1n!Secret";
const PASSWORD: &str = "Str0ng!Pass";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn test_config() -> AuthConfig {
    AuthConfig::in_memory()
        .with_hash_cost(HashCost { memory_kib: 256, iterations: 1, parallelism: 1 })
        .with_bootstrap_admin(BootstrapAdmin::new("admin", "admin@firm.test", ADMIN_PASSWORD))
}

async fn spawn() -> AuthHandle {
    init_tracing();
    AuthEngine::spawn(test_config()).await.unwrap()
}

/// Engine plus the store it writes to, for inspecting the audit trail without a login
async fn spawn_with_memory(config: AuthConfig) -> (AuthHandle, Arc<MemoryStore>) {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let handle = AuthEngine::spawn_with_store(config, store.clone(), Arc::new(NoopAnnouncer))
        .await
        .unwrap();
    (handle, store)
}

async fn login_admin(auth: &AuthHandle) -> User {
    auth.login("admin", ADMIN_PASSWORD).await.unwrap().user
}

async fn add_user(auth: &AuthHandle, username: &str, role: &str) -> User {
    auth.create_user(NewUser::new(username, format!("{username}@firm.test"), role), PASSWORD)
        .await
        .unwrap()
}

async fn kinds(store: &MemoryStore) -> Vec<AuditKind> {
    store.load_audit().await.unwrap().iter().map(|e| e.kind).collect()
}

// ─── Bootstrap & Login ───

#[tokio::test]
async fn test_bootstrap_admin_is_seeded_with_top_role() {
    let (auth, store) = spawn_with_memory(test_config()).await;
    let admin = login_admin(&auth).await;

    assert_eq!(admin.role_id, "admin");
    assert_eq!(admin.display_name(), "System Administrator");
    assert!(admin.last_login_at.is_some());

    let events = store.load_audit().await.unwrap();
    assert_eq!(events[0].kind, AuditKind::UserCreated);
    assert!(events[0].actor_user_id.is_none());
    assert_eq!(events[0].target_user_id.as_deref(), Some(admin.id.as_str()));
    assert_eq!(store.load_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_login_accepts_username_or_email_in_any_case() {
    let auth = spawn().await;
    let by_name = auth.login("ADMIN", ADMIN_PASSWORD).await.unwrap();
    let by_email = auth.login("Admin@Firm.Test", ADMIN_PASSWORD).await.unwrap();
    assert_eq!(by_name.user.id, by_email.user.id);
    assert_ne!(by_name.session.token, by_email.session.token);
    assert!(auth.is_logged_in().await);
}

#[tokio::test]
async fn test_unknown_identifier_and_wrong_password_look_identical() {
    let (auth, store) = spawn_with_memory(test_config()).await;

    let unknown = auth.login("nobody", ADMIN_PASSWORD).await.unwrap_err();
    let wrong = auth.login("admin", "Wr0ng!Password").await.unwrap_err();

    assert!(matches!(unknown, AuthError::InvalidCredentials));
    assert!(matches!(wrong, AuthError::InvalidCredentials));
    assert_eq!(unknown.to_string(), wrong.to_string());
    assert!(!auth.is_logged_in().await);

    let failures: Vec<AuditEvent> = store
        .load_audit()
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.kind == AuditKind::LoginFailure)
        .collect();
    assert_eq!(failures.len(), 2);
    assert!(failures.iter().all(|e| e.actor_user_id.is_none()));
    assert!(failures.iter().all(|e| !e.detail.contains(ADMIN_PASSWORD)));
}

#[tokio::test]
async fn test_password_typed_as_identifier_is_not_recorded() {
    let (auth, store) = spawn_with_memory(test_config()).await;

    let result = auth.login(ADMIN_PASSWORD, ADMIN_PASSWORD).await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));

    let events = store.load_audit().await.unwrap();
    let failure = events.iter().find(|e| e.kind == AuditKind::LoginFailure).unwrap();
    assert!(!failure.detail.contains(ADMIN_PASSWORD));
    assert_eq!(failure.detail, format!("unknown identifier ({} chars)", ADMIN_PASSWORD.len()));
}

#[tokio::test]
async fn test_inactive_account_is_reported_only_with_correct_password() {
    let auth = spawn().await;
    login_admin(&auth).await;
    let alice = add_user(&auth, "alice", "associate").await;
    auth.set_user_active(&alice.id, false).await.unwrap();
    auth.logout().await;

    let correct = auth.login("alice", PASSWORD).await;
    assert!(matches!(correct, Err(AuthError::AccountInactive)));

    let wrong = auth.login("alice", "Wr0ng!Password").await;
    assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
    assert!(!auth.is_logged_in().await);
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let (auth, store) = spawn_with_memory(test_config()).await;
    login_admin(&auth).await;

    assert!(auth.logout().await);
    assert!(!auth.logout().await);
    assert!(!auth.is_logged_in().await);
    assert!(auth.current_user().await.is_none());
    assert!(auth.current_session().await.is_none());

    let logouts = kinds(&store).await.into_iter().filter(|k| *k == AuditKind::Logout).count();
    assert_eq!(logouts, 1);
}

// ─── Sessions ───

#[tokio::test]
async fn test_relogin_replaces_session() {
    let auth = spawn().await;
    let first = auth.login("admin", ADMIN_PASSWORD).await.unwrap().session;
    let second = auth.login("admin", ADMIN_PASSWORD).await.unwrap().session;

    let current = auth.current_session().await.unwrap();
    assert_eq!(current.token, second.token);
    assert_ne!(current.token, first.token);
    assert_eq!(auth.active_session_count().await, 1);
}

#[tokio::test]
async fn test_login_as_another_user_ends_previous_session() {
    let (auth, store) = spawn_with_memory(test_config()).await;
    let admin = login_admin(&auth).await;
    add_user(&auth, "alice", "associate").await;

    let alice = auth.login("alice", PASSWORD).await.unwrap().user;
    assert_eq!(auth.current_user().await.unwrap().id, alice.id);
    assert_eq!(auth.active_session_count().await, 1);

    let events = store.load_audit().await.unwrap();
    assert!(events
        .iter()
        .any(|e| e.kind == AuditKind::Logout && e.actor_user_id.as_deref() == Some(admin.id.as_str())));
}

#[tokio::test]
async fn test_extend_session_moves_expiry_forward() {
    let auth = spawn().await;
    assert!(auth.extend_session().await.is_none());

    let session = auth.login("admin", ADMIN_PASSWORD).await.unwrap().session;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let extended = auth.extend_session().await.unwrap();

    assert_eq!(extended.token, session.token);
    assert!(extended.expires_at > session.expires_at);
    assert!(extended.is_active());
    assert!(auth.is_logged_in().await);
}

#[tokio::test]
async fn test_session_expires_lazily_and_is_audited() {
    let config = test_config().with_session_ttl(Duration::milliseconds(100));
    let (auth, store) = spawn_with_memory(config).await;

    let session = auth.login("admin", ADMIN_PASSWORD).await.unwrap().session;
    assert_eq!(session.expires_at - session.issued_at, Duration::milliseconds(100));

    tokio::time::sleep(std::time::Duration::from_millis(250)).await;

    assert!(!auth.is_logged_in().await);
    assert!(auth.current_user().await.is_none());
    assert!(auth.extend_session().await.is_none());
    assert!(!auth.has_permission("users.view").await);

    let expired = kinds(&store).await.into_iter().filter(|k| *k == AuditKind::SessionExpired).count();
    assert_eq!(expired, 1);
}

#[tokio::test]
async fn test_default_session_window_is_eight_hours() {
    let auth = spawn().await;
    let session = auth.login("admin", ADMIN_PASSWORD).await.unwrap().session;
    assert_eq!(session.expires_at - session.issued_at, Duration::hours(8));
    assert_eq!(session.token.len(), 64);
    assert_eq!(auth.purge_expired_sessions().await, 0);
}

// ─── Permissions ───

#[tokio::test]
async fn test_wildcard_grants_unlisted_permissions() {
    let auth = spawn().await;
    assert!(!auth.has_permission("users.view").await);

    login_admin(&auth).await;
    assert!(auth.has_permission("users.view").await);
    assert!(auth.has_permission("anything.at.all").await);
    assert!(auth.require_permission("reports.export").await.is_ok());
}

#[tokio::test]
async fn test_passive_check_is_not_audited_but_action_check_is() {
    let (auth, store) = spawn_with_memory(test_config()).await;
    login_admin(&auth).await;
    add_user(&auth, "pat", "paralegal").await;
    auth.login("pat", PASSWORD).await.unwrap();

    assert!(auth.has_permission("time.create").await);
    assert!(!auth.has_permission("users.delete").await);
    assert!(!kinds(&store).await.contains(&AuditKind::PermissionDenied));

    let denied = auth.require_permission("users.delete").await;
    assert!(matches!(denied, Err(AuthError::PermissionDenied(p)) if p == "users.delete"));
    let events = store.load_audit().await.unwrap();
    let last = events.last().unwrap();
    assert_eq!(last.kind, AuditKind::PermissionDenied);
    assert_eq!(last.detail, "users.delete");
}

#[tokio::test]
async fn test_user_management_requires_permission() {
    let auth = spawn().await;
    let anonymous = auth.create_user(NewUser::new("eve", "eve@firm.test", "admin"), PASSWORD).await;
    assert!(matches!(anonymous, Err(AuthError::PermissionDenied(_))));

    login_admin(&auth).await;
    let sam = add_user(&auth, "sam", "senior_associate").await;
    auth.login("sam", PASSWORD).await.unwrap();

    // senior associates may view users but not change them
    assert_eq!(auth.list_users().await.unwrap().len(), 2);
    assert!(matches!(
        auth.create_user(NewUser::new("eve", "eve@firm.test", "admin"), PASSWORD).await,
        Err(AuthError::PermissionDenied(_))
    ));
    assert!(matches!(
        auth.edit_user(&sam.id, UserPatch { role_id: Some("admin".into()), ..Default::default() }).await,
        Err(AuthError::PermissionDenied(_))
    ));
    assert!(matches!(auth.reset_password(&sam.id).await, Err(AuthError::PermissionDenied(_))));
}

#[tokio::test]
async fn test_role_change_takes_effect_immediately() {
    let auth = spawn().await;
    login_admin(&auth).await;
    let alice = add_user(&auth, "alice", "associate").await;
    auth.edit_user(&alice.id, UserPatch { role_id: Some("partner".into()), ..Default::default() })
        .await
        .unwrap();

    auth.login("alice", PASSWORD).await.unwrap();
    assert!(auth.has_permission("users.delete").await);
    assert!(!auth.has_permission("system.settings").await);
}

// ─── User Management ───

#[tokio::test]
async fn test_delete_self_fails_and_delete_other_succeeds() {
    let auth = spawn().await;
    let admin = login_admin(&auth).await;
    let alice = add_user(&auth, "alice", "associate").await;

    assert!(matches!(auth.delete_user(&admin.id).await, Err(AuthError::CannotDeleteSelf)));
    auth.delete_user(&alice.id).await.unwrap();

    let users = auth.list_users().await.unwrap();
    assert!(users.iter().all(|u| u.id != alice.id));
    assert_eq!(auth.user_stats().await.unwrap(), UserStats { total: 1, active: 1 });
    assert!(matches!(auth.delete_user(&alice.id).await, Err(AuthError::NotFound(_))));
}

#[tokio::test]
async fn test_duplicate_email_in_other_case_is_rejected_and_audited() {
    let (auth, store) = spawn_with_memory(test_config()).await;
    login_admin(&auth).await;
    add_user(&auth, "alice", "associate").await;

    let result = auth
        .create_user(NewUser::new("alice2", "ALICE@FIRM.TEST", "associate"), PASSWORD)
        .await;
    assert!(matches!(result, Err(AuthError::DuplicateUser { field: "email", .. })));

    let events = store.load_audit().await.unwrap();
    let last = events.last().unwrap();
    assert_eq!(last.kind, AuditKind::UserMutationRejected);
    assert!(last.detail.contains("already exists"));
}

#[tokio::test]
async fn test_edit_records_changed_fields() {
    let (auth, store) = spawn_with_memory(test_config()).await;
    login_admin(&auth).await;
    let alice = add_user(&auth, "alice", "associate").await;

    let patch = UserPatch { first_name: Some("Alicia".into()), ..Default::default() };
    let updated = auth.edit_user(&alice.id, patch).await.unwrap();
    assert_eq!(updated.first_name, "Alicia");

    let events = store.load_audit().await.unwrap();
    let last = events.last().unwrap();
    assert_eq!(last.kind, AuditKind::UserModified);
    assert_eq!(last.detail, "changed first_name");

    let empty = auth.edit_user(&alice.id, UserPatch::default()).await;
    assert!(matches!(empty, Err(AuthError::Validation(_))));
}

#[tokio::test]
async fn test_admin_cannot_lock_everyone_out() {
    let auth = spawn().await;
    let admin = login_admin(&auth).await;

    assert!(matches!(
        auth.set_user_active(&admin.id, false).await,
        Err(AuthError::CannotDeactivateSelf)
    ));
    let demote = UserPatch { role_id: Some("associate".into()), ..Default::default() };
    assert!(matches!(
        auth.edit_user(&admin.id, demote.clone()).await,
        Err(AuthError::LastAdministrator)
    ));

    add_user(&auth, "paula", "partner").await;
    auth.edit_user(&admin.id, demote).await.unwrap();
    assert!(!auth.has_permission("users.edit").await);
}

#[tokio::test]
async fn test_deactivate_and_reactivate_updates_stats() {
    let auth = spawn().await;
    login_admin(&auth).await;
    let alice = add_user(&auth, "alice", "associate").await;
    auth.set_user_active(&alice.id, false).await.unwrap();

    let stats = auth.user_stats().await.unwrap();
    assert_eq!(stats, UserStats { total: 2, active: 1 });
    let reactivated = auth.set_user_active(&alice.id, true).await.unwrap();
    assert!(reactivated.is_active);
}

// ─── Passwords ───

#[tokio::test]
async fn test_change_password_requires_current_password() {
    let auth = spawn().await;
    assert!(matches!(
        auth.change_password(ADMIN_PASSWORD, "N3w!Password").await,
        Err(AuthError::PermissionDenied(_))
    ));

    login_admin(&auth).await;
    assert!(matches!(
        auth.change_password("Wr0ng!Password", "N3w!Password").await,
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        auth.change_password(ADMIN_PASSWORD, "weak").await,
        Err(AuthError::WeakPassword(_))
    ));
    auth.change_password(ADMIN_PASSWORD, "N3w!Password").await.unwrap();
    auth.logout().await;

    assert!(matches!(auth.login("admin", ADMIN_PASSWORD).await, Err(AuthError::InvalidCredentials)));
    auth.login("admin", "N3w!Password").await.unwrap();
}

#[tokio::test]
async fn test_reset_password_returns_valid_generated_password() {
    let (auth, store) = spawn_with_memory(test_config()).await;
    login_admin(&auth).await;
    let alice = add_user(&auth, "alice", "associate").await;

    let generated = auth.reset_password(&alice.id).await.unwrap();
    assert_eq!(generated.chars().count(), 12);
    assert!(strength(&generated).is_valid);
    assert!(kinds(&store).await.contains(&AuditKind::PasswordChanged));

    // generated password never reaches the audit trail
    assert!(store.load_audit().await.unwrap().iter().all(|e| !e.detail.contains(&generated)));

    assert!(matches!(auth.login("alice", PASSWORD).await, Err(AuthError::InvalidCredentials)));
    let outcome = auth.login("alice", generated.as_str()).await.unwrap();
    assert_eq!(outcome.user.id, alice.id);
}

// ─── Audit ───

#[tokio::test]
async fn test_audit_log_is_gated_and_chronological() {
    let auth = spawn().await;
    assert!(matches!(auth.audit_log().await, Err(AuthError::PermissionDenied(_))));

    let admin = login_admin(&auth).await;
    let alice = add_user(&auth, "alice", "paralegal").await;

    let log = auth.audit_log().await.unwrap();
    assert!(log.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert_eq!(log.last().unwrap().kind, AuditKind::UserCreated);

    let recent = auth.recent_audit_events(1).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].target_user_id.as_deref(), Some(alice.id.as_str()));

    let activity = auth.user_activity(&admin.id, 100).await.unwrap();
    assert!(activity.iter().all(|e| e.involves(&admin.id)));
    assert!(activity.iter().any(|e| e.kind == AuditKind::LoginSuccess));

    auth.login("alice", PASSWORD).await.unwrap();
    assert!(matches!(auth.audit_log().await, Err(AuthError::PermissionDenied(_))));
    assert!(matches!(auth.recent_audit_events(5).await, Err(AuthError::PermissionDenied(_))));
}

#[derive(Default)]
struct Collecting(Mutex<Vec<AuditKind>>);

impl AuditAnnouncer for Collecting {
    fn announce(&self, event: &AuditEvent) {
        self.0.lock().push(event.kind);
    }
}

#[tokio::test]
async fn test_announcer_hears_every_event() {
    init_tracing();
    let announcer = Arc::new(Collecting::default());
    let auth = AuthEngine::spawn_with_store(test_config(), Arc::new(MemoryStore::new()), announcer.clone())
        .await
        .unwrap();

    login_admin(&auth).await;
    auth.logout().await;

    assert_eq!(
        *announcer.0.lock(),
        vec![AuditKind::UserCreated, AuditKind::LoginSuccess, AuditKind::Logout]
    );
}

#[tokio::test]
async fn test_roles_are_readable_from_handle() {
    let auth = spawn().await;
    let ids: Vec<&str> = auth.roles().roles().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["paralegal", "associate", "senior_associate", "partner", "admin"]);
    assert_eq!(auth.roles().role_by_id("partner").unwrap().display_meta.badge, "PT");
}
