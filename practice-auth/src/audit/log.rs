//! AuditLog — append-only, in-order record of security events
//!
//! Events are only ever appended. The optional announcer is told about each
//! event as it is recorded; persistence is the engine's job.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::types::{AuditEvent, AuditKind};

/// Something that wants to hear about audit events as they happen
pub trait AuditAnnouncer: Send + Sync {
    fn announce(&self, event: &AuditEvent);
}

/// Default announcer: does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAnnouncer;

impl AuditAnnouncer for NoopAnnouncer {
    fn announce(&self, _event: &AuditEvent) {}
}

/// Mirrors audit events into the tracing stream
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnnouncer;

impl AuditAnnouncer for TracingAnnouncer {
    fn announce(&self, event: &AuditEvent) {
        let actor = event.actor_user_id.as_deref().unwrap_or("-");
        let target = event.target_user_id.as_deref().unwrap_or("-");
        if event.kind.is_failure() {
            warn!(kind = %event.kind, actor, target, detail = %event.detail, "audit");
        } else {
            info!(kind = %event.kind, actor, target, detail = %event.detail, "audit");
        }
    }
}

pub struct AuditLog {
    events: Vec<AuditEvent>,
    announcer: Arc<dyn AuditAnnouncer>,
}

impl AuditLog {
    pub fn new(announcer: Arc<dyn AuditAnnouncer>) -> Self {
        Self {
            events: Vec::new(),
            announcer,
        }
    }

    /// Resume from previously persisted events (kept in their stored order)
    pub fn with_events(announcer: Arc<dyn AuditAnnouncer>, events: Vec<AuditEvent>) -> Self {
        Self { events, announcer }
    }

    pub fn record(
        &mut self,
        kind: AuditKind,
        actor_user_id: Option<&str>,
        target_user_id: Option<&str>,
        detail: impl Into<String>,
    ) -> AuditEvent {
        let event = AuditEvent {
            event_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            actor_user_id: actor_user_id.map(str::to_string),
            target_user_id: target_user_id.map(str::to_string),
            detail: detail.into(),
        };
        self.announcer.announce(&event);
        self.events.push(event.clone());
        event
    }

    /// Chronological
    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    /// Newest first
    pub fn recent(&self, limit: usize) -> Vec<AuditEvent> {
        self.events.iter().rev().take(limit).cloned().collect()
    }

    /// Newest first, events where the user is actor or target
    pub fn for_user(&self, user_id: &str, limit: usize) -> Vec<AuditEvent> {
        self.events
            .iter()
            .rev()
            .filter(|e| e.involves(user_id))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Collecting(Mutex<Vec<AuditKind>>);

    impl AuditAnnouncer for Collecting {
        fn announce(&self, event: &AuditEvent) {
            self.0.lock().push(event.kind);
        }
    }

    #[test]
    fn test_record_appends_in_order() {
        let mut log = AuditLog::new(Arc::new(NoopAnnouncer));
        log.record(AuditKind::LoginFailure, None, Some("u1"), "wrong password");
        log.record(AuditKind::LoginSuccess, Some("u1"), Some("u1"), "login");
        log.record(AuditKind::Logout, Some("u1"), Some("u1"), "logout");

        let kinds: Vec<AuditKind> = log.events().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![AuditKind::LoginFailure, AuditKind::LoginSuccess, AuditKind::Logout]
        );
        assert!(log.events()[0].actor_user_id.is_none());
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_recent_and_for_user_are_newest_first() {
        let mut log = AuditLog::new(Arc::new(NoopAnnouncer));
        log.record(AuditKind::UserCreated, Some("admin"), Some("a"), "created a");
        log.record(AuditKind::UserCreated, Some("admin"), Some("b"), "created b");
        log.record(AuditKind::UserModified, Some("admin"), Some("a"), "modified a");

        let recent = log.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].detail, "modified a");

        let for_a = log.for_user("a", 10);
        assert_eq!(for_a.len(), 2);
        assert_eq!(for_a[1].detail, "created a");
    }

    #[test]
    fn test_announcer_sees_every_event() {
        let announcer = Arc::new(Collecting::default());
        let mut log = AuditLog::new(announcer.clone());
        log.record(AuditKind::PermissionDenied, Some("u1"), None, "users.delete");
        log.record(AuditKind::Logout, Some("u1"), Some("u1"), "logout");
        assert_eq!(
            *announcer.0.lock(),
            vec![AuditKind::PermissionDenied, AuditKind::Logout]
        );
    }

    #[test]
    fn test_with_events_resumes() {
        let mut first = AuditLog::new(Arc::new(NoopAnnouncer));
        first.record(AuditKind::LoginSuccess, Some("u1"), Some("u1"), "login");
        let mut resumed = AuditLog::with_events(Arc::new(TracingAnnouncer), first.events().to_vec());
        resumed.record(AuditKind::Logout, Some("u1"), Some("u1"), "logout");
        assert_eq!(resumed.len(), 2);
        assert_eq!(resumed.events()[0], first.events()[0]);
    }
}
