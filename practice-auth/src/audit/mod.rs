//! Audit module — append-only security event log
//!
//! Every login attempt, logout, permission denial, and user mutation is
//! recorded here before the engine returns to its caller.

pub mod types;
pub mod log;

pub use log::{AuditAnnouncer, AuditLog, NoopAnnouncer, TracingAnnouncer};
pub use types::{AuditEvent, AuditKind};
