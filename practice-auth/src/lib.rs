//! # Practice Auth
//!
//! Authentication, role-based authorization, session lifecycle, and audit
//! trail for the practice desktop app. Everything else in the app (clients,
//! matters, time, invoices, documents) asks this crate who is acting and
//! what they may do.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │ AuthHandle (clone)                        │
//! ├───────────────────────────────────────────┤
//! │ AuthEngine (tokio actor)                  │
//! ├───────────────┬─────────────────┬─────────┤
//! │ UserDirectory │ SessionRegistry │ AuditLog│
//! │ (records,     │ (tokens,        │ (append-│
//! │  invariants)  │  lazy expiry)   │  only)  │
//! ├───────────────┴─────┬───────────┴─────────┤
//! │ RoleCatalog (Arc)   │ CredentialHasher    │
//! │ permissions, meta   │ Argon2id, blocking  │
//! ├─────────────────────┴─────────────────────┤
//! │ AuthStore: JsonFileStore | MemoryStore    │
//! └───────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use practice_auth::{AuthConfig, AuthEngine, BootstrapAdmin};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthConfig::from_env()?
//!         .with_bootstrap_admin(BootstrapAdmin::new("admin", "admin@firm.test", "Chang3-me!now"));
//!     let auth = AuthEngine::spawn(config).await?;
//!
//!     let outcome = auth.login("admin", "Chang3-me!now").await?;
//!     let role = auth.roles().role_by_id(&outcome.user.role_id)?;
//!     println!("{} ({})", outcome.user.display_name(), role.display_meta.badge);
//!
//!     // Privileged, audited read
//!     for event in auth.recent_audit_events(20).await? {
//!         println!("{} {}", event.timestamp, event.kind);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Argon2id hashing** on the blocking pool, salt and cost embedded in PHC strings
//! - **Single session per user** with lazy expiry and explicit extension
//! - **Wildcard-aware RBAC** over five practice roles carrying display metadata
//! - **Append-only audit trail** covering failures as well as successes
//! - **Railway Programming**: all operations return `Result<T, AuthError>`

pub mod config;
pub mod error;
pub mod roles;
pub mod store;
pub mod auth;
pub mod audit;

// Re-exports for convenience
pub use config::{AuthConfig, BootstrapAdmin, HashCost};
pub use error::{AuthError, Result};
pub use roles::{Role, RoleCatalog, RoleMeta};
pub use store::{AuthStore, JsonFileStore, MemoryStore};

pub use auth::{AuthEngine, AuthHandle, LoginOutcome, NewUser, Session, User, UserPatch, UserStats};
pub use audit::{AuditAnnouncer, AuditEvent, AuditKind, NoopAnnouncer, TracingAnnouncer};
