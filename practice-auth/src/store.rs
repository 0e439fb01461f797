//! AuthStore — durable home of user records and the audit trail
//!
//! The engine only needs load-all / save-all for users and load / append for
//! audit events. Two implementations:
//!
//! - [`JsonFileStore`]: one directory per installation
//!   ```text
//!   {data_dir}/
//!   ├── users.json        (full snapshot, replaced atomically)
//!   └── audit_log.jsonl   (append-only, one event per line)
//!   ```
//! - [`MemoryStore`]: process-lifetime snapshots, for tests and ephemeral use
//!
//! # Example
//!
//! ```rust,no_run
//! use practice_auth::{AuthConfig, AuthStore, JsonFileStore};
//!
//! #[tokio::main]
//! async fn main() -> practice_auth::Result<()> {
//!     let store = JsonFileStore::open(&AuthConfig::new("/data/practice")).await?;
//!     let users = store.load_users().await?;
//!     let events = store.load_audit().await?;
//!     println!("{} users, {} audit events", users.len(), events.len());
//!     Ok(())
//! }
//! ```

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::audit::AuditEvent;
use crate::auth::User;
use crate::config::AuthConfig;
use crate::error::{AuthError, Result};

pub const USERS_FILE: &str = "users.json";
pub const AUDIT_FILE: &str = "audit_log.jsonl";

/// Persistence collaborator for the auth engine
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// All users in creation order; empty on first run
    async fn load_users(&self) -> Result<Vec<User>>;

    /// Replace the stored user table with `users`
    async fn save_users(&self, users: &[User]) -> Result<()>;

    /// All audit events in chronological order
    async fn load_audit(&self) -> Result<Vec<AuditEvent>>;

    async fn append_audit(&self, event: &AuditEvent) -> Result<()>;
}

/// Pick the store matching `config.data_dir`
pub async fn open_store(config: &AuthConfig) -> Result<Arc<dyn AuthStore>> {
    if config.data_dir.is_some() {
        Ok(Arc::new(JsonFileStore::open(config).await?))
    } else {
        Ok(Arc::new(MemoryStore::default()))
    }
}

// ─── In-memory ───

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    audit: Mutex<Vec<AuditEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing records
    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: Mutex::new(users),
            audit: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn load_users(&self) -> Result<Vec<User>> {
        Ok(self.users.lock().clone())
    }

    async fn save_users(&self, users: &[User]) -> Result<()> {
        *self.users.lock() = users.to_vec();
        Ok(())
    }

    async fn load_audit(&self) -> Result<Vec<AuditEvent>> {
        Ok(self.audit.lock().clone())
    }

    async fn append_audit(&self, event: &AuditEvent) -> Result<()> {
        self.audit.lock().push(event.clone());
        Ok(())
    }
}

// ─── JSON files ───

pub struct JsonFileStore {
    users_path: PathBuf,
    audit_path: PathBuf,
}

impl JsonFileStore {
    /// Open (creating if needed) the data directory named by `config`
    pub async fn open(config: &AuthConfig) -> Result<Self> {
        let (Some(users_path), Some(audit_path)) =
            (config.table_path(USERS_FILE), config.table_path(AUDIT_FILE))
        else {
            return Err(AuthError::Config("JsonFileStore requires a data directory".into()));
        };
        if let Some(dir) = &config.data_dir {
            tokio::fs::create_dir_all(dir).await?;
            info!(path = %dir.display(), "Auth store opened");
        }
        Ok(Self { users_path, audit_path })
    }

    pub fn users_path(&self) -> &Path {
        &self.users_path
    }

    pub fn audit_path(&self) -> &Path {
        &self.audit_path
    }
}

#[async_trait]
impl AuthStore for JsonFileStore {
    async fn load_users(&self) -> Result<Vec<User>> {
        let bytes = match tokio::fs::read(&self.users_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let users: Vec<User> = serde_json::from_slice(&bytes)?;
        debug!(count = users.len(), "Users loaded");
        Ok(users)
    }

    /// Written to a sibling temp file, flushed, then renamed over the old snapshot
    async fn save_users(&self, users: &[User]) -> Result<()> {
        let json = serde_json::to_vec_pretty(users)?;
        let tmp_path = self.users_path.with_extension("json.tmp");

        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp_path, &self.users_path)
            .await
            .map_err(|e| AuthError::Storage(format!("replace {}: {e}", self.users_path.display())))?;
        debug!(count = users.len(), "Users saved");
        Ok(())
    }

    async fn load_audit(&self) -> Result<Vec<AuditEvent>> {
        let text = match tokio::fs::read_to_string(&self.audit_path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut events = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditEvent>(line) {
                Ok(event) => events.push(event),
                // A torn final line after a crash is skipped, not fatal
                Err(e) => warn!(line = line_no + 1, error = %e, "Skipping unreadable audit line"),
            }
        }
        debug!(count = events.len(), "Audit events loaded");
        Ok(events)
    }

    /// A torn final line is closed off first so the new event starts on its own line
    async fn append_audit(&self, event: &AuditEvent) -> Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.audit_path)
            .await?;

        let mut line = Vec::new();
        if !ends_with_newline(&mut file).await? {
            warn!(path = %self.audit_path.display(), "Closing torn audit line before append");
            line.push(b'\n');
        }
        serde_json::to_writer(&mut line, event)?;
        line.push(b'\n');

        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

/// True for an empty file or one whose last byte is `\n`
async fn ends_with_newline(file: &mut tokio::fs::File) -> Result<bool> {
    if file.metadata().await?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] == b'\n')
}
