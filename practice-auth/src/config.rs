//! Configuration for the practice auth engine

use std::path::{Path, PathBuf};

use chrono::Duration;

use crate::error::{AuthError, Result};

/// Default session lifetime in hours
pub const DEFAULT_SESSION_HOURS: i64 = 8;

/// Default length of passwords produced by `generate_secure_password`
pub const DEFAULT_GENERATED_PASSWORD_LENGTH: usize = 12;

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

/// Credentials for the account seeded on first run
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl BootstrapAdmin {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            first_name: "System".into(),
            last_name: "Administrator".into(),
        }
    }
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Auth engine configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Directory for `users.json` and `audit_log.jsonl`; `None` keeps everything in memory
    pub data_dir: Option<PathBuf>,

    /// Session lifetime, also the window granted by each extension
    pub session_ttl: Duration,

    /// Argon2id cost for newly hashed passwords
    pub hash_cost: HashCost,

    /// Reject passwords with strength violations on create / change
    pub enforce_password_policy: bool,

    /// Length used by password resets
    pub generated_password_length: usize,

    /// Seeded when the user directory is empty
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl AuthConfig {
    /// Create a file-backed config with sensible defaults
    ///
    /// Files created under `data_dir`:
    /// ```text
    /// data_dir/
    /// ├── users.json        (save-all snapshot)
    /// └── audit_log.jsonl   (append-only, one event per line)
    /// ```
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: Some(data_dir.as_ref().to_path_buf()),
            ..Self::in_memory()
        }
    }

    /// Config without durable storage
    pub fn in_memory() -> Self {
        Self {
            data_dir: None,
            session_ttl: Duration::hours(DEFAULT_SESSION_HOURS),
            hash_cost: HashCost::default(),
            enforce_password_policy: true,
            generated_password_length: DEFAULT_GENERATED_PASSWORD_LENGTH,
            bootstrap_admin: None,
        }
    }

    /// Build from `PRACTICE_AUTH_DATA_DIR` and `PRACTICE_AUTH_SESSION_HOURS`
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("PRACTICE_AUTH_DATA_DIR") {
            Ok(dir) if !dir.trim().is_empty() => Self::new(dir.trim()),
            _ => Self::in_memory(),
        };
        if let Ok(hours) = std::env::var("PRACTICE_AUTH_SESSION_HOURS") {
            let hours: i64 = hours.trim().parse().map_err(|_| {
                AuthError::Config(format!("PRACTICE_AUTH_SESSION_HOURS is not a number: {hours}"))
            })?;
            if hours <= 0 {
                return Err(AuthError::Config(
                    "PRACTICE_AUTH_SESSION_HOURS must be positive".into(),
                ));
            }
            config.session_ttl = Duration::hours(hours);
        }
        Ok(config)
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_hash_cost(mut self, cost: HashCost) -> Self {
        self.hash_cost = cost;
        self
    }

    pub fn with_password_policy(mut self, enforce: bool) -> Self {
        self.enforce_password_policy = enforce;
        self
    }

    pub fn with_generated_password_length(mut self, length: usize) -> Self {
        self.generated_password_length = length;
        self
    }

    pub fn with_bootstrap_admin(mut self, admin: BootstrapAdmin) -> Self {
        self.bootstrap_admin = Some(admin);
        self
    }

    /// Path of a persistence file, if this config is file-backed
    pub fn table_path(&self, name: &str) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(name))
    }
}
