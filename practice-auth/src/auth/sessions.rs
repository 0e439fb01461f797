//! SessionRegistry — token → identity mapping with lazy expiry
//!
//! Expiry is evaluated when a token is read; there is no background sweeper.
//! An expired or terminated token is removed and never comes back: a new
//! login always mints a new token. At most one session per user.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, TryRngCore};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{AuthError, Result};

use super::types::{Session, SessionLookup};

/// Token byte length before hex encoding (32 bytes = 64 hex chars)
const TOKEN_BYTES: usize = 32;

pub struct SessionRegistry {
    ttl: Duration,
    by_token: HashMap<String, Session>,
    /// user_id → token of that user's only session
    by_user: HashMap<String, String>,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            by_token: HashMap::new(),
            by_user: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Replace any session `user_id` holds with a fresh one
    pub fn issue(&mut self, user_id: &str) -> Result<Session> {
        self.issue_at(user_id, Utc::now())
    }

    pub fn issue_at(&mut self, user_id: &str, now: DateTime<Utc>) -> Result<Session> {
        self.terminate_user(user_id);

        let token = generate_token()?;
        let session = Session {
            token: token.clone(),
            user_id: user_id.to_string(),
            issued_at: now,
            expires_at: now + self.ttl,
            last_activity_at: now,
        };
        self.by_user.insert(user_id.to_string(), token.clone());
        self.by_token.insert(token, session.clone());
        debug!(user_id, token = %fingerprint(&session.token), "Session issued");
        Ok(session)
    }

    pub fn get(&mut self, token: &str) -> SessionLookup {
        self.get_at(token, Utc::now())
    }

    /// Expired entries are dropped as a side effect of being observed.
    pub fn get_at(&mut self, token: &str, now: DateTime<Utc>) -> SessionLookup {
        if let Some(session) = self.by_token.get(token) {
            if session.is_active_at(now) {
                return SessionLookup::Active(session.clone());
            }
        }
        match self.remove(token) {
            Some(session) => {
                debug!(user_id = %session.user_id, token = %fingerprint(token), "Session expired");
                SessionLookup::Expired(session)
            }
            None => SessionLookup::NotFound,
        }
    }

    pub fn extend(&mut self, token: &str) -> Result<Session> {
        self.extend_at(token, Utc::now())
    }

    /// Push expiry to `now + ttl`. Missing and expired tokens are both `NotFound`.
    pub fn extend_at(&mut self, token: &str, now: DateTime<Utc>) -> Result<Session> {
        match self.get_at(token, now) {
            SessionLookup::Active(_) => {}
            SessionLookup::Expired(_) | SessionLookup::NotFound => {
                return Err(AuthError::NotFound("session".into()));
            }
        }
        let ttl = self.ttl;
        let session = self
            .by_token
            .get_mut(token)
            .ok_or_else(|| AuthError::NotFound("session".into()))?;
        session.expires_at = now + ttl;
        session.last_activity_at = now;
        Ok(session.clone())
    }

    /// Record activity without moving the expiry
    pub fn touch(&mut self, token: &str) {
        self.touch_at(token, Utc::now())
    }

    pub fn touch_at(&mut self, token: &str, now: DateTime<Utc>) {
        if let Some(session) = self.by_token.get_mut(token) {
            if session.is_active_at(now) {
                session.last_activity_at = now;
            }
        }
    }

    /// Idempotent; returns whether a session was removed
    pub fn terminate(&mut self, token: &str) -> bool {
        let removed = self.remove(token).is_some();
        if removed {
            debug!(token = %fingerprint(token), "Session terminated");
        }
        removed
    }

    pub fn terminate_user(&mut self, user_id: &str) -> bool {
        match self.by_user.get(user_id).cloned() {
            Some(token) => self.terminate(&token),
            None => false,
        }
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired_at(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = self
            .by_token
            .iter()
            .filter(|(_, s)| !s.is_active_at(now))
            .map(|(token, _)| token.clone())
            .collect();
        for token in &expired {
            self.remove(token);
        }
        expired.len()
    }

    pub fn purge_expired(&mut self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    pub fn active_count_at(&self, now: DateTime<Utc>) -> usize {
        self.by_token.values().filter(|s| s.is_active_at(now)).count()
    }

    fn remove(&mut self, token: &str) -> Option<Session> {
        let session = self.by_token.remove(token)?;
        if self.by_user.get(&session.user_id).map(String::as_str) == Some(token) {
            self.by_user.remove(&session.user_id);
        }
        Some(session)
    }
}

/// Random session token (hex-encoded) from the OS entropy source
fn generate_token() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
        tracing::error!(error = %e, "OS entropy source unavailable");
        AuthError::Hashing(format!("entropy source unavailable: {e}"))
    })?;
    Ok(hex::encode(bytes))
}

/// Short, non-reversible token id for log lines
pub(crate) fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}
