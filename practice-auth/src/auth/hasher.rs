//! Password hashing, verification, strength scoring, and generation
//!
//! Hashes are Argon2id in PHC string format, so the salt and cost travel
//! with the hash and verification needs no extra state. Hashing is slow on
//! purpose; the `*_async` variants move it onto tokio's blocking pool.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::config::HashCost;
use crate::error::{AuthError, Result};

/// Minimum length accepted by the strength check
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Length that earns the second length point in the score
pub const LONG_PASSWORD_LENGTH: usize = 12;

/// Characters that count as symbols in the strength check
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";

/// 26 upper + 26 lower + 10 digits + 8 symbols
const GENERATOR_ALPHABET: &[u8; 70] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";

/// Argon2id hasher with a fixed cost for new hashes
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    pub fn new(cost: HashCost) -> Result<Self> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| AuthError::Config(format!("invalid hash cost: {e}")))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Salted one-way hash. Two calls on the same input give different strings.
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                error!(error = %e, "Password hashing failed");
                AuthError::Hashing(e.to_string())
            })
    }

    /// Never errors: a malformed stored hash is just a failed verification.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        self.argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    }

    /// `hash` on the blocking pool. Runs to completion even if the caller stops waiting.
    pub async fn hash_async(&self, password: String) -> Result<String> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| {
                error!(error = %e, "Hashing task did not complete");
                AuthError::Hashing(e.to_string())
            })?
    }

    /// `verify` on the blocking pool
    pub async fn verify_async(&self, password: String, hash: String) -> bool {
        let hasher = self.clone();
        match tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await {
            Ok(matched) => matched,
            Err(e) => {
                error!(error = %e, "Verification task did not complete");
                false
            }
        }
    }
}

/// Heuristic strength bucket, independent of validity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrengthScore {
    Weak,
    Medium,
    Strong,
}

impl StrengthScore {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Medium => "medium",
            Self::Strong => "strong",
        }
    }
}

impl std::fmt::Display for StrengthScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordStrength {
    pub is_valid: bool,
    pub score: StrengthScore,
    pub violations: Vec<String>,
}

/// Check length and character classes, and score the password.
///
/// `is_valid` requires zero violations; `score` is a separate tally and may
/// read "medium" or "strong" for an invalid password.
pub fn strength(password: &str) -> PasswordStrength {
    let length = password.chars().count();
    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| SPECIAL_CHARACTERS.contains(c));

    let mut violations = Vec::new();
    if length < MIN_PASSWORD_LENGTH {
        violations.push(format!("at least {MIN_PASSWORD_LENGTH} characters"));
    }
    if !has_upper {
        violations.push("an uppercase letter".to_string());
    }
    if !has_lower {
        violations.push("a lowercase letter".to_string());
    }
    if !has_digit {
        violations.push("a digit".to_string());
    }
    if !has_special {
        violations.push(format!("a special character ({SPECIAL_CHARACTERS})"));
    }

    let points = [
        length >= MIN_PASSWORD_LENGTH,
        length >= LONG_PASSWORD_LENGTH,
        has_upper,
        has_lower,
        has_digit,
        has_special,
    ]
    .iter()
    .filter(|&&earned| earned)
    .count();

    let score = match points {
        0..=2 => StrengthScore::Weak,
        3..=4 => StrengthScore::Medium,
        _ => StrengthScore::Strong,
    };

    PasswordStrength {
        is_valid: violations.is_empty(),
        score,
        violations,
    }
}

/// Random password that always passes `strength`.
///
/// Characters are drawn uniformly from a 70-character alphabet; a draw that
/// misses a class is discarded and redrawn whole. Lengths below
/// `MIN_PASSWORD_LENGTH` are raised to it.
pub fn generate_secure_password(length: usize) -> String {
    let length = length.max(MIN_PASSWORD_LENGTH);
    let mut rng = rand::rng();
    loop {
        let candidate: String = (0..length)
            .map(|_| GENERATOR_ALPHABET[rng.random_range(0..GENERATOR_ALPHABET.len())] as char)
            .collect();
        if strength(&candidate).is_valid {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_hasher() -> CredentialHasher {
        CredentialHasher::new(HashCost { memory_kib: 256, iterations: 1, parallelism: 1 }).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = cheap_hasher();
        let hash = hasher.hash("Correct#Horse9").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("Correct#Horse9", &hash));
        assert!(!hasher.verify("Correct#Horse8", &hash));
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = cheap_hasher();
        let a = hasher.hash("same-input").unwrap();
        let b = hasher.hash("same-input").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify("same-input", &a));
        assert!(hasher.verify("same-input", &b));
    }

    #[test]
    fn test_verify_malformed_hash_is_false() {
        let hasher = cheap_hasher();
        assert!(!hasher.verify("anything", "not-a-phc-string"));
        assert!(!hasher.verify("anything", ""));
    }

    #[test]
    fn test_verify_uses_embedded_cost() {
        let strong = CredentialHasher::new(HashCost { memory_kib: 512, iterations: 2, parallelism: 1 }).unwrap();
        let hash = strong.hash("Portable!1").unwrap();
        assert!(cheap_hasher().verify("Portable!1", &hash));
    }

    #[test]
    fn test_invalid_cost_is_config_error() {
        let result = CredentialHasher::new(HashCost { memory_kib: 1, iterations: 0, parallelism: 0 });
        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    #[tokio::test]
    async fn test_async_variants() {
        let hasher = cheap_hasher();
        let hash = hasher.hash_async("Async!Pass1".into()).await.unwrap();
        assert!(hasher.verify_async("Async!Pass1".into(), hash.clone()).await);
        assert!(!hasher.verify_async("wrong".into(), hash).await);
    }

    #[test]
    fn test_strength_short_password() {
        let report = strength("short");
        assert!(!report.is_valid);
        assert!(report.violations.iter().any(|v| v.contains("at least 8")));
    }

    #[test]
    fn test_strength_minimal_valid_password() {
        let report = strength("Abcdef1!");
        assert!(report.is_valid);
        assert!(report.violations.is_empty());
        assert_eq!(report.score, StrengthScore::Strong);
    }

    #[test]
    fn test_score_independent_of_validity() {
        // Long, upper, lower, digit, no symbol: 5 points but invalid
        let report = strength("Abcdefghijk1");
        assert!(!report.is_valid);
        assert_eq!(report.score, StrengthScore::Strong);
        assert_eq!(report.violations.len(), 1);

        assert_eq!(strength("abc").score, StrengthScore::Weak);
        assert_eq!(strength("abcdefgh1").score, StrengthScore::Medium);
    }

    #[test]
    fn test_generated_passwords_are_valid() {
        for _ in 0..50 {
            let password = generate_secure_password(12);
            assert_eq!(password.chars().count(), 12);
            assert!(strength(&password).is_valid, "{password}");
            assert!(password.bytes().all(|b| GENERATOR_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_generated_length_has_a_floor() {
        assert_eq!(generate_secure_password(3).len(), MIN_PASSWORD_LENGTH);
    }

    #[test]
    fn test_generated_passwords_differ() {
        assert_ne!(generate_secure_password(16), generate_secure_password(16));
    }
}
