//! Authentication module — credentials, users, sessions, and the engine actor
//!
//! The application talks to [`AuthHandle`] only; the pieces below it are
//! public so they can be tested and composed on their own.

pub mod types;
pub mod hasher;
pub mod directory;
pub mod sessions;
pub mod actor;

pub use actor::{AuthEngine, AuthHandle};
pub use directory::UserDirectory;
pub use hasher::{generate_secure_password, strength, CredentialHasher, PasswordStrength, StrengthScore};
pub use sessions::SessionRegistry;
pub use types::{LoginOutcome, NewUser, Session, SessionLookup, User, UserPatch, UserStats};
