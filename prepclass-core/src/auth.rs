//! User directory: account registration and credential checks.
//!
//! Passwords are hashed with argon2id and stored as PHC strings in a
//! `users` table next to the session history. Username rules: 3–20
//! characters from `[A-Za-z0-9_]`. Passwords must be at least 8 chars.

use std::path::{Path, PathBuf};

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use chrono::Utc;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{info, warn};

use crate::error::{CoreError, Result};

const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 20;
const MIN_PASSWORD_LEN: usize = 8;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    username      TEXT PRIMARY KEY,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL
);";

// ---------------------------------------------------------------------------
// Validation & hashing helpers
// ---------------------------------------------------------------------------

/// Check the username charset and length rules.
///
/// # Errors
///
/// Returns [`CoreError::InvalidUsername`] describing the violated rule.
pub fn validate_username(username: &str) -> Result<()> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(CoreError::InvalidUsername(format!(
            "must be {MIN_USERNAME_LEN}-{MAX_USERNAME_LEN} characters, got {len}"
        )));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(CoreError::InvalidUsername(
            "only letters, digits and underscore are allowed".into(),
        ));
    }
    Ok(())
}

/// Check the password minimum requirements.
///
/// # Errors
///
/// Returns [`CoreError::WeakPassword`] if the password is too short.
pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CoreError::WeakPassword(format!(
            "must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Hash a password with argon2id and a fresh random salt.
///
/// # Errors
///
/// Returns [`CoreError::PasswordHash`] if hashing fails.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CoreError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC hash string.
///
/// # Errors
///
/// Returns [`CoreError::PasswordHash`] if the stored hash is malformed.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| CoreError::PasswordHash(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CoreError::PasswordHash(e.to_string())),
    }
}

// ---------------------------------------------------------------------------
// UserDirectory
// ---------------------------------------------------------------------------

/// Handle to the `users` table of a PrepClass database.
pub struct UserDirectory {
    conn: Connection,
    db_path: PathBuf,
}

impl std::fmt::Debug for UserDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDirectory")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl UserDirectory {
    /// Open (or create) the user directory at `path`.
    ///
    /// This may be the same file as the session store; each handle keeps
    /// its own connection.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn, db_path })
    }

    /// Open an in-memory user directory (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Database`] on SQLite failures.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidUsername`] / [`CoreError::WeakPassword`]
    /// for rule violations, [`CoreError::UserExists`] for duplicates, and
    /// [`CoreError::Database`] on SQLite failures.
    pub fn register(&self, username: &str, password: &str) -> Result<()> {
        validate_username(username)?;
        validate_password(password)?;

        let password_hash = hash_password(password)?;
        let created_at = Utc::now().to_rfc3339();

        let inserted = self.conn.execute(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
            params![username, password_hash, created_at],
        );

        match inserted {
            Ok(_) => {
                info!(username, "account registered");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(CoreError::UserExists(username.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check credentials. Unknown usernames and wrong passwords both
    /// yield `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Database`] on SQLite failures, or
    /// [`CoreError::PasswordHash`] if a stored hash is malformed.
    pub fn verify(&self, username: &str, password: &str) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT password_hash FROM users WHERE username = ?1")?;

        let stored: Option<String> = stmt
            .query_row(params![username], |row| row.get(0))
            .optional()?;

        let Some(stored_hash) = stored else {
            warn!(username, "login attempt for unknown user");
            return Ok(false);
        };

        verify_password(password, &stored_hash)
    }

    /// Whether an account with this username exists.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Database`] on SQLite failures.
    pub fn exists(&self, username: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_verify() {
        let dir = UserDirectory::open_in_memory().expect("open");
        dir.register("mentor_01", "correct horse").expect("register");

        assert!(dir.verify("mentor_01", "correct horse").expect("verify"));
        assert!(!dir.verify("mentor_01", "wrong password").expect("verify"));
        assert!(dir.exists("mentor_01").expect("exists"));
    }

    #[test]
    fn unknown_user_verifies_false() {
        let dir = UserDirectory::open_in_memory().expect("open");
        assert!(!dir.verify("ghost", "whatever123").expect("verify"));
    }

    #[test]
    fn duplicate_register_rejected() {
        let dir = UserDirectory::open_in_memory().expect("open");
        dir.register("mentor_01", "password123").expect("register");

        let err = dir
            .register("mentor_01", "password456")
            .expect_err("must fail");
        assert!(matches!(err, CoreError::UserExists(_)));
    }

    #[test]
    fn username_rules_enforced() {
        assert!(validate_username("ab").is_err(), "too short");
        assert!(
            validate_username("a_very_long_username_far_over_the_cap").is_err(),
            "too long"
        );
        assert!(validate_username("bad name").is_err(), "space");
        assert!(validate_username("bad-name").is_err(), "hyphen");
        assert!(validate_username("mentor_01").is_ok());
    }

    #[test]
    fn password_rules_enforced() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("longenough").is_ok());
    }

    #[test]
    fn hash_round_trip_and_uniqueness() {
        let h1 = hash_password("password123").expect("hash");
        let h2 = hash_password("password123").expect("hash");
        assert_ne!(h1, h2, "fresh salt per hash");
        assert!(verify_password("password123", &h1).expect("verify"));
        assert!(!verify_password("password124", &h1).expect("verify"));
    }

    #[test]
    fn malformed_stored_hash_is_an_error() {
        let err = verify_password("password123", "not-a-phc-string").expect_err("must fail");
        assert!(matches!(err, CoreError::PasswordHash(_)));
    }
}
