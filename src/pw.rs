//! Password hashing. Digests are argon2id PHC strings, which carry their own
//! salt and parameters, so a single text column is all the store needs.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier,
        SaltString,
    },
    Argon2,
};
use std::sync::OnceLock;

pub fn hash(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let digest = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("cannot hash password: {e}"))?;

    Ok(digest.to_string())
}

pub fn check(password: &str, digest: &str) -> Result<()> {
    let truth = PasswordHash::new(digest)
        .map_err(|e| anyhow!("stored password hash is unreadable: {e}"))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &truth)
        .map_err(|_| anyhow!("wrong password"))
}

/// [`hash`] on the blocking pool; argon2 is slow on purpose.
pub async fn hash_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash(&password)).await?
}

/// [`check`] on the blocking pool.
pub async fn check_blocking(password: String, digest: String) -> Result<()> {
    tokio::task::spawn_blocking(move || check(&password, &digest)).await?
}

/// Burns the same time as [`check_blocking`] when there is no account to
/// check against. Always fails.
pub async fn check_dummy(password: String) -> Result<()> {
    tokio::task::spawn_blocking(move || check(&password, dummy_digest()))
        .await?
}

/// A real digest of a password nobody has.
fn dummy_digest() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| {
        hash("no account has this password").unwrap_or_default()
    })
}
