//! Salted password hashing.
use anyhow::{Context as _, Result};
use argon2::{
    password_hash::SaltString, Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier as _,
};
use base64::Engine as _;

/// Hash a password into a PHC string with a fresh random salt.
pub(crate) fn gen_salt_and_hash(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), salt.as_salt())
        .context("failed to hash password")?
        .to_string();
    Ok(hash)
}

/// Check `password` against a stored PHC string.
pub(crate) fn verify(password: &str, stored: &str) -> Result<bool> {
    let hash = PasswordHash::new(stored).context("invalid password hash in db")?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .is_ok())
}

/// A random password for bootstrap accounts.
pub(crate) fn random_password() -> String {
    let bytes: [u8; 18] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
