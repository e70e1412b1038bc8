//! Opaque bearer sessions for residents and admins.
//!
//! The two principal kinds live in separate tables, so a token minted for one
//! kind can never resolve in the other's store. Only a SHA-256 digest of each
//! token is persisted.
use anyhow::{Context as _, Result};
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use sha2::Digest as _;
use tracing::debug;

use crate::db::Db;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Resident,
    Admin,
}

impl SessionKind {
    const fn table(self) -> &'static str {
        match self {
            Self::Resident => "resident_sessions",
            Self::Admin => "admin_sessions",
        }
    }

    const fn owner_column(self) -> &'static str {
        match self {
            Self::Resident => "resident_id",
            Self::Admin => "admin_id",
        }
    }
}

/// A freshly minted token. The plaintext exists only here and in the response.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// 256 random bits, base64url without padding.
fn new_token() -> String {
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn digest(token: &str) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(sha2::Sha256::digest(token.as_bytes()))
}

pub(crate) async fn create(
    kind: SessionKind,
    owner: i64,
    ttl: Duration,
    now: DateTime<Utc>,
    db: &Db,
) -> Result<IssuedSession> {
    let token = new_token();
    let expires_at = now + ttl;

    let sql = format!(
        "INSERT INTO {} ({}, token_hash, created_at, expires_at) VALUES (?, ?, ?, ?)",
        kind.table(),
        kind.owner_column()
    );
    _ = sqlx::query(&sql)
        .bind(owner)
        .bind(digest(&token))
        .bind(now)
        .bind(expires_at)
        .execute(db)
        .await
        .context("failed to create session")?;

    Ok(IssuedSession { token, expires_at })
}

/// Resolve a token to its owner id. Unknown and expired tokens both yield `None`;
/// expired rows are deleted on the way out.
pub(crate) async fn validate(
    kind: SessionKind,
    token: &str,
    now: DateTime<Utc>,
    db: &Db,
) -> Result<Option<i64>> {
    let hash = digest(token);
    let sql = format!(
        "SELECT {}, expires_at FROM {} WHERE token_hash = ?",
        kind.owner_column(),
        kind.table()
    );
    let row: Option<(i64, DateTime<Utc>)> = sqlx::query_as(&sql)
        .bind(&hash)
        .fetch_optional(db)
        .await
        .context("failed to look up session")?;

    match row {
        Some((owner, expires_at)) if expires_at > now => Ok(Some(owner)),
        Some((owner, _)) => {
            debug!(?kind, owner, "dropping expired session");
            delete_by_hash(kind, &hash, db).await?;
            Ok(None)
        }
        None => Ok(None),
    }
}

/// Delete a session. Idempotent.
pub(crate) async fn destroy(kind: SessionKind, token: &str, db: &Db) -> Result<()> {
    delete_by_hash(kind, &digest(token), db).await
}

async fn delete_by_hash(kind: SessionKind, hash: &str, db: &Db) -> Result<()> {
    let sql = format!("DELETE FROM {} WHERE token_hash = ?", kind.table());
    _ = sqlx::query(&sql)
        .bind(hash)
        .execute(db)
        .await
        .context("failed to delete session")?;
    Ok(())
}
