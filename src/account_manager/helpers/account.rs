//! Resident account rows.
use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};

use crate::{db::Db, models::Resident};

/// Column values for a new resident. `password_encrypted` is already hashed.
pub(crate) struct NewResidentRow<'a> {
    pub email: &'a str,
    pub password_encrypted: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub contact_number: &'a str,
    pub address: &'a str,
    pub unit_id: i64,
}

/// Insert a resident. Uniqueness violations surface as `sqlx::Error::Database`.
pub(crate) async fn register_resident(
    row: NewResidentRow<'_>,
    now: DateTime<Utc>,
    db: &Db,
) -> std::result::Result<Resident, sqlx::Error> {
    sqlx::query_as::<_, Resident>(
        r#"
        INSERT INTO residents (email, password, first_name, last_name, contact_number, address,
            unit_id, is_verified, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 0, 1, ?, ?)
            RETURNING *
        "#,
    )
    .bind(row.email)
    .bind(row.password_encrypted)
    .bind(row.first_name)
    .bind(row.last_name)
    .bind(row.contact_number)
    .bind(row.address)
    .bind(row.unit_id)
    .bind(now)
    .bind(now)
    .fetch_one(db)
    .await
}

/// Exact (case-sensitive) email match among active residents.
pub(crate) async fn get_resident_by_email(email: &str, db: &Db) -> Result<Option<Resident>> {
    sqlx::query_as::<_, Resident>("SELECT * FROM residents WHERE email = ? AND is_active = 1")
        .bind(email)
        .fetch_optional(db)
        .await
        .context("failed to fetch resident by email")
}

/// Any resident, active or not, holding this email.
pub(crate) async fn email_taken(email: &str, db: &Db) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM residents WHERE email = ?")
        .bind(email)
        .fetch_optional(db)
        .await
        .context("failed to check resident email")?;
    Ok(found.is_some())
}

pub(crate) async fn get_resident(id: i64, db: &Db) -> Result<Option<Resident>> {
    sqlx::query_as::<_, Resident>("SELECT * FROM residents WHERE id = ? AND is_active = 1")
        .bind(id)
        .fetch_optional(db)
        .await
        .context("failed to fetch resident")
}

/// Active residents, optionally restricted to one unit.
pub(crate) async fn list_residents(unit: Option<i64>, db: &Db) -> Result<Vec<Resident>> {
    match unit {
        Some(unit) => sqlx::query_as::<_, Resident>(
            "SELECT * FROM residents WHERE unit_id = ? AND is_active = 1 ORDER BY id",
        )
        .bind(unit)
        .fetch_all(db)
        .await,
        None => sqlx::query_as::<_, Resident>(
            r#"
            SELECT r.* FROM residents r
                JOIN units u ON u.id = r.unit_id
                WHERE r.is_active = 1 AND u.is_active = 1
                ORDER BY r.id
            "#,
        )
        .fetch_all(db)
        .await,
    }
    .context("failed to list residents")
}
