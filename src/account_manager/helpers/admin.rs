//! Admin account rows.
use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};

use crate::{
    db::Db,
    models::{Admin, AdminRole},
};

pub(crate) struct NewAdminRow<'a> {
    pub email: &'a str,
    pub password_encrypted: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub role: AdminRole,
    pub unit_id: Option<i64>,
}

pub(crate) async fn register_admin(
    row: NewAdminRow<'_>,
    now: DateTime<Utc>,
    db: &Db,
) -> std::result::Result<Admin, sqlx::Error> {
    sqlx::query_as::<_, Admin>(
        r#"
        INSERT INTO admins (email, password, first_name, last_name, role, unit_id, is_active,
            created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)
            RETURNING *
        "#,
    )
    .bind(row.email)
    .bind(row.password_encrypted)
    .bind(row.first_name)
    .bind(row.last_name)
    .bind(row.role)
    .bind(row.unit_id)
    .bind(now)
    .bind(now)
    .fetch_one(db)
    .await
}

pub(crate) async fn get_admin_by_email(email: &str, db: &Db) -> Result<Option<Admin>> {
    sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE email = ? AND is_active = 1")
        .bind(email)
        .fetch_optional(db)
        .await
        .context("failed to fetch admin by email")
}

pub(crate) async fn email_taken(email: &str, db: &Db) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM admins WHERE email = ?")
        .bind(email)
        .fetch_optional(db)
        .await
        .context("failed to check admin email")?;
    Ok(found.is_some())
}

pub(crate) async fn get_admin(id: i64, db: &Db) -> Result<Option<Admin>> {
    sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE id = ? AND is_active = 1")
        .bind(id)
        .fetch_optional(db)
        .await
        .context("failed to fetch admin")
}

pub(crate) async fn list_admins(db: &Db) -> Result<Vec<Admin>> {
    sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE is_active = 1 ORDER BY id")
        .fetch_all(db)
        .await
        .context("failed to list admins")
}

pub(crate) async fn has_super_admin(db: &Db) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM admins WHERE role = 'super_admin'")
            .fetch_one(db)
            .await
            .context("failed to count super admins")?;
    Ok(count > 0)
}
