//! Resident and admin accounts, and the two independent session stores.
use std::sync::OnceLock;

use anyhow::Result as AnyResult;
use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    config::{BootstrapConfig, SessionConfig},
    db::Db,
    error::Error,
    metrics::{AUTH_FAILED, SESSIONS_CREATED},
    models::{Admin, AdminRole, Resident},
    units::Units,
    validation::Validator,
    Result,
};

pub(crate) mod helpers {
    pub mod account;
    pub mod admin;
    pub mod password;
    pub mod session;
}

use helpers::{account, admin, password, session};
pub use helpers::session::{IssuedSession, SessionKind};

/// Self-service resident registration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub contact_number: String,
    pub address: String,
    #[serde(rename = "barangayId")]
    pub unit_id: i64,
}

/// A unit-admin account created by a super-admin.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAdminInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(rename = "barangayId")]
    pub unit_id: i64,
}

/// Shared checks for the account-holder fields of both identity kinds.
fn check_identity(v: &mut Validator, email: &str, password: &str, first: &str, last: &str) {
    v.email("email", email, "Please enter a valid email address");
    v.min_len("password", password, 8, "Password must be at least 8 characters");
    v.min_len("firstName", first.trim(), 2, "First name must be at least 2 characters");
    v.min_len("lastName", last.trim(), 2, "Last name must be at least 2 characters");
}

/// Verified against when the account does not exist, so that unknown emails
/// take as long to reject as wrong passwords.
fn dummy_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| {
        password::gen_salt_and_hash("not-a-real-password").unwrap_or_default()
    })
}

fn invalid_credentials() -> Error {
    counter!(AUTH_FAILED).increment(1);
    Error::with_status(
        StatusCode::UNAUTHORIZED,
        anyhow::anyhow!("Invalid email or password"),
    )
}

#[derive(Clone)]
pub struct AccountManager {
    db: Db,
    units: Units,
    resident_ttl: Duration,
    admin_ttl: Duration,
}

impl std::fmt::Debug for AccountManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountManager").finish()
    }
}

impl AccountManager {
    pub fn new(db: Db, sessions: &SessionConfig) -> Self {
        Self {
            units: Units::new(db.clone()),
            db,
            resident_ttl: Duration::hours(sessions.resident_ttl_hours),
            admin_ttl: Duration::hours(sessions.admin_ttl_hours),
        }
    }

    fn ttl(&self, kind: SessionKind) -> Duration {
        match kind {
            SessionKind::Resident => self.resident_ttl,
            SessionKind::Admin => self.admin_ttl,
        }
    }

    async fn issue(&self, kind: SessionKind, owner: i64) -> AnyResult<IssuedSession> {
        let issued = session::create(kind, owner, self.ttl(kind), Utc::now(), &self.db).await?;
        counter!(SESSIONS_CREATED).increment(1);
        Ok(issued)
    }

    // Residents

    /// Register a resident. Validation runs before anything is written; an
    /// already registered email is a conflict and creates no row.
    pub async fn signup(&self, input: SignupInput) -> Result<Resident> {
        let mut v = Validator::new();
        check_identity(
            &mut v,
            &input.email,
            &input.password,
            &input.first_name,
            &input.last_name,
        );
        v.min_digits(
            "contactNumber",
            input.contact_number.trim(),
            11,
            "Contact number must be at least 11 digits",
        );
        v.min_len("address", input.address.trim(), 10, "Address must be at least 10 characters");
        if self.units.get_active(input.unit_id).await?.is_none() {
            v.fail("barangayId", "Please select a valid barangay");
        }
        v.finish()?;

        if account::email_taken(&input.email, &self.db).await? {
            return Err(Error::conflict("Email already registered"));
        }

        let password_encrypted = password::gen_salt_and_hash(&input.password)?;
        let row = account::NewResidentRow {
            email: &input.email,
            password_encrypted: &password_encrypted,
            first_name: input.first_name.trim(),
            last_name: input.last_name.trim(),
            contact_number: input.contact_number.trim(),
            address: input.address.trim(),
            unit_id: input.unit_id,
        };
        match account::register_resident(row, Utc::now(), &self.db).await {
            Ok(resident) => {
                info!(resident = resident.id, unit = resident.unit_id, "new resident");
                Ok(resident)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(Error::conflict("Email already registered"))
            }
            Err(e) => Err(anyhow::Error::new(e)
                .context("failed to create resident")
                .into()),
        }
    }

    pub async fn login_resident(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(IssuedSession, Resident)> {
        let Some(resident) = account::get_resident_by_email(email, &self.db).await? else {
            _ = password::verify(password, dummy_hash());
            return Err(invalid_credentials());
        };
        if !password::verify(password, &resident.password)? {
            return Err(invalid_credentials());
        }

        let issued = self.issue(SessionKind::Resident, resident.id).await?;
        Ok((issued, resident))
    }

    pub async fn resident_for_token(&self, token: &str) -> AnyResult<Option<Resident>> {
        self.resident_for_token_at(token, Utc::now()).await
    }

    pub(crate) async fn resident_for_token_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AnyResult<Option<Resident>> {
        match session::validate(SessionKind::Resident, token, now, &self.db).await? {
            Some(id) => account::get_resident(id, &self.db).await,
            None => Ok(None),
        }
    }

    pub async fn logout(&self, kind: SessionKind, token: &str) -> AnyResult<()> {
        session::destroy(kind, token, &self.db).await
    }

    /// Active residents of one unit, or of every active unit when `unit` is `None`.
    pub async fn list_residents(&self, unit: Option<i64>) -> AnyResult<Vec<Resident>> {
        account::list_residents(unit, &self.db).await
    }

    // Admins

    pub async fn login_admin(&self, email: &str, password: &str) -> Result<(IssuedSession, Admin)> {
        let Some(admin) = admin::get_admin_by_email(email, &self.db).await? else {
            _ = password::verify(password, dummy_hash());
            return Err(invalid_credentials());
        };
        if !password::verify(password, &admin.password)? {
            return Err(invalid_credentials());
        }

        let issued = self.issue(SessionKind::Admin, admin.id).await?;
        info!(admin = admin.id, role = ?admin.role, "admin logged in");
        Ok((issued, admin))
    }

    pub async fn admin_for_token(&self, token: &str) -> AnyResult<Option<Admin>> {
        self.admin_for_token_at(token, Utc::now()).await
    }

    pub(crate) async fn admin_for_token_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AnyResult<Option<Admin>> {
        match session::validate(SessionKind::Admin, token, now, &self.db).await? {
            Some(id) => admin::get_admin(id, &self.db).await,
            None => Ok(None),
        }
    }

    /// Create a unit-admin. Callers must already have checked the super-admin role.
    pub async fn create_unit_admin(&self, input: NewAdminInput) -> Result<Admin> {
        let mut v = Validator::new();
        check_identity(
            &mut v,
            &input.email,
            &input.password,
            &input.first_name,
            &input.last_name,
        );
        if self.units.get_active(input.unit_id).await?.is_none() {
            v.fail("barangayId", "Please select a valid barangay");
        }
        v.finish()?;

        if admin::email_taken(&input.email, &self.db).await? {
            return Err(Error::conflict("Admin with this email already exists"));
        }

        let password_encrypted = password::gen_salt_and_hash(&input.password)?;
        let row = admin::NewAdminRow {
            email: &input.email,
            password_encrypted: &password_encrypted,
            first_name: input.first_name.trim(),
            last_name: input.last_name.trim(),
            role: AdminRole::UnitAdmin,
            unit_id: Some(input.unit_id),
        };
        match admin::register_admin(row, Utc::now(), &self.db).await {
            Ok(admin) => {
                info!(admin = admin.id, unit = ?admin.unit_id, "new unit admin");
                Ok(admin)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(Error::conflict("Admin with this email already exists"))
            }
            Err(e) => Err(anyhow::Error::new(e).context("failed to create admin").into()),
        }
    }

    pub async fn list_admins(&self) -> AnyResult<Vec<Admin>> {
        admin::list_admins(&self.db).await
    }

    /// Provision the super-admin on first startup.
    ///
    /// Returns the generated password when none was configured, so the caller
    /// can show it exactly once.
    pub async fn ensure_super_admin(&self, config: &BootstrapConfig) -> AnyResult<Option<String>> {
        if admin::has_super_admin(&self.db).await? {
            return Ok(None);
        }

        let (password, generated) = match &config.super_admin_password {
            Some(password) => (password.clone(), false),
            None => (password::random_password(), true),
        };
        if password.len() < 8 {
            warn!("configured super admin password is shorter than 8 characters");
        }

        let password_encrypted = password::gen_salt_and_hash(&password)?;
        let row = admin::NewAdminRow {
            email: &config.super_admin_email,
            password_encrypted: &password_encrypted,
            first_name: "Super",
            last_name: "Administrator",
            role: AdminRole::SuperAdmin,
            unit_id: None,
        };
        let admin = admin::register_admin(row, Utc::now(), &self.db)
            .await
            .map_err(|e| anyhow::Error::new(e).context("failed to create super admin"))?;
        info!(admin = admin.id, "provisioned super admin {}", admin.email);

        Ok(generated.then_some(password))
    }
}
