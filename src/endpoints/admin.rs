//! Staff portal: sessions, export, statistics and admin provisioning.
//!
//! One flow serves both roles; what an admin may reach is decided by the
//! extractor on each handler and by the admin's unit scope.
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{complaints::UnitFilter, message, Json, Query};
use crate::{
    account_manager::{AccountManager, NewAdminInput, SessionKind},
    auth::{AuthenticatedAdmin, SuperAdmin},
    complaints::{export, ComplaintManager},
    models::{Admin, ComplaintStats, Unit},
    units::Units,
    AppState, Result,
};

#[derive(Debug, Deserialize)]
struct LoginInput {
    /// The admin's email address.
    username: String,
    password: String,
}

/// An admin with their unit attached. Super-admins have none.
#[derive(Debug, Serialize)]
struct AdminView {
    #[serde(flatten)]
    admin: Admin,
    barangay: Option<Unit>,
}

impl AdminView {
    async fn load(admin: Admin, units: &Units) -> Result<Self> {
        let barangay = match admin.unit_id {
            Some(unit) => units.get_active(unit).await?,
            None => None,
        };
        Ok(Self { admin, barangay })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginOutput {
    session_token: String,
    expires_at: DateTime<Utc>,
    is_super_admin: bool,
    user: AdminView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MeOutput {
    is_super_admin: bool,
    user: AdminView,
}

async fn login(
    State(accounts): State<AccountManager>,
    State(units): State<Units>,
    Json(input): Json<LoginInput>,
) -> Result<Json<LoginOutput>> {
    let (session, admin) = accounts.login_admin(&input.username, &input.password).await?;
    Ok(Json(LoginOutput {
        session_token: session.token,
        expires_at: session.expires_at,
        is_super_admin: admin.is_super_admin(),
        user: AdminView::load(admin, &units).await?,
    }))
}

async fn logout(
    admin: AuthenticatedAdmin,
    State(accounts): State<AccountManager>,
) -> Result<Json<serde_json::Value>> {
    accounts.logout(SessionKind::Admin, admin.token()).await?;
    Ok(message("Logged out successfully"))
}

async fn me(admin: AuthenticatedAdmin, State(units): State<Units>) -> Result<Json<MeOutput>> {
    Ok(Json(MeOutput {
        is_super_admin: admin.admin.is_super_admin(),
        user: AdminView::load(admin.admin, &units).await?,
    }))
}

async fn export_csv(
    admin: AuthenticatedAdmin,
    State(complaints): State<ComplaintManager>,
    Query(filter): Query<UnitFilter>,
) -> Result<impl IntoResponse> {
    let scope = admin.scope_for(filter.unit_id)?;
    let rows = complaints.list(scope).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export::filename(Utc::now().date_naive())
    );

    info!(admin = admin.admin.id, rows = rows.len(), "exported complaints");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export::to_csv(&rows),
    ))
}

async fn stats(
    admin: AuthenticatedAdmin,
    State(complaints): State<ComplaintManager>,
    Query(filter): Query<UnitFilter>,
) -> Result<Json<ComplaintStats>> {
    let scope = admin.scope_for(filter.unit_id)?;
    Ok(Json(complaints.stats(scope).await?))
}

async fn list_admins(
    _admin: SuperAdmin,
    State(accounts): State<AccountManager>,
    State(units): State<Units>,
) -> Result<Json<Vec<AdminView>>> {
    let mut views = Vec::new();
    for admin in accounts.list_admins().await? {
        views.push(AdminView::load(admin, &units).await?);
    }
    Ok(Json(views))
}

async fn create_admin(
    SuperAdmin(creator): SuperAdmin,
    State(accounts): State<AccountManager>,
    State(units): State<Units>,
    Json(input): Json<NewAdminInput>,
) -> Result<(StatusCode, Json<AdminView>)> {
    let admin = accounts.create_unit_admin(input).await?;
    info!(admin = admin.id, by = creator.admin.id, "unit admin provisioned");
    Ok((StatusCode::CREATED, Json(AdminView::load(admin, &units).await?)))
}

#[rustfmt::skip]
pub(super) fn routes() -> Router<AppState> {
    // UP /api/admin/login
    // AP /api/admin/logout
    // AG /api/admin/me
    // AG /api/admin/export
    // AG /api/admin/stats
    // SG /api/admin/users
    // SP /api/admin/create
    Router::new()
        .route("/admin/login",  post(login))
        .route("/admin/logout", post(logout))
        .route("/admin/me",      get(me))
        .route("/admin/export",  get(export_csv))
        .route("/admin/stats",   get(stats))
        .route("/admin/users",   get(list_admins))
        .route("/admin/create", post(create_admin))
}
