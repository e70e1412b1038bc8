//! Resident signup and sessions.
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{message, Json};
use crate::{
    account_manager::{AccountManager, SessionKind, SignupInput},
    auth::AuthenticatedResident,
    models::{Resident, Unit},
    units::Units,
    AppState, Result,
};

#[derive(Debug, Deserialize)]
struct LoginInput {
    email: String,
    password: String,
}

/// A resident with their unit attached.
#[derive(Debug, Serialize)]
pub(super) struct ResidentView {
    #[serde(flatten)]
    resident: Resident,
    barangay: Option<Unit>,
}

impl ResidentView {
    pub(super) async fn load(resident: Resident, units: &Units) -> Result<Self> {
        let barangay = units.get_active(resident.unit_id).await?;
        Ok(Self { resident, barangay })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginOutput {
    session_token: String,
    expires_at: DateTime<Utc>,
    user: ResidentView,
}

async fn signup(
    State(accounts): State<AccountManager>,
    Json(input): Json<SignupInput>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let resident = accounts.signup(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Account created successfully",
            "userId": resident.id,
        })),
    ))
}

async fn login(
    State(accounts): State<AccountManager>,
    State(units): State<Units>,
    Json(input): Json<LoginInput>,
) -> Result<Json<LoginOutput>> {
    let (session, resident) = accounts.login_resident(&input.email, &input.password).await?;
    Ok(Json(LoginOutput {
        session_token: session.token,
        expires_at: session.expires_at,
        user: ResidentView::load(resident, &units).await?,
    }))
}

async fn logout(
    user: AuthenticatedResident,
    State(accounts): State<AccountManager>,
) -> Result<Json<serde_json::Value>> {
    accounts.logout(SessionKind::Resident, user.token()).await?;
    Ok(message("Logged out successfully"))
}

async fn me(user: AuthenticatedResident, State(units): State<Units>) -> Result<Json<ResidentView>> {
    Ok(Json(ResidentView::load(user.resident, &units).await?))
}

#[rustfmt::skip]
pub(super) fn routes() -> Router<AppState> {
    // UP /api/auth/signup
    // UP /api/auth/login
    // RP /api/auth/logout
    // RG /api/auth/me
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login",  post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me",      get(me))
}
