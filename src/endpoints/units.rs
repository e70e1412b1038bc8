use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tracing::info;

use super::{message, Json, Path};
use crate::{
    auth::SuperAdmin,
    error::Error,
    models::Unit,
    units::{NewUnit, Units},
    AppState, Result,
};

async fn list_units(State(units): State<Units>) -> Result<Json<Vec<Unit>>> {
    Ok(Json(units.list_active().await?))
}

async fn create_unit(
    _admin: SuperAdmin,
    State(units): State<Units>,
    Json(input): Json<NewUnit>,
) -> Result<(StatusCode, Json<Unit>)> {
    let unit = units.create(input).await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

async fn deactivate_unit(
    SuperAdmin(admin): SuperAdmin,
    State(units): State<Units>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    if !units.deactivate(id).await? {
        return Err(Error::not_found("Barangay"));
    }
    info!(unit = id, admin = admin.admin.id, "deactivated unit");
    Ok(message("Barangay deactivated"))
}

#[rustfmt::skip]
pub(super) fn routes() -> Router<AppState> {
    // UG /api/units
    // UG /api/barangays
    // SP /api/units
    // SP /api/units/{id}/deactivate
    Router::new()
        .route("/units",                   get(list_units).post(create_unit))
        .route("/barangays",               get(list_units))
        .route("/units/{id}/deactivate",  post(deactivate_unit))
}
