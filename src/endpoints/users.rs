//! Resident directory for staff.
use axum::{extract::State, routing::get, Router};

use super::{auth::ResidentView, complaints::UnitFilter, Json, Path, Query};
use crate::{
    account_manager::AccountManager, auth::AuthenticatedAdmin, policy::UnitScope, units::Units,
    AppState, Result,
};

async fn residents_in(
    scope: UnitScope,
    accounts: &AccountManager,
    units: &Units,
) -> Result<Json<Vec<ResidentView>>> {
    let mut views = Vec::new();
    for resident in accounts.list_residents(scope.unit()).await? {
        views.push(ResidentView::load(resident, units).await?);
    }
    Ok(Json(views))
}

/// Residents of the admin's scope. A super-admin without a filter sees
/// residents of every active unit.
async fn list_residents(
    admin: AuthenticatedAdmin,
    State(accounts): State<AccountManager>,
    State(units): State<Units>,
    Query(filter): Query<UnitFilter>,
) -> Result<Json<Vec<ResidentView>>> {
    let scope = admin.scope_for(filter.unit_id)?;
    residents_in(scope, &accounts, &units).await
}

async fn list_unit_residents(
    admin: AuthenticatedAdmin,
    State(accounts): State<AccountManager>,
    State(units): State<Units>,
    Path(unit_id): Path<i64>,
) -> Result<Json<Vec<ResidentView>>> {
    let scope = admin.scope_for(Some(unit_id))?;
    residents_in(scope, &accounts, &units).await
}

#[rustfmt::skip]
pub(super) fn routes() -> Router<AppState> {
    // AG /api/users
    // AG /api/users/{barangayId}
    Router::new()
        .route("/users",            get(list_residents))
        .route("/users/{unit_id}",  get(list_unit_residents))
}
