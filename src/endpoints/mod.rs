//! HTTP routes under `/api`.
use axum::{
    extract::{FromRequest, FromRequestParts},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::json;

use crate::{error::Error, AppState, Result};

mod admin;
mod auth;
mod complaints;
mod forum;
mod units;
mod users;

/// `axum::Json`, with rejections rendered through [`Error`].
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub(crate) struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub(crate) struct Path<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub(crate) struct Query<T>(pub T);

/// `{"message": ...}` acknowledgement body.
pub(crate) fn message(text: &str) -> Json<serde_json::Value> {
    Json(json!({ "message": text }))
}

/// Health check endpoint. Returns name and version of the service.
async fn health() -> Result<Json<serde_json::Value>> {
    Ok(Json(json!({
        "version": concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
    })))
}

pub(crate) fn routes() -> Router<AppState> {
    Router::new().route("/_health", get(health)).nest(
        "/api",
        Router::new()
            .merge(units::routes())
            .merge(auth::routes())
            .merge(complaints::routes())
            .merge(admin::routes())
            .merge(users::routes())
            .merge(forum::routes()),
    )
}
