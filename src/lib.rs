//! Barangay citizen-complaint tracking service.
mod account_manager;
mod auth;
mod complaints;
mod config;
mod db;
mod endpoints;
pub mod error;
mod forum;
mod metrics;
mod models;
mod policy;
mod serve;
mod units;
mod uploads;
mod validation;

#[cfg(test)]
mod tests;

pub use serve::run;
pub(crate) use serve::{AppState, Result};

/// The index (/) route.
async fn index() -> impl axum::response::IntoResponse {
    r"
  ___                                        ___                         _
 | _ ) __ _ _ _ __ _ _ _  __ _ __ _ _  _    / __|___ _ _  _ _  ___ __| |_
 | _ \/ _` | '_/ _` | ' \/ _` / _` | || |  | (__/ _ \ ' \| ' \/ -_) _|  _|
 |___/\__,_|_| \__,_|_||_\__, \__,_|\_, |   \___\___/_||_|_||_\___\__|\__|
                         |___/      |__/

This is a barangay citizen-complaint tracking service.

API routes are under /api/
Uploaded photos are served from /uploads/
    "
}
