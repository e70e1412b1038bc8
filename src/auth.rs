//! Authentication layers
//!
//! Handlers declare the principal they need as an extractor argument; the
//! extractor resolves the bearer token against the matching session store
//! and rejects before the handler runs. Role checks live here too, so no
//! handler re-implements them.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use metrics::counter;

use crate::{
    error::Error,
    metrics::AUTH_FAILED,
    models::{Admin, Resident},
    policy::UnitScope,
    AppState, Result,
};

/// Extract the token from an `Authorization: Bearer <token>` header.
pub(crate) fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn rejected() -> Error {
    counter!(AUTH_FAILED).increment(1);
    Error::unauthenticated()
}

/// A resident with a valid, unexpired resident session.
#[derive(Debug, Clone)]
pub struct AuthenticatedResident {
    pub resident: Resident,
    token: String,
}

impl AuthenticatedResident {
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl FromRequestParts<AppState> for AuthenticatedResident {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(rejected)?.to_owned();
        let resident = state
            .accounts
            .resident_for_token(&token)
            .await?
            .ok_or_else(rejected)?;

        Ok(Self { resident, token })
    }
}

/// The resident behind the request, if a valid resident token was supplied.
///
/// Used by public endpoints that behave slightly differently for signed-in
/// residents. An absent or unusable token is treated as anonymous.
#[derive(Debug, Clone)]
pub struct MaybeResident(pub Option<Resident>);

impl FromRequestParts<AppState> for MaybeResident {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(Self(None));
        };
        Ok(Self(state.accounts.resident_for_token(token).await?))
    }
}

/// Any admin (super or unit) with a valid, unexpired admin session.
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin {
    pub admin: Admin,
    token: String,
}

impl AuthenticatedAdmin {
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The admin's implicit unit scope.
    pub fn scope(&self) -> UnitScope {
        UnitScope::of_admin(&self.admin)
    }

    /// The admin's scope narrowed by a client-supplied unit filter.
    pub fn scope_for(&self, requested: Option<i64>) -> Result<UnitScope> {
        UnitScope::for_admin(&self.admin, requested)
    }
}

impl FromRequestParts<AppState> for AuthenticatedAdmin {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(rejected)?.to_owned();
        let admin = state
            .accounts
            .admin_for_token(&token)
            .await?
            .ok_or_else(rejected)?;

        Ok(Self { admin, token })
    }
}

/// An admin session whose role is `super_admin`. A valid unit-admin session is
/// rejected with 403, not 401.
#[derive(Debug, Clone)]
pub struct SuperAdmin(pub AuthenticatedAdmin);

impl FromRequestParts<AppState> for SuperAdmin {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let admin = AuthenticatedAdmin::from_request_parts(parts, state).await?;
        if !admin.admin.is_super_admin() {
            tracing::warn!(admin = admin.admin.id, "unit admin denied super admin action");
            return Err(Error::forbidden());
        }
        Ok(Self(admin))
    }
}
