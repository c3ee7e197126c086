use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use common::Capability;
use judge::UserStore;
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

/// The caller's capability, resolved from the optional `Authorization: Bearer <token>` header.
///
/// No header means [`Capability::Anonymous`]. A header that does not resolve is rejected with
/// `TOKEN_INVALID` rather than silently downgraded.
pub struct Caller(pub Capability);

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Caller(Capability::Anonymous));
        };

        let token = header
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AppError::TokenInvalid)?;

        let name = state.auth.resolve(token).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            AppError::TokenInvalid
        })?;

        // A valid token for a user without a profile row is an ordinary user.
        let capability = match state.store.get_user(&name).await? {
            Some(user) if user.is_admin => Capability::Admin(user.name),
            Some(user) => Capability::User(user.name),
            None => Capability::User(name),
        };

        Ok(Caller(capability))
    }
}
