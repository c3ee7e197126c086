use axum::Json;
use axum::extract::{Path, State};
use judge::account;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::Caller;
use crate::extractors::json::AppJson;
use crate::models::user::*;
use crate::state::AppState;

#[utoipa::path(
    patch,
    path = "/{name}",
    tag = "Users",
    operation_id = "changeUserInfo",
    summary = "Update a user profile",
    description = "Partially updates a user. Users may change their own `library_url`; administrators may change any user, including `is_admin`.",
    params(("name" = String, Path, description = "User name")),
    request_body = ChangeUserInfoRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Malformed body (INVALID_ARGUMENT)", body = ErrorBody),
        (status = 401, description = "Unresolvable token (TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not allowed to change this user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, caller, payload))]
pub async fn change_user_info(
    Caller(caller): Caller,
    State(state): State<AppState>,
    Path(name): Path<String>,
    AppJson(payload): AppJson<ChangeUserInfoRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user =
        account::change_user_info(state.store.as_ref(), &caller, &name, payload.into()).await?;
    Ok(Json(user.into()))
}
