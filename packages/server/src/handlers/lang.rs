use axum::Json;
use axum::extract::State;

use crate::models::lang::*;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Languages",
    operation_id = "listLangs",
    summary = "List supported languages",
    responses(
        (status = 200, description = "Configured languages", body = LangListResponse),
    ),
)]
pub async fn list_langs(State(state): State<AppState>) -> Json<LangListResponse> {
    Json(LangListResponse {
        langs: state.langs.list().iter().map(LangResponse::from).collect(),
    })
}
