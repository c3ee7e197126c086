use axum::Json;
use axum::extract::{Path, State};
use judge::ProblemStore;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::models::problem::*;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Problems",
    operation_id = "listProblems",
    summary = "List problems",
    description = "Returns every problem known to the judge, ordered by name.",
    responses(
        (status = 200, description = "List of problems", body = ProblemListResponse),
    ),
)]
#[instrument(skip(state))]
pub async fn list_problems(
    State(state): State<AppState>,
) -> Result<Json<ProblemListResponse>, AppError> {
    let problems = state
        .store
        .list_problems()
        .await?
        .into_iter()
        .map(|p| ProblemSummary {
            name: p.name,
            title: p.title,
        })
        .collect();

    Ok(Json(ProblemListResponse { problems }))
}

#[utoipa::path(
    get,
    path = "/{name}",
    tag = "Problems",
    operation_id = "getProblem",
    summary = "Get a problem by name",
    description = "Returns the problem metadata. The time limit is given in seconds.",
    params(("name" = String, Path, description = "Problem name")),
    responses(
        (status = 200, description = "Problem details", body = ProblemInfoResponse),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_problem(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ProblemInfoResponse>, AppError> {
    let problem = state
        .store
        .get_problem(&name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Problem '{name}' not found")))?;

    Ok(Json(problem.into()))
}
