use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use judge::{ListQuery, SubmissionFilter, SubmissionStore, listing, rejudge, submit};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::Caller;
use crate::extractors::json::AppJson;
use crate::models::submission::*;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/",
    tag = "Submissions",
    operation_id = "createSubmission",
    summary = "Submit source code",
    description = "Queues a submission in `WaitingJudge`. Anonymous callers may submit. The source must be non-empty and within the configured size limit, and the language must be one of `GET /langs`.",
    request_body = SubmitRequest,
    responses(
        (status = 201, description = "Submission queued", body = SubmitResponse),
        (status = 400, description = "Empty or oversized source, or unknown language (INVALID_ARGUMENT)", body = ErrorBody),
        (status = 401, description = "Unresolvable token (TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
    security((), ("jwt" = [])),
)]
#[instrument(skip(state, caller, payload), fields(problem = %payload.problem, lang = %payload.lang))]
pub async fn create_submission(
    Caller(caller): Caller,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let submission = submit::submit(
        state.store.as_ref(),
        &state.langs,
        state.config.submission.max_source_size,
        &caller,
        submit::SubmitRequest {
            problem: payload.problem,
            source: payload.source,
            lang: payload.lang,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse { id: submission.id }),
    ))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Submissions",
    operation_id = "listSubmissions",
    summary = "List submissions",
    description = "Returns one page of submissions and the total number of matches. Ordering defaults to newest first; ties are broken by id descending and submissions without a recorded time sort last.",
    params(SubmissionListQuery),
    responses(
        (status = 200, description = "Page of submissions", body = SubmissionListResponse),
        (status = 400, description = "Unknown order or limit above 1000 (INVALID_ARGUMENT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_submissions(
    State(state): State<AppState>,
    Query(query): Query<SubmissionListQuery>,
) -> Result<Json<SubmissionListResponse>, AppError> {
    let filter = SubmissionFilter {
        problem: query.problem.filter(|p| !p.is_empty()),
        user: query.user.filter(|u| !u.is_empty()),
        status: query.status,
        lang: query.lang.filter(|l| !l.is_empty()),
    };
    let list_query = ListQuery::new(
        filter,
        query.order.as_deref().unwrap_or(""),
        query.skip.unwrap_or(0),
        query.limit.unwrap_or(0),
    )?;

    let page = listing::list(state.store.as_ref(), &list_query).await?;

    Ok(Json(SubmissionListResponse {
        submissions: page.submissions.iter().map(SubmissionOverview::from).collect(),
        count: page.count,
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Submissions",
    operation_id = "getSubmission",
    summary = "Get submission details",
    description = "Returns the submission overview, its source, and the test case results recorded so far for the current judge attempt. Results of earlier attempts are never included.",
    params(("id" = i32, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Submission details", body = SubmissionInfoResponse),
        (status = 401, description = "Unresolvable token (TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Submission not found (NOT_FOUND)", body = ErrorBody),
    ),
    security((), ("jwt" = [])),
)]
#[instrument(skip(state, caller))]
pub async fn get_submission(
    Caller(caller): Caller,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SubmissionInfoResponse>, AppError> {
    let submission = state
        .store
        .get_submission(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Submission {id} not found")))?;

    let results = state
        .store
        .results(submission.id, submission.judge_attempt)
        .await?;

    Ok(Json(SubmissionInfoResponse {
        overview: SubmissionOverview::from(&submission),
        can_rejudge: caller.is_admin(),
        case_results: results.into_iter().map(CaseResultResponse::from).collect(),
        compile_error: submission.compile_error,
        source: submission.source,
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/rejudge",
    tag = "Submissions",
    operation_id = "rejudgeSubmission",
    summary = "Rejudge a submission",
    description = "Re-arms the submission for another judging pass under a new attempt number. Administrators only. A submission that is already waiting is left unchanged.",
    params(("id" = i32, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Rejudge accepted", body = RejudgeResponse),
        (status = 401, description = "Unresolvable token (TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Caller is not an administrator (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Submission not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Lost a race with a concurrent update (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, caller))]
pub async fn rejudge_submission(
    Caller(caller): Caller,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<RejudgeResponse>, AppError> {
    rejudge::rejudge(state.store.as_ref(), id, &caller).await?;
    Ok(Json(RejudgeResponse {}))
}
