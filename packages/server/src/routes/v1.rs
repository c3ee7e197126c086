use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/submissions", submission_routes())
        .nest("/problems", problem_routes())
        .nest("/langs", lang_routes())
        .nest("/users", user_routes())
}

fn submission_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::submission::create_submission,
            handlers::submission::list_submissions
        ))
        .routes(routes!(handlers::submission::get_submission))
        .routes(routes!(handlers::submission::rejudge_submission))
}

fn problem_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::problem::list_problems))
        .routes(routes!(handlers::problem::get_problem))
}

fn lang_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::lang::list_langs))
}

fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::user::change_user_info))
}
