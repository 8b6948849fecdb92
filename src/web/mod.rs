pub mod auth;
pub mod awards;
pub mod cycles;
pub mod extract;
pub mod forms;
pub mod nominations;
pub mod response;
pub mod session;
pub mod users;

use crate::error::AppError;
use crate::state::SharedState;
use axum::{routing::get, Router};
use response::ApiResponse;
use serde::Serialize;

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 500;

/// Normalizes `skip`/`limit` query parameters into an (offset, limit) pair.
pub fn page_bounds(skip: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let skip = skip.unwrap_or(0).max(0);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (skip, limit)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> ApiResponse<Health> {
    ApiResponse::ok("Service is healthy", Health { status: "ok" })
}

async fn unknown_route() -> AppError {
    AppError::NotFound("route")
}

pub fn routes(state: SharedState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::router(state.clone()))
        .nest("/users", users::router(state.clone()))
        .nest("/cycles", cycles::router(state.clone()))
        .nest("/forms", forms::router(state.clone()))
        .nest("/nominations", nominations::router(state.clone()))
        .nest("/awards", awards::router(state));
    Router::new().nest("/api/v1", api).fallback(unknown_route)
}
