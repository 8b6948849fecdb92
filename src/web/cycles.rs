use crate::db::{self, CyclePatch, NewCycle};
use crate::domain::access::require_role;
use crate::domain::models::{Cycle, CycleStatus, UserRole};
use crate::error::{AppError, AppResult};
use crate::services::cycles;
use crate::state::SharedState;
use crate::web::page_bounds;
use crate::web::extract::{ApiJson, ApiPath, ApiQuery};
use crate::web::response::ApiResponse;
use crate::web::session::CurrentUser;
use axum::{
    extract::State,
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct CreateCycleRequest {
    pub name: String,
    pub description: Option<String>,
    pub quarter: String,
    pub year: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: Option<CycleStatus>,
}

#[derive(Deserialize)]
pub struct UpdateCycleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<CycleStatus>,
}

#[derive(Deserialize)]
pub struct CycleListQuery {
    pub status: Option<CycleStatus>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list_cycles).post(create_cycle))
        .route("/:id", get(get_cycle).patch(update_cycle))
        .with_state(state)
}

async fn create_cycle(
    current: CurrentUser,
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<CreateCycleRequest>,
) -> AppResult<ApiResponse<Cycle>> {
    require_role(&current.actor, &[UserRole::Hr])?;
    if payload.name.trim().is_empty() || payload.quarter.trim().is_empty() {
        return Err(AppError::validation("name and quarter are required"));
    }
    let cycle = cycles::create(
        &state.pool,
        NewCycle {
            name: payload.name.trim(),
            description: payload.description.as_deref(),
            quarter: payload.quarter.trim(),
            year: payload.year,
            start_date: payload.start_date,
            end_date: payload.end_date,
            status: CycleStatus::Draft,
        },
        payload.status,
    )
    .await?;
    Ok(ApiResponse::created("Cycle created successfully", cycle))
}

async fn list_cycles(
    _current: CurrentUser,
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<CycleListQuery>,
) -> AppResult<ApiResponse<Vec<Cycle>>> {
    let (skip, limit) = page_bounds(query.skip, query.limit);
    let cycles = db::list_cycles(&state.pool, query.status, skip, limit).await?;
    Ok(ApiResponse::ok("Cycles fetched successfully", cycles))
}

async fn get_cycle(
    _current: CurrentUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<Cycle>> {
    let cycle = db::find_cycle(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound("cycle"))?;
    Ok(ApiResponse::ok("Cycle fetched successfully", cycle))
}

async fn update_cycle(
    current: CurrentUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateCycleRequest>,
) -> AppResult<ApiResponse<Cycle>> {
    require_role(&current.actor, &[UserRole::Hr])?;
    let patch = CyclePatch {
        name: payload.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        description: payload.description,
        start_date: payload.start_date,
        end_date: payload.end_date,
        status: payload.status,
    };
    let cycle = cycles::update(&state.pool, id, patch).await?;
    Ok(ApiResponse::ok("Cycle updated successfully", cycle))
}
