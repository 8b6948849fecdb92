use crate::db::{self, FormPatch};
use crate::domain::access::require_role;
use crate::domain::models::{Form, UserRole};
use crate::error::{AppError, AppResult};
use crate::services::forms::{self, FormDetail, NewForm};
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
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct FormListQuery {
    pub cycle_id: Option<Uuid>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct UpdateFormRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list_forms).post(create_form))
        .route("/:id", get(get_form).patch(update_form))
        .route("/cycle/:cycle_id/render", get(render_form))
        .with_state(state)
}

async fn create_form(
    current: CurrentUser,
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<NewForm>,
) -> AppResult<ApiResponse<FormDetail>> {
    require_role(&current.actor, &[UserRole::Hr])?;
    let detail = forms::create(&state.pool, &payload).await?;
    Ok(ApiResponse::created("Form created successfully", detail))
}

async fn list_forms(
    _current: CurrentUser,
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<FormListQuery>,
) -> AppResult<ApiResponse<Vec<Form>>> {
    let (skip, limit) = page_bounds(query.skip, query.limit);
    let forms = db::list_forms(&state.pool, query.cycle_id, skip, limit).await?;
    Ok(ApiResponse::ok("Forms fetched successfully", forms))
}

async fn get_form(
    _current: CurrentUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<FormDetail>> {
    let detail = forms::field_definitions(&state.pool, id).await?;
    Ok(ApiResponse::ok("Form fetched successfully", detail))
}

async fn update_form(
    current: CurrentUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateFormRequest>,
) -> AppResult<ApiResponse<Form>> {
    require_role(&current.actor, &[UserRole::Hr])?;
    let patch = FormPatch {
        name: payload.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        description: payload.description,
        is_active: payload.is_active,
    };
    let form = db::update_form(&state.pool, id, &patch)
        .await?
        .ok_or(AppError::NotFound("form"))?;
    tracing::info!("Form {} updated by {}", id, current.actor.id);
    Ok(ApiResponse::ok("Form updated successfully", form))
}

async fn render_form(
    current: CurrentUser,
    State(state): State<SharedState>,
    ApiPath(cycle_id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<FormDetail>> {
    require_role(&current.actor, &[UserRole::Manager, UserRole::Hr])?;
    let detail = forms::render_for_cycle(&state.pool, cycle_id).await?;
    Ok(ApiResponse::ok("Form rendered successfully", detail))
}
