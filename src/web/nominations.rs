use crate::domain::access::require_role;
use crate::domain::form_schema::AnswerInput;
use crate::domain::models::{Nomination, NominationStatus, PanelReview, UserRole};
use crate::error::AppResult;
use crate::services::nominations::{
    self, CreateNomination, NominationDetail, ReviewSheet,
};
use crate::state::SharedState;
use crate::web::extract::{ApiJson, ApiPath, ApiQuery};
use crate::web::response::ApiResponse;
use crate::web::session::CurrentUser;
use axum::{
    extract::State,
    routing::{get, patch},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct NominationListQuery {
    pub cycle_id: Option<Uuid>,
    pub status: Option<NominationStatus>,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub cycle_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct UpdateDraftRequest {
    pub answers: Vec<AnswerInput>,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: NominationStatus,
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub score: i32,
    pub comments: Option<String>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list_nominations).post(create_nomination))
        .route("/history", get(history))
        .route("/:id", get(get_nomination).put(update_draft))
        .route("/:id/status", patch(change_status))
        .route("/:id/reviews", get(list_reviews).post(submit_review))
        .with_state(state)
}

async fn create_nomination(
    current: CurrentUser,
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<CreateNomination>,
) -> AppResult<ApiResponse<NominationDetail>> {
    let detail = nominations::create(&state.pool, &current.actor, &payload).await?;
    let message = if payload.as_draft {
        "Nomination saved as draft"
    } else {
        "Nomination submitted successfully"
    };
    Ok(ApiResponse::created(message, detail))
}

async fn list_nominations(
    current: CurrentUser,
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<NominationListQuery>,
) -> AppResult<ApiResponse<Vec<Nomination>>> {
    let filter = nominations::listing_filter(&current.actor, query.cycle_id, query.status)?;
    let rows = nominations::list(&state.pool, &filter).await?;
    Ok(ApiResponse::ok("Nominations fetched successfully", rows))
}

async fn history(
    current: CurrentUser,
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> AppResult<ApiResponse<Vec<Nomination>>> {
    let filter = nominations::history_filter(&current.actor, query.cycle_id)?;
    let rows = nominations::list(&state.pool, &filter).await?;
    Ok(ApiResponse::ok("Nomination history fetched successfully", rows))
}

async fn get_nomination(
    current: CurrentUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<NominationDetail>> {
    let detail = nominations::get(&state.pool, &current.actor, id).await?;
    Ok(ApiResponse::ok("Nomination fetched successfully", detail))
}

async fn update_draft(
    current: CurrentUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateDraftRequest>,
) -> AppResult<ApiResponse<NominationDetail>> {
    let detail = nominations::update_draft(&state.pool, &current.actor, id, &payload.answers).await?;
    Ok(ApiResponse::ok("Draft nomination updated", detail))
}

async fn change_status(
    current: CurrentUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<StatusRequest>,
) -> AppResult<ApiResponse<Nomination>> {
    let nomination =
        nominations::change_status(&state.pool, &current.actor, id, payload.status).await?;
    Ok(ApiResponse::ok("Nomination status updated", nomination))
}

async fn submit_review(
    current: CurrentUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<ReviewRequest>,
) -> AppResult<ApiResponse<PanelReview>> {
    let review = nominations::submit_review(
        &state.pool,
        &current.actor,
        id,
        payload.score,
        payload.comments.as_deref(),
    )
    .await?;
    Ok(ApiResponse::ok("Review submitted successfully", review))
}

async fn list_reviews(
    current: CurrentUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<ReviewSheet>> {
    require_role(&current.actor, &[UserRole::Hr])?;
    let sheet = nominations::review_sheet(&state.pool, id).await?;
    Ok(ApiResponse::ok("Reviews fetched successfully", sheet))
}
