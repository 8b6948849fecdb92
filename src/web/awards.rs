use crate::domain::access::require_role;
use crate::domain::models::{Award, UserRole};
use crate::domain::scoring::RankedNomination;
use crate::error::AppResult;
use crate::services::awards::{self, CreateAward, FinalizeOutcome};
use crate::state::SharedState;
use crate::web::extract::{ApiJson, ApiPath};
use crate::web::response::ApiResponse;
use crate::web::session::CurrentUser;
use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", post(create_award))
        .route("/cycle/:cycle_id", get(list_awards))
        .route("/cycle/:cycle_id/finalize", post(finalize))
        .route("/cycle/:cycle_id/nominations-with-scores", get(ranking))
        .with_state(state)
}

async fn create_award(
    current: CurrentUser,
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<CreateAward>,
) -> AppResult<ApiResponse<Award>> {
    require_role(&current.actor, &[UserRole::Hr])?;
    let award = awards::create(&state.pool, &payload).await?;
    Ok(ApiResponse::created("Award created successfully", award))
}

async fn list_awards(
    current: CurrentUser,
    State(state): State<SharedState>,
    ApiPath(cycle_id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<Vec<Award>>> {
    require_role(&current.actor, &[UserRole::Hr])?;
    let rows = awards::list_for_cycle(&state.pool, cycle_id).await?;
    Ok(ApiResponse::ok("Awards fetched successfully", rows))
}

async fn finalize(
    current: CurrentUser,
    State(state): State<SharedState>,
    ApiPath(cycle_id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<FinalizeOutcome>> {
    require_role(&current.actor, &[UserRole::Hr])?;
    let outcome = awards::finalize_cycle(&state.pool, cycle_id).await?;
    Ok(ApiResponse::ok("Cycle finalized successfully", outcome))
}

async fn ranking(
    current: CurrentUser,
    State(state): State<SharedState>,
    ApiPath(cycle_id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<Vec<RankedNomination>>> {
    require_role(&current.actor, &[UserRole::Hr])?;
    let rows = awards::ranking(&state.pool, cycle_id).await?;
    Ok(ApiResponse::ok("Nominations with scores fetched successfully", rows))
}
