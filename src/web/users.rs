use crate::db::{self, UserPatch};
use crate::domain::access::require_role;
use crate::domain::models::{User, UserRole};
use crate::error::{AppError, AppResult};
use crate::services::accounts::{self, Registration};
use crate::state::SharedState;
use crate::web::extract::{ApiJson, ApiPath, ApiQuery};
use crate::web::response::ApiResponse;
use crate::web::session::CurrentUser;
use crate::web::page_bounds;
use axum::{
    extract::State,
    routing::get,
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct UserListQuery {
    pub role: Option<UserRole>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub employee_code: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/me", get(crate::web::auth::me))
        .route("/:id", get(get_user).patch(update_user).delete(delete_user))
        .with_state(state)
}

async fn create_user(
    current: CurrentUser,
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<Registration>,
) -> AppResult<ApiResponse<User>> {
    require_role(&current.actor, &[UserRole::Hr])?;
    let user = accounts::register(&state.pool, &payload).await?;
    Ok(ApiResponse::created("User created successfully", user))
}

async fn list_users(
    current: CurrentUser,
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<UserListQuery>,
) -> AppResult<ApiResponse<Vec<User>>> {
    require_role(&current.actor, &[UserRole::Hr])?;
    let (skip, limit) = page_bounds(query.skip, query.limit);
    let users = db::list_users(&state.pool, query.role, skip, limit)
        .await?
        .iter()
        .map(|u| u.profile())
        .collect();
    Ok(ApiResponse::ok("Users fetched successfully", users))
}

async fn get_user(
    current: CurrentUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<User>> {
    require_role(&current.actor, &[UserRole::Hr])?;
    let user = db::find_user_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    Ok(ApiResponse::ok("User fetched successfully", user.profile()))
}

async fn update_user(
    current: CurrentUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> AppResult<ApiResponse<User>> {
    require_role(&current.actor, &[UserRole::Hr])?;
    if let Some(name) = &payload.name {
        if name.trim().is_empty() {
            return Err(AppError::validation("name must not be blank"));
        }
    }
    let patch = UserPatch {
        name: payload.name.map(|n| n.trim().to_string()),
        employee_code: payload.employee_code,
        role: payload.role,
        is_active: payload.is_active,
    };
    let user = db::update_user(&state.pool, id, &patch)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    tracing::info!("User {} updated by {}", id, current.actor.id);
    Ok(ApiResponse::ok("User updated successfully", user.profile()))
}

async fn delete_user(
    current: CurrentUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<Option<()>>> {
    require_role(&current.actor, &[UserRole::Hr])?;
    if id == current.actor.id {
        return Err(AppError::validation("you cannot delete your own account"));
    }
    if !db::deactivate_user(&state.pool, id).await? {
        return Err(AppError::NotFound("user"));
    }
    tracing::info!("User {} deactivated by {}", id, current.actor.id);
    Ok(ApiResponse::ok("User deleted successfully", None))
}
