use crate::error::{AppError, AppResult};
use crate::services::accounts::{self, Registration, SecurityAnswer};
use crate::state::SharedState;
use crate::web::extract::ApiJson;
use crate::web::response::ApiResponse;
use crate::web::session::{self, CurrentUser};
use crate::domain::models::User;
use axum::{
    extract::{ConnectInfo, State},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

#[derive(Serialize)]
pub struct Registered {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
    pub security_questions: Vec<SecurityAnswer>,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    #[serde(default)]
    pub security_questions: Vec<SecurityAnswer>,
    pub new_password: String,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .with_state(state)
}

async fn register(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<Registration>,
) -> AppResult<ApiResponse<Registered>> {
    let user = accounts::self_register(&state.pool, &payload).await?;
    Ok(ApiResponse::created(
        "User registered successfully",
        Registered { user_id: user.id },
    ))
}

fn client_of(connect_info: Option<ConnectInfo<SocketAddr>>) -> String {
    connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn throttle(state: &SharedState, key: &str) -> AppResult<()> {
    state.login_throttle.hit(key).await.map_err(|retry| {
        tracing::warn!("Rate limit exceeded for {}", key);
        AppError::RateLimited {
            retry_after_secs: retry.as_secs().max(1),
        }
    })
}

async fn login(
    connect_info: Option<ConnectInfo<SocketAddr>>,
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<ApiResponse<TokenResponse>> {
    let client = client_of(connect_info);
    throttle(&state, &client).await?;

    let user = accounts::authenticate(&state.pool, &payload.email, &payload.password)
        .await
        .map_err(|e| {
            if matches!(e, AppError::Unauthorized(_)) {
                tracing::warn!("Failed login for {} from {}", payload.email, client);
            }
            e
        })?;
    state.login_throttle.reset(&client).await;

    let token = session::issue_token(
        user.id,
        user.role,
        &state.config.jwt_secret,
        state.config.token_ttl_minutes,
    )
    .map_err(|e| AppError::Internal(e.into()))?;

    tracing::info!("User {} logged in", user.id);
    Ok(ApiResponse::ok(
        "Login successful",
        TokenResponse {
            access_token: token,
            token_type: "bearer",
        },
    ))
}

pub(crate) async fn me(current: CurrentUser) -> ApiResponse<User> {
    ApiResponse::ok("User profile fetched successfully", current.user)
}

async fn forgot_password(
    connect_info: Option<ConnectInfo<SocketAddr>>,
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<ForgotPasswordRequest>,
) -> AppResult<ApiResponse<Option<()>>> {
    throttle(&state, &format!("recovery:{}", client_of(connect_info))).await?;
    accounts::verify_security_answers(&state.pool, &payload.email, &payload.security_questions)
        .await?;
    Ok(ApiResponse::ok("Security questions verified", None))
}

async fn reset_password(
    connect_info: Option<ConnectInfo<SocketAddr>>,
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> AppResult<ApiResponse<Option<()>>> {
    let key = format!("recovery:{}", client_of(connect_info));
    throttle(&state, &key).await?;
    accounts::reset_password(
        &state.pool,
        &payload.email,
        &payload.security_questions,
        &payload.new_password,
    )
    .await?;
    state.login_throttle.reset(&key).await;
    Ok(ApiResponse::ok("Password reset successful", None))
}
