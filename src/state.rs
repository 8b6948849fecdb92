use crate::config::AppConfig;
use crate::middleware::LoginThrottle;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: AppConfig,
    pub login_throttle: LoginThrottle,
}

impl AppState {
    pub fn new(pool: PgPool, config: AppConfig) -> Self {
        let login_throttle = LoginThrottle::per_minute(config.login_attempts_per_minute);
        Self {
            pool,
            config,
            login_throttle,
        }
    }
}

pub type SharedState = Arc<AppState>;
