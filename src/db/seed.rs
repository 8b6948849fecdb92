use crate::domain::models::UserRole;
use anyhow::Result;
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use sqlx::PgPool;
use uuid::Uuid;

/// Creates the bootstrap HR account unless that email is already taken.
pub async fn seed_admin(pool: &PgPool, email: &str, password: &str) -> Result<()> {
    let salt = SaltString::generate(rand_core::OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    let inserted = sqlx::query(
        r#"
        INSERT INTO users (id, employee_code, name, email, password_hash, role)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind("HR-0001")
    .bind("HR Administrator")
    .bind(email)
    .bind(hash)
    .bind(UserRole::Hr)
    .execute(pool)
    .await?
    .rows_affected();

    if inserted > 0 {
        tracing::info!("Seeded default HR account {}", email);
    }
    Ok(())
}
