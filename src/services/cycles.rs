use crate::db::{self, CyclePatch, NewCycle};
use crate::domain::cycle;
use crate::domain::models::{Cycle, CycleStatus};
use crate::error::{AppError, AppResult};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn create(pool: &PgPool, new: NewCycle<'_>, requested: Option<CycleStatus>) -> AppResult<Cycle> {
    cycle::validate_dates(new.start_date, new.end_date)?;
    let status = cycle::initial_status(requested)?;
    let created = db::insert_cycle(pool, &NewCycle { status, ..new }).await?;
    tracing::info!("Cycle {} created as {}", created.id, created.status);
    Ok(created)
}

pub async fn update(pool: &PgPool, id: Uuid, patch: CyclePatch) -> AppResult<Cycle> {
    let mut tx = pool.begin().await?;
    let current = db::lock_cycle(&mut tx, id)
        .await?
        .ok_or(AppError::NotFound("cycle"))?;

    if let Some(to) = patch.status {
        cycle::check_manual_transition(current.status, to)?;
    }
    cycle::validate_dates(
        patch.start_date.unwrap_or(current.start_date),
        patch.end_date.unwrap_or(current.end_date),
    )?;

    let updated = db::update_cycle(&mut tx, id, &patch).await?;
    tx.commit().await?;

    if updated.status != current.status {
        tracing::info!("Cycle {} moved {} -> {}", id, current.status, updated.status);
    }
    Ok(updated)
}

/// Closes every OPEN cycle whose end date has passed.
pub async fn close_expired(pool: &PgPool, today: NaiveDate) -> anyhow::Result<u64> {
    let expired: Vec<Uuid> = db::open_cycles(pool)
        .await?
        .iter()
        .filter(|c| cycle::should_auto_close(c, today))
        .map(|c| c.id)
        .collect();
    if expired.is_empty() {
        return Ok(0);
    }
    let closed = db::close_cycles(pool, &expired).await?;
    tracing::info!("Auto-closed {} expired cycles", closed);
    Ok(closed)
}
