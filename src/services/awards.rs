use crate::db::{self, NewAward};
use crate::domain::awards::{self, AwardCandidate};
use crate::domain::models::{Award, CycleStatus};
use crate::domain::scoring::{self, RankedNomination, RANKED_STATUSES};
use crate::error::{AppError, AppResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAward {
    pub cycle_id: Uuid,
    pub nomination_id: Uuid,
    pub winner_id: Uuid,
    pub award_type: Option<String>,
    pub rank: Option<i32>,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FinalizeOutcome {
    pub cycle_id: Uuid,
    pub status: CycleStatus,
    pub awards_finalized: u64,
}

pub async fn create(pool: &PgPool, req: &CreateAward) -> AppResult<Award> {
    let mut tx = pool.begin().await?;
    let cycle = db::lock_cycle(&mut tx, req.cycle_id)
        .await?
        .ok_or(AppError::NotFound("cycle"))?;
    let nomination = db::lock_nomination(&mut tx, req.nomination_id)
        .await?
        .ok_or(AppError::NotFound("nomination"))?;
    let winner = db::find_user_by_id(&mut *tx, req.winner_id)
        .await?
        .map(|u| u.profile());
    let existing = db::find_award_for_nomination(&mut tx, nomination.id).await?;

    awards::check_award(&AwardCandidate {
        cycle: &cycle,
        nomination: &nomination,
        winner_id: req.winner_id,
        winner: winner.as_ref(),
        existing: existing.as_ref(),
        rank: req.rank,
    })?;

    let award = db::insert_award(
        &mut tx,
        &NewAward {
            cycle_id: cycle.id,
            nomination_id: nomination.id,
            winner_id: req.winner_id,
            award_type: req.award_type.as_deref(),
            rank: req.rank,
            comment: req.comment.as_deref(),
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        "Award {} recorded for nomination {} in cycle {}",
        award.id,
        award.nomination_id,
        award.cycle_id
    );
    Ok(award)
}

/// Stamps every unfinalized award of the cycle and marks the cycle
/// FINALIZED. Running it again changes nothing.
pub async fn finalize_cycle(pool: &PgPool, cycle_id: Uuid) -> AppResult<FinalizeOutcome> {
    let mut tx = pool.begin().await?;
    let cycle = db::lock_cycle(&mut tx, cycle_id)
        .await?
        .ok_or(AppError::NotFound("cycle"))?;

    let current = db::lock_awards_for_cycle(&mut tx, cycle_id).await?;
    let plan = awards::plan_finalization(&cycle, &current);
    if plan.is_noop() {
        tracing::info!("Cycle {} already finalized, nothing to stamp", cycle_id);
    }
    let stamped = if plan.pending.is_empty() {
        0
    } else {
        db::stamp_awards(&mut tx, &plan.pending, Utc::now()).await?
    };
    if plan.mark_cycle {
        db::set_cycle_status(&mut tx, cycle_id, CycleStatus::Finalized).await?;
    }
    tx.commit().await?;

    tracing::info!(
        "Cycle {} finalized ({} awards stamped, was {})",
        cycle_id,
        stamped,
        cycle.status
    );
    Ok(FinalizeOutcome {
        cycle_id,
        status: CycleStatus::Finalized,
        awards_finalized: stamped,
    })
}

pub async fn list_for_cycle(pool: &PgPool, cycle_id: Uuid) -> AppResult<Vec<Award>> {
    db::find_cycle(pool, cycle_id)
        .await?
        .ok_or(AppError::NotFound("cycle"))?;
    Ok(db::awards_for_cycle(pool, cycle_id).await?)
}

/// Reviewed and in-review nominations of a cycle, best average first.
pub async fn ranking(pool: &PgPool, cycle_id: Uuid) -> AppResult<Vec<RankedNomination>> {
    db::find_cycle(pool, cycle_id)
        .await?
        .ok_or(AppError::NotFound("cycle"))?;
    let rows = db::nominations_with_scores(pool, cycle_id, &RANKED_STATUSES).await?;
    let entries = rows
        .iter()
        .map(|row| RankedNomination::new(&row.nomination, &row.scores))
        .collect();
    Ok(scoring::rank(entries))
}
