use crate::domain::models::{Award, Cycle, CycleStatus, Nomination, User};
use crate::error::{AppError, AppResult};
use uuid::Uuid;

/// Loaded state deciding whether an award may be recorded.
#[derive(Debug, Clone, Copy)]
pub struct AwardCandidate<'a> {
    pub cycle: &'a Cycle,
    pub nomination: &'a Nomination,
    pub winner_id: Uuid,
    pub winner: Option<&'a User>,
    pub existing: Option<&'a Award>,
    pub rank: Option<i32>,
}

pub fn check_award(candidate: &AwardCandidate<'_>) -> AppResult<()> {
    if let Some(rank) = candidate.rank {
        if rank < 1 {
            return Err(AppError::validation("rank must be 1 or greater"));
        }
    }
    if candidate.cycle.status == CycleStatus::Finalized {
        return Err(AppError::CycleClosed(
            "cycle is FINALIZED, awards can no longer be added".to_string(),
        ));
    }
    let nomination = candidate.nomination;
    if nomination.cycle_id != candidate.cycle.id {
        return Err(AppError::validation("nomination does not belong to this cycle"));
    }
    if !nomination.status.is_terminal() {
        return Err(AppError::validation(format!(
            "nomination is {}, it must be FINALIZED before creating an award",
            nomination.status
        )));
    }
    if nomination.nominee_id != candidate.winner_id {
        return Err(AppError::WinnerMismatch);
    }
    match candidate.winner {
        Some(user) if user.is_active => {}
        _ => {
            return Err(AppError::Eligibility(
                "winner not found or inactive".to_string(),
            ))
        }
    }
    if candidate.existing.is_some() {
        return Err(AppError::DuplicateAward);
    }
    Ok(())
}

/// Awards of a cycle that still need a `finalized_at` stamp.
pub fn pending_award_ids(awards: &[Award]) -> Vec<Uuid> {
    awards
        .iter()
        .filter(|a| a.finalized_at.is_none())
        .map(|a| a.id)
        .collect()
}

/// Work left for a finalize request: awards to stamp and whether the
/// cycle status still has to change.
#[derive(Debug, PartialEq, Eq)]
pub struct FinalizePlan {
    pub pending: Vec<Uuid>,
    pub mark_cycle: bool,
}

impl FinalizePlan {
    pub fn is_noop(&self) -> bool {
        self.pending.is_empty() && !self.mark_cycle
    }
}

pub fn plan_finalization(cycle: &Cycle, awards: &[Award]) -> FinalizePlan {
    FinalizePlan {
        pending: pending_award_ids(awards),
        mark_cycle: cycle.status != CycleStatus::Finalized,
    }
}
