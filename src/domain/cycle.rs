use crate::domain::models::{Cycle, CycleStatus};
use crate::error::{AppError, AppResult};
use chrono::NaiveDate;

pub fn successor(status: CycleStatus) -> Option<CycleStatus> {
    match status {
        CycleStatus::Draft => Some(CycleStatus::Open),
        CycleStatus::Open => Some(CycleStatus::Closed),
        CycleStatus::Closed => Some(CycleStatus::Finalized),
        CycleStatus::Finalized => None,
    }
}

/// Cycles are created either as a draft or already open.
pub fn initial_status(requested: Option<CycleStatus>) -> AppResult<CycleStatus> {
    match requested.unwrap_or(CycleStatus::Draft) {
        s @ (CycleStatus::Draft | CycleStatus::Open) => Ok(s),
        other => Err(AppError::validation(format!(
            "a cycle cannot be created as {other}"
        ))),
    }
}

/// Manual status edits move one step forward and never reach FINALIZED;
/// finalization belongs to the award coordinator.
pub fn check_manual_transition(from: CycleStatus, to: CycleStatus) -> AppResult<()> {
    if from == to {
        return Ok(());
    }
    match successor(from) {
        Some(next) if next == to && to != CycleStatus::Finalized => Ok(()),
        _ => Err(AppError::invalid_transition(from, to)),
    }
}

pub fn validate_dates(start: NaiveDate, end: NaiveDate) -> AppResult<()> {
    if end > start {
        Ok(())
    } else {
        Err(AppError::validation("end_date must be after start_date"))
    }
}

pub fn should_auto_close(cycle: &Cycle, today: NaiveDate) -> bool {
    cycle.status == CycleStatus::Open && cycle.end_date < today
}
