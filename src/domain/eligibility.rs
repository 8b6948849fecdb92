use crate::domain::models::{Cycle, CycleStatus, Form, Nomination, NominationStatus, User};
use crate::domain::workflow;
use crate::error::{AppError, AppResult};
use uuid::Uuid;

/// Everything loaded from storage that decides whether a nomination may be created.
#[derive(Debug, Clone, Copy)]
pub struct NominationCandidate<'a> {
    pub cycle_id: Uuid,
    pub cycle: Option<&'a Cycle>,
    pub form: Option<&'a Form>,
    pub nominee: Option<&'a User>,
    pub existing: Option<&'a Nomination>,
    pub as_draft: bool,
}

pub fn ensure_cycle_open(cycle: &Cycle) -> AppResult<()> {
    if cycle.status == CycleStatus::Open {
        Ok(())
    } else {
        Err(AppError::CycleClosed(format!(
            "cycle is {}, nominations require an OPEN cycle",
            cycle.status
        )))
    }
}

pub fn ensure_form_usable(form: Option<&Form>, cycle_id: Uuid) -> AppResult<&Form> {
    let form = form
        .filter(|f| f.is_active)
        .ok_or(AppError::NotFound("form"))?;
    if form.cycle_id != cycle_id {
        return Err(AppError::validation("form does not belong to cycle"));
    }
    Ok(form)
}

pub fn ensure_nominee_eligible(nominee: Option<&User>) -> AppResult<()> {
    match nominee {
        None => Err(AppError::Eligibility("nominee does not exist".to_string())),
        Some(user) if !user.is_active => {
            Err(AppError::Eligibility("nominee is not active".to_string()))
        }
        Some(_) => Ok(()),
    }
}

/// Any prior row for the (cycle, nominee) pair blocks a new one, whatever its status.
pub fn ensure_not_nominated(existing: Option<&Nomination>) -> AppResult<()> {
    match existing {
        Some(prior) => {
            tracing::debug!(
                "Nominee {} already nominated in cycle {} ({})",
                prior.nominee_id,
                prior.cycle_id,
                prior.status
            );
            Err(AppError::DuplicateNomination)
        }
        None => Ok(()),
    }
}

/// Runs the creation checks in order and returns the initial status.
pub fn check_candidate(candidate: &NominationCandidate<'_>) -> AppResult<NominationStatus> {
    let cycle = candidate.cycle.ok_or(AppError::NotFound("cycle"))?;
    if !candidate.as_draft {
        ensure_cycle_open(cycle)?;
    }
    ensure_form_usable(candidate.form, candidate.cycle_id)?;
    ensure_nominee_eligible(candidate.nominee)?;
    ensure_not_nominated(candidate.existing)?;
    Ok(workflow::initial_status(candidate.as_draft))
}
