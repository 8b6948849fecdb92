//! Nomination lifecycle: creation, draft edits, status moves and panel reviews.
//!
//! Every write runs in one transaction. Rows whose status matters are read
//! with `FOR UPDATE` and status writes are compare-and-set, so two racing
//! requests cannot both move the same nomination.

use crate::db::{self, NewNomination, NominationFilter};
use crate::domain::access::{require_role, Actor};
use crate::domain::eligibility::{self, NominationCandidate};
use crate::domain::form_schema::{AnswerInput, CompiledForm, ValidationMode};
use crate::domain::models::{
    Cycle, FormAnswer, Nomination, NominationStatus, PanelReview, UserRole,
};
use crate::domain::scoring::{self, ScoreSummary};
use crate::domain::workflow;
use crate::error::{AppError, AppResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateNomination {
    pub cycle_id: Uuid,
    pub form_id: Uuid,
    pub nominee_id: Uuid,
    #[serde(default)]
    pub answers: Vec<AnswerInput>,
    #[serde(default)]
    pub as_draft: bool,
}

#[derive(Debug, Serialize)]
pub struct NominationDetail {
    #[serde(flatten)]
    pub nomination: Nomination,
    pub answers: Vec<FormAnswer>,
}

#[derive(Debug, Serialize)]
pub struct ReviewSheet {
    pub nomination_id: Uuid,
    pub summary: ScoreSummary,
    pub reviews: Vec<PanelReview>,
}

/// Only the nominator may change a nomination's answers, and only while it is a DRAFT.
pub fn check_draft_editor(nomination: &Nomination, actor: &Actor) -> AppResult<()> {
    if nomination.nominated_by_id != actor.id {
        return Err(AppError::Forbidden(
            "only the nominator can edit this nomination".to_string(),
        ));
    }
    if nomination.status != NominationStatus::Draft {
        return Err(AppError::validation(format!(
            "only draft nominations can be edited, this one is {}",
            nomination.status
        )));
    }
    Ok(())
}

/// A draft may only be submitted into an OPEN cycle, and its saved answers
/// must pass the submission rules that drafts were allowed to skip.
pub fn check_submission_ready(cycle: &Cycle, form: &CompiledForm, stored: Vec<FormAnswer>) -> AppResult<()> {
    eligibility::ensure_cycle_open(cycle)?;
    let answers: Vec<AnswerInput> = stored
        .into_iter()
        .map(|a| AnswerInput {
            field_key: a.field_key,
            value: a.value,
        })
        .collect();
    form.validate(&answers, ValidationMode::Submission)
}

async fn compiled_form(conn: &mut PgConnection, form_id: Uuid) -> AppResult<CompiledForm> {
    let fields = db::fields_for_form(&mut *conn, form_id).await?;
    CompiledForm::compile(&fields)
}

pub async fn create(pool: &PgPool, actor: &Actor, req: &CreateNomination) -> AppResult<NominationDetail> {
    require_role(actor, &[UserRole::Manager, UserRole::Hr])?;

    let mut tx = pool.begin().await?;
    let cycle = db::find_cycle(&mut *tx, req.cycle_id).await?;
    let form = db::find_form(&mut *tx, req.form_id).await?;
    let nominee = db::find_user_by_id(&mut *tx, req.nominee_id)
        .await?
        .map(|u| u.profile());
    let existing = db::find_nomination_for_nominee(&mut tx, req.cycle_id, req.nominee_id).await?;

    let status = eligibility::check_candidate(&NominationCandidate {
        cycle_id: req.cycle_id,
        cycle: cycle.as_ref(),
        form: form.as_ref(),
        nominee: nominee.as_ref(),
        existing: existing.as_ref(),
        as_draft: req.as_draft,
    })?;

    let mode = if req.as_draft {
        ValidationMode::Draft
    } else {
        ValidationMode::Submission
    };
    compiled_form(&mut tx, req.form_id)
        .await?
        .validate(&req.answers, mode)?;

    let nomination = db::insert_nomination(
        &mut tx,
        &NewNomination {
            cycle_id: req.cycle_id,
            form_id: req.form_id,
            nominee_id: req.nominee_id,
            nominated_by_id: actor.id,
            status,
            submitted_at: (status == NominationStatus::Submitted).then(Utc::now),
        },
    )
    .await?;
    db::replace_answers(&mut tx, nomination.id, &req.answers).await?;
    let answers = db::answers_for(&mut *tx, nomination.id).await?;
    tx.commit().await?;

    tracing::info!(
        "Nomination {} created by {} for {} in cycle {} ({})",
        nomination.id,
        actor.id,
        nomination.nominee_id,
        nomination.cycle_id,
        nomination.status
    );
    Ok(NominationDetail { nomination, answers })
}

/// Replaces the answers of a DRAFT nomination; only its nominator may do so.
pub async fn update_draft(
    pool: &PgPool,
    actor: &Actor,
    id: Uuid,
    answers: &[AnswerInput],
) -> AppResult<NominationDetail> {
    let mut tx = pool.begin().await?;
    let mut nomination = db::lock_nomination(&mut tx, id)
        .await?
        .ok_or(AppError::NotFound("nomination"))?;
    check_draft_editor(&nomination, actor)?;

    compiled_form(&mut tx, nomination.form_id)
        .await?
        .validate(answers, ValidationMode::Draft)?;
    db::replace_answers(&mut tx, id, answers).await?;
    nomination.updated_at = db::touch_nomination(&mut tx, id).await?;
    let stored = db::answers_for(&mut *tx, id).await?;
    tx.commit().await?;

    tracing::info!("Draft nomination {} updated", id);
    Ok(NominationDetail {
        nomination,
        answers: stored,
    })
}

pub async fn change_status(
    pool: &PgPool,
    actor: &Actor,
    id: Uuid,
    requested: NominationStatus,
) -> AppResult<Nomination> {
    let mut tx = pool.begin().await?;
    let mut nomination = db::lock_nomination(&mut tx, id)
        .await?
        .ok_or(AppError::NotFound("nomination"))?;

    let transition = workflow::plan_transition(&nomination, requested, actor)?;

    if transition.is_submission() {
        let cycle = db::find_cycle(&mut *tx, nomination.cycle_id)
            .await?
            .ok_or(AppError::NotFound("cycle"))?;
        let form = compiled_form(&mut tx, nomination.form_id).await?;
        let stored = db::answers_for(&mut *tx, id).await?;
        check_submission_ready(&cycle, &form, stored)?;
    }

    let change = workflow::apply(&nomination, &transition, Utc::now());
    let updated = db::apply_status_change(&mut tx, id, transition.from, &change).await?;
    if updated == 0 {
        return Err(AppError::Conflict(
            "nomination status changed concurrently, reload and retry".to_string(),
        ));
    }
    tx.commit().await?;

    tracing::info!(
        "Nomination {} moved {} -> {} by {}",
        id,
        transition.from,
        transition.to,
        actor.id
    );
    nomination.status = change.status;
    nomination.submitted_at = change.submitted_at;
    nomination.updated_at = change.updated_at;
    Ok(nomination)
}

/// Query filter enforcing who may see which nominations in listings.
pub fn listing_filter(
    actor: &Actor,
    cycle_id: Option<Uuid>,
    status: Option<NominationStatus>,
) -> AppResult<NominationFilter> {
    require_role(actor, &[UserRole::Hr, UserRole::Manager, UserRole::Panel])?;
    let mut filter = NominationFilter {
        cycle_id,
        status,
        ..NominationFilter::default()
    };
    match actor.role {
        UserRole::Manager => filter.nominated_by = Some(actor.id),
        UserRole::Panel => filter.reviewer = Some(actor.id),
        _ => {}
    }
    Ok(filter)
}

pub fn history_filter(actor: &Actor, cycle_id: Option<Uuid>) -> AppResult<NominationFilter> {
    require_role(actor, &[UserRole::Hr, UserRole::Manager])?;
    Ok(NominationFilter {
        cycle_id,
        nominated_by: actor.is(UserRole::Manager).then_some(actor.id),
        ..NominationFilter::default()
    })
}

pub async fn list(pool: &PgPool, filter: &NominationFilter) -> AppResult<Vec<Nomination>> {
    Ok(db::list_nominations(pool, filter).await?)
}

pub async fn get(pool: &PgPool, actor: &Actor, id: Uuid) -> AppResult<NominationDetail> {
    let nomination = db::find_nomination(pool, id)
        .await?
        .ok_or(AppError::NotFound("nomination"))?;

    let visible = match actor.role {
        UserRole::Hr => true,
        UserRole::Manager => nomination.nominated_by_id == actor.id,
        UserRole::Panel => {
            nomination.status == NominationStatus::PanelReview
                || db::has_reviewed(pool, id, actor.id).await?
        }
        UserRole::Employee => false,
    };
    if !visible {
        return Err(AppError::forbidden());
    }

    let answers = db::answers_for(pool, id).await?;
    Ok(NominationDetail { nomination, answers })
}

pub async fn submit_review(
    pool: &PgPool,
    actor: &Actor,
    nomination_id: Uuid,
    score: i32,
    comments: Option<&str>,
) -> AppResult<PanelReview> {
    require_role(actor, &[UserRole::Panel])?;
    scoring::validate_score(score)?;

    let mut tx = pool.begin().await?;
    let nomination = db::lock_nomination(&mut tx, nomination_id)
        .await?
        .ok_or(AppError::NotFound("nomination"))?;
    scoring::ensure_reviewable(&nomination)?;

    let review = db::upsert_review(&mut tx, nomination_id, actor.id, score, comments).await?;
    tx.commit().await?;

    tracing::info!(
        "Panel member {} scored nomination {} with {}",
        actor.id,
        nomination_id,
        score
    );
    Ok(review)
}

pub async fn review_sheet(pool: &PgPool, nomination_id: Uuid) -> AppResult<ReviewSheet> {
    db::find_nomination(pool, nomination_id)
        .await?
        .ok_or(AppError::NotFound("nomination"))?;
    let reviews = db::reviews_for(pool, nomination_id).await?;
    let scores: Vec<i32> = reviews.iter().map(|r| r.score).collect();
    Ok(ReviewSheet {
        nomination_id,
        summary: scoring::summarize(&scores),
        reviews,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::eligibility::tests::cycle;
    use crate::domain::form_schema::tests::field;
    use crate::domain::models::{CycleStatus, FieldType};
    use crate::domain::workflow::tests::nomination;
    use serde_json::json;

    #[test]
    fn managers_see_only_their_own() {
        let manager = Actor::new(Uuid::new_v4(), UserRole::Manager);
        let filter = listing_filter(&manager, None, None).unwrap();
        assert_eq!(filter.nominated_by, Some(manager.id));
        assert_eq!(filter.reviewer, None);
    }

    #[test]
    fn panel_sees_review_queue() {
        let panel = Actor::new(Uuid::new_v4(), UserRole::Panel);
        let filter = listing_filter(&panel, None, Some(NominationStatus::PanelReview)).unwrap();
        assert_eq!(filter.reviewer, Some(panel.id));
        assert_eq!(filter.nominated_by, None);
        assert_eq!(filter.status, Some(NominationStatus::PanelReview));
    }

    #[test]
    fn hr_sees_everything() {
        let hr = Actor::new(Uuid::new_v4(), UserRole::Hr);
        let cycle = Uuid::new_v4();
        let filter = listing_filter(&hr, Some(cycle), None).unwrap();
        assert_eq!(filter.cycle_id, Some(cycle));
        assert_eq!(filter.nominated_by, None);
        assert_eq!(filter.reviewer, None);
    }

    #[test]
    fn employees_cannot_list() {
        let employee = Actor::new(Uuid::new_v4(), UserRole::Employee);
        assert!(matches!(
            listing_filter(&employee, None, None),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn history_is_scoped_for_managers_and_closed_to_panel() {
        let manager = Actor::new(Uuid::new_v4(), UserRole::Manager);
        assert_eq!(history_filter(&manager, None).unwrap().nominated_by, Some(manager.id));

        let hr = Actor::new(Uuid::new_v4(), UserRole::Hr);
        assert_eq!(history_filter(&hr, None).unwrap().nominated_by, None);

        let panel = Actor::new(Uuid::new_v4(), UserRole::Panel);
        assert!(history_filter(&panel, None).is_err());
    }

    #[test]
    fn create_request_defaults_to_submission() {
        let body = serde_json::json!({
            "cycle_id": Uuid::new_v4(),
            "form_id": Uuid::new_v4(),
            "nominee_id": Uuid::new_v4(),
            "answers": [{"field_key": "performance", "value": 4}]
        });
        let req: CreateNomination = serde_json::from_value(body).unwrap();
        assert!(!req.as_draft);
        assert_eq!(req.answers.len(), 1);
    }

    fn rating_form() -> CompiledForm {
        CompiledForm::compile(&[
            field("performance", FieldType::Rating, true, 1),
            field("notes", FieldType::Text, false, 2),
        ])
        .unwrap()
    }

    fn saved(key: &str, value: serde_json::Value) -> FormAnswer {
        FormAnswer {
            id: Uuid::new_v4(),
            nomination_id: Uuid::new_v4(),
            field_key: key.to_string(),
            value,
        }
    }

    #[test]
    fn complete_draft_in_open_cycle_can_be_submitted() {
        let open = cycle(CycleStatus::Open);
        let stored = vec![saved("performance", json!(4))];
        assert!(check_submission_ready(&open, &rating_form(), stored).is_ok());
    }

    #[test]
    fn draft_missing_a_required_answer_cannot_be_submitted() {
        let open = cycle(CycleStatus::Open);
        let stored = vec![saved("notes", json!("strong quarter"))];
        let err = check_submission_ready(&open, &rating_form(), stored).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("performance"));
    }

    #[test]
    fn draft_cannot_be_submitted_once_the_cycle_closed() {
        for status in [CycleStatus::Draft, CycleStatus::Closed, CycleStatus::Finalized] {
            let stored = vec![saved("performance", json!(5))];
            assert!(matches!(
                check_submission_ready(&cycle(status), &rating_form(), stored),
                Err(AppError::CycleClosed(_))
            ));
        }
    }

    #[test]
    fn only_the_nominator_edits_a_draft() {
        let manager = Actor::new(Uuid::new_v4(), UserRole::Manager);
        let other = Actor::new(Uuid::new_v4(), UserRole::Manager);
        let draft = nomination(NominationStatus::Draft, manager.id);
        assert!(check_draft_editor(&draft, &manager).is_ok());
        assert!(matches!(check_draft_editor(&draft, &other), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn submitted_nomination_is_no_longer_editable() {
        let manager = Actor::new(Uuid::new_v4(), UserRole::Manager);
        let submitted = nomination(NominationStatus::Submitted, manager.id);
        assert!(matches!(
            check_draft_editor(&submitted, &manager),
            Err(AppError::Validation(_))
        ));
    }
}
