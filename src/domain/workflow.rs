//! Nomination status workflow.
//!
//! `TRANSITIONS` is the only place allowed moves are declared. Everything
//! else (handlers, services, tests) asks this module.

use crate::domain::access::Actor;
use crate::domain::models::{Nomination, NominationStatus, UserRole};
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionActor {
    /// The user recorded as `nominated_by_id`.
    Nominator,
    Hr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: NominationStatus,
    pub to: NominationStatus,
    pub actor: TransitionActor,
}

impl Transition {
    /// Submission is the only move that re-checks the cycle and the answers.
    pub fn is_submission(&self) -> bool {
        self.from == NominationStatus::Draft && self.to == NominationStatus::Submitted
    }
}

pub const TRANSITIONS: [Transition; 4] = [
    Transition {
        from: NominationStatus::Draft,
        to: NominationStatus::Submitted,
        actor: TransitionActor::Nominator,
    },
    Transition {
        from: NominationStatus::Submitted,
        to: NominationStatus::HrReview,
        actor: TransitionActor::Hr,
    },
    Transition {
        from: NominationStatus::HrReview,
        to: NominationStatus::PanelReview,
        actor: TransitionActor::Hr,
    },
    Transition {
        from: NominationStatus::PanelReview,
        to: NominationStatus::Finalized,
        actor: TransitionActor::Hr,
    },
];

pub fn initial_status(as_draft: bool) -> NominationStatus {
    if as_draft {
        NominationStatus::Draft
    } else {
        NominationStatus::Submitted
    }
}

pub fn find_transition(from: NominationStatus, to: NominationStatus) -> AppResult<Transition> {
    TRANSITIONS
        .iter()
        .copied()
        .find(|t| t.from == from && t.to == to)
        .ok_or_else(|| AppError::invalid_transition(from, to))
}

pub fn authorize(transition: &Transition, actor: &Actor, nomination: &Nomination) -> AppResult<()> {
    let allowed = match transition.actor {
        TransitionActor::Nominator => nomination.nominated_by_id == actor.id,
        TransitionActor::Hr => actor.is(UserRole::Hr),
    };
    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "not allowed to move nomination from {} to {}",
            transition.from, transition.to
        )))
    }
}

/// Table lookup followed by the actor check; the cycle/answer checks of a
/// submission are the caller's job since they need storage.
pub fn plan_transition(
    nomination: &Nomination,
    requested: NominationStatus,
    actor: &Actor,
) -> AppResult<Transition> {
    let transition = find_transition(nomination.status, requested)?;
    authorize(&transition, actor, nomination)?;
    Ok(transition)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: NominationStatus,
    pub updated_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

pub fn apply(nomination: &Nomination, transition: &Transition, now: DateTime<Utc>) -> StatusChange {
    StatusChange {
        status: transition.to,
        updated_at: now,
        submitted_at: if transition.is_submission() {
            Some(now)
        } else {
            nomination.submitted_at
        },
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use uuid::Uuid;

    pub(crate) fn nomination(status: NominationStatus, nominator: Uuid) -> Nomination {
        let now = Utc::now();
        Nomination {
            id: Uuid::new_v4(),
            cycle_id: Uuid::new_v4(),
            form_id: Uuid::new_v4(),
            nominee_id: Uuid::new_v4(),
            nominated_by_id: nominator,
            status,
            submitted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn every_pair_outside_the_table_is_rejected() {
        let mut allowed = 0;
        let mut rejected = 0;
        for from in NominationStatus::ALL {
            for to in NominationStatus::ALL {
                if from == to {
                    continue;
                }
                let in_table = TRANSITIONS.iter().any(|t| t.from == from && t.to == to);
                match find_transition(from, to) {
                    Ok(_) => {
                        assert!(in_table, "{from} -> {to} should be rejected");
                        allowed += 1;
                    }
                    Err(AppError::InvalidTransition { from: f, to: t }) => {
                        assert!(!in_table);
                        assert_eq!(f, from.as_str());
                        assert_eq!(t, to.as_str());
                        rejected += 1;
                    }
                    Err(other) => panic!("unexpected error {other:?}"),
                }
            }
        }
        assert_eq!(allowed + rejected, 20);
        assert_eq!(allowed, 4);
    }

    #[test]
    fn self_transitions_are_invalid() {
        for status in NominationStatus::ALL {
            assert!(find_transition(status, status).is_err());
        }
    }

    #[test]
    fn finalized_is_terminal() {
        for to in NominationStatus::ALL {
            assert!(find_transition(NominationStatus::Finalized, to).is_err());
        }
    }

    #[test]
    fn only_nominator_submits_a_draft() {
        let nominator = Uuid::new_v4();
        let n = nomination(NominationStatus::Draft, nominator);
        let owner = Actor::new(nominator, UserRole::Manager);
        let hr = Actor::new(Uuid::new_v4(), UserRole::Hr);

        assert!(plan_transition(&n, NominationStatus::Submitted, &owner).is_ok());
        assert!(matches!(
            plan_transition(&n, NominationStatus::Submitted, &hr),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn only_hr_moves_reviews_forward() {
        let nominator = Uuid::new_v4();
        let owner = Actor::new(nominator, UserRole::Manager);
        let hr = Actor::new(Uuid::new_v4(), UserRole::Hr);
        let steps = [
            (NominationStatus::Submitted, NominationStatus::HrReview),
            (NominationStatus::HrReview, NominationStatus::PanelReview),
            (NominationStatus::PanelReview, NominationStatus::Finalized),
        ];
        for (from, to) in steps {
            let n = nomination(from, nominator);
            assert!(plan_transition(&n, to, &hr).is_ok());
            assert!(matches!(
                plan_transition(&n, to, &owner),
                Err(AppError::Forbidden(_))
            ));
        }
    }

    #[test]
    fn invalid_transition_wins_over_forbidden() {
        let n = nomination(NominationStatus::Submitted, Uuid::new_v4());
        let panel = Actor::new(Uuid::new_v4(), UserRole::Panel);
        assert!(matches!(
            plan_transition(&n, NominationStatus::Finalized, &panel),
            Err(AppError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn submission_stamps_submitted_at_and_later_moves_keep_it() {
        let nominator = Uuid::new_v4();
        let mut n = nomination(NominationStatus::Draft, nominator);
        let t1 = Utc::now();
        let submit = find_transition(NominationStatus::Draft, NominationStatus::Submitted).unwrap();
        let change = apply(&n, &submit, t1);
        assert_eq!(change.submitted_at, Some(t1));
        assert_eq!(change.updated_at, t1);

        n.status = change.status;
        n.submitted_at = change.submitted_at;
        let t2 = t1 + chrono::Duration::minutes(5);
        let review = find_transition(NominationStatus::Submitted, NominationStatus::HrReview).unwrap();
        let change = apply(&n, &review, t2);
        assert_eq!(change.submitted_at, Some(t1));
        assert_eq!(change.updated_at, t2);
        assert_eq!(change.status, NominationStatus::HrReview);
    }

    #[test]
    fn initial_status_follows_draft_flag() {
        assert_eq!(initial_status(true), NominationStatus::Draft);
        assert_eq!(initial_status(false), NominationStatus::Submitted);
    }
}
