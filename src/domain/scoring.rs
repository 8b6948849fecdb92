use crate::domain::models::{Nomination, NominationStatus};
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use uuid::Uuid;

pub const MIN_SCORE: i32 = 1;
pub const MAX_SCORE: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreSummary {
    /// `None` when nobody has reviewed yet.
    pub average: Option<f64>,
    pub count: usize,
}

pub fn summarize(scores: &[i32]) -> ScoreSummary {
    let count = scores.len();
    let average = if count == 0 {
        None
    } else {
        let total: i64 = scores.iter().map(|s| i64::from(*s)).sum();
        Some(total as f64 / count as f64)
    };
    ScoreSummary { average, count }
}

pub fn validate_score(score: i32) -> AppResult<()> {
    if (MIN_SCORE..=MAX_SCORE).contains(&score) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "score must be between {MIN_SCORE} and {MAX_SCORE}"
        )))
    }
}

pub fn ensure_reviewable(nomination: &Nomination) -> AppResult<()> {
    if nomination.status == NominationStatus::PanelReview {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "nomination is {}, reviews are accepted only in PANEL_REVIEW",
            nomination.status
        )))
    }
}

/// Statuses shown on the cycle ranking view.
pub const RANKED_STATUSES: [NominationStatus; 3] = [
    NominationStatus::HrReview,
    NominationStatus::PanelReview,
    NominationStatus::Finalized,
];

#[derive(Debug, Clone, Serialize)]
pub struct RankedNomination {
    pub nomination_id: Uuid,
    pub nominee_id: Uuid,
    pub status: NominationStatus,
    pub average_score: Option<f64>,
    pub review_count: usize,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl RankedNomination {
    pub fn new(nomination: &Nomination, scores: &[i32]) -> Self {
        let summary = summarize(scores);
        Self {
            nomination_id: nomination.id,
            nominee_id: nomination.nominee_id,
            status: nomination.status,
            average_score: summary.average,
            review_count: summary.count,
            submitted_at: nomination.submitted_at,
        }
    }
}

fn some_first<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Highest average first, unreviewed nominations last, ties by earliest submission.
pub fn rank(mut entries: Vec<RankedNomination>) -> Vec<RankedNomination> {
    entries.sort_by(|a, b| {
        let by_score = match (a.average_score, b.average_score) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_score.then_with(|| some_first(a.submitted_at, b.submitted_at))
    });
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::tests::nomination;

    #[test]
    fn mean_of_three_and_five_is_four() {
        let summary = summarize(&[3, 5]);
        assert_eq!(summary.average, Some(4.0));
        assert_eq!(summary.count, 2);
    }

    #[test]
    fn no_reviews_means_no_average() {
        let summary = summarize(&[]);
        assert_eq!(summary.average, None);
        assert_eq!(summary.count, 0);
    }

    #[test]
    fn scores_outside_one_to_five_are_rejected() {
        assert!(validate_score(0).is_err());
        assert!(validate_score(6).is_err());
        for s in 1..=5 {
            assert!(validate_score(s).is_ok());
        }
    }

    #[test]
    fn reviews_only_during_panel_review() {
        for status in NominationStatus::ALL {
            let n = nomination(status, Uuid::new_v4());
            assert_eq!(
                ensure_reviewable(&n).is_ok(),
                status == NominationStatus::PanelReview
            );
        }
    }

    #[test]
    fn ranking_orders_by_average_then_submission() {
        let t0 = Utc::now();
        let mut early = nomination(NominationStatus::PanelReview, Uuid::new_v4());
        early.submitted_at = Some(t0);
        let mut late = nomination(NominationStatus::PanelReview, Uuid::new_v4());
        late.submitted_at = Some(t0 + chrono::Duration::hours(1));
        let mut best = nomination(NominationStatus::Finalized, Uuid::new_v4());
        best.submitted_at = Some(t0 + chrono::Duration::hours(2));
        let mut unreviewed = nomination(NominationStatus::HrReview, Uuid::new_v4());
        unreviewed.submitted_at = Some(t0 - chrono::Duration::hours(1));

        let ranked = rank(vec![
            RankedNomination::new(&unreviewed, &[]),
            RankedNomination::new(&late, &[4, 4]),
            RankedNomination::new(&best, &[5]),
            RankedNomination::new(&early, &[3, 5]),
        ]);

        let order: Vec<Uuid> = ranked.iter().map(|r| r.nomination_id).collect();
        assert_eq!(order, vec![best.id, early.id, late.id, unreviewed.id]);
        assert_eq!(ranked[3].average_score, None);
        assert_eq!(ranked[3].review_count, 0);
    }

    #[test]
    fn missing_submission_time_sorts_after_present_one_on_ties() {
        let mut stamped = nomination(NominationStatus::PanelReview, Uuid::new_v4());
        stamped.submitted_at = Some(Utc::now());
        let unstamped = nomination(NominationStatus::PanelReview, Uuid::new_v4());
        let ranked = rank(vec![
            RankedNomination::new(&unstamped, &[4]),
            RankedNomination::new(&stamped, &[4]),
        ]);
        assert_eq!(ranked[0].nomination_id, stamped.id);
    }
}
