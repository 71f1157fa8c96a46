//! Composite activity score per rep.
//!
//! Formula: meetings x 5 + calls x 3 + completed_tasks x 2 - overdue_tasks x 2.

use chrono::NaiveDate;
use serde::Serialize;

use crate::metrics::activity::{PeriodActivity, RepActivity};

pub const MEETING_WEIGHT: i64 = 5;
pub const CALL_WEIGHT: i64 = 3;
pub const COMPLETED_TASK_WEIGHT: i64 = 2;
pub const OVERDUE_TASK_WEIGHT: i64 = -2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepScore {
    pub rep: String,
    pub meetings: u32,
    pub calls: u32,
    pub completed_tasks: u32,
    pub overdue_tasks: u32,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodScore {
    pub rep: String,
    pub period: NaiveDate,
    pub label: String,
    pub score: i64,
}

fn weighted(meetings: u32, calls: u32, completed: u32, overdue: u32) -> i64 {
    meetings as i64 * MEETING_WEIGHT
        + calls as i64 * CALL_WEIGHT
        + completed as i64 * COMPLETED_TASK_WEIGHT
        + overdue as i64 * OVERDUE_TASK_WEIGHT
}

/// Score each rep from the same filtered window the activity counts came
/// from, sorted best-first.
pub fn activity_scores(counts: &[RepActivity]) -> Vec<RepScore> {
    let mut scores: Vec<RepScore> = counts
        .iter()
        .map(|c| RepScore {
            rep: c.rep.clone(),
            meetings: c.meetings,
            calls: c.calls,
            completed_tasks: c.completed_tasks,
            overdue_tasks: c.overdue_tasks,
            score: weighted(c.meetings, c.calls, c.completed_tasks, c.overdue_tasks),
        })
        .collect();
    scores.sort_by(|a, b| b.score.cmp(&a.score).then(a.rep.cmp(&b.rep)));
    scores
}

/// Score per rep per period, for trend charts.
pub fn score_trend(counts: &[PeriodActivity]) -> Vec<PeriodScore> {
    counts
        .iter()
        .map(|c| PeriodScore {
            rep: c.rep.clone(),
            period: c.period,
            label: c.label.clone(),
            score: weighted(c.meetings, c.calls, c.completed_tasks, c.overdue_tasks),
        })
        .collect()
}
