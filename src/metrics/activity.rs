//! Activity metrics: calls, meetings, completed and overdue tasks per rep,
//! plus period-bucketed counts and a combined activity log for timelines.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::dates::{bucket_start, period_label, PeriodGrain};
use crate::normalize::Record;

/// Per-rep activity totals over one filtered window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RepActivity {
    pub rep: String,
    pub meetings: u32,
    pub calls: u32,
    pub completed_tasks: u32,
    pub overdue_tasks: u32,
}

/// Per-rep activity counts within one period bucket.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodActivity {
    pub rep: String,
    /// First day of the bucket.
    pub period: NaiveDate,
    pub label: String,
    pub meetings: u32,
    pub calls: u32,
    pub completed_tasks: u32,
    pub overdue_tasks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Call,
    Meeting,
    Task,
}

/// One row per activity, across tabs, for timeline views.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityLogEntry {
    pub activity_type: ActivityType,
    pub rep: Option<String>,
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
}

const COMPLETED_STATUSES: [&str; 3] = ["completed", "complete", "done"];

/// Whether a task record is completed, judged by its status string.
pub fn task_completed(task: &Record) -> bool {
    task.stage
        .as_deref()
        .map(|s| {
            let s = s.trim();
            COMPLETED_STATUSES.iter().any(|c| s.eq_ignore_ascii_case(c))
        })
        .unwrap_or(false)
}

/// Whether a task is overdue as of `today`. A task with no due date cannot
/// be overdue; it is excluded from the count rather than assumed late.
pub fn task_overdue(task: &Record, today: NaiveDate) -> bool {
    if task_completed(task) {
        return false;
    }
    match task.due_date {
        Some(due) => due < today,
        None => false,
    }
}

/// Count activities per rep over the whole window. Records without an owner
/// are skipped; the result is sorted by rep name.
pub fn count_activities(
    calls: &[Record],
    meetings: &[Record],
    tasks: &[Record],
    today: NaiveDate,
) -> Vec<RepActivity> {
    let mut by_rep: BTreeMap<String, RepActivity> = BTreeMap::new();

    let mut bump = |rep: &str, f: &dyn Fn(&mut RepActivity)| {
        let entry = by_rep.entry(rep.to_string()).or_insert_with(|| RepActivity {
            rep: rep.to_string(),
            ..Default::default()
        });
        f(entry);
    };

    for call in calls {
        if let Some(rep) = call.owner.as_deref() {
            bump(rep, &|a| a.calls += 1);
        }
    }
    for meeting in meetings {
        if let Some(rep) = meeting.owner.as_deref() {
            bump(rep, &|a| a.meetings += 1);
        }
    }
    for task in tasks {
        let Some(rep) = task.owner.as_deref() else {
            continue;
        };
        if task_completed(task) {
            bump(rep, &|a| a.completed_tasks += 1);
        } else if task_overdue(task, today) {
            bump(rep, &|a| a.overdue_tasks += 1);
        }
    }

    by_rep.into_values().collect()
}

/// Count activities per rep per period bucket. Records without a usable
/// date are left out of the trend (they still appear in the window totals
/// from [`count_activities`]).
pub fn count_activities_by_period(
    calls: &[Record],
    meetings: &[Record],
    tasks: &[Record],
    grain: PeriodGrain,
    today: NaiveDate,
) -> Vec<PeriodActivity> {
    let mut by_key: BTreeMap<(String, NaiveDate), PeriodActivity> = BTreeMap::new();

    let mut bump = |rep: &str, date: NaiveDate, f: &dyn Fn(&mut PeriodActivity)| {
        let period = bucket_start(date, grain);
        let entry = by_key
            .entry((rep.to_string(), period))
            .or_insert_with(|| PeriodActivity {
                rep: rep.to_string(),
                period,
                label: period_label(period, grain),
                meetings: 0,
                calls: 0,
                completed_tasks: 0,
                overdue_tasks: 0,
            });
        f(entry);
    };

    for call in calls {
        if let (Some(rep), Some(date)) = (call.owner.as_deref(), call.relevant_date()) {
            bump(rep, date, &|a| a.calls += 1);
        }
    }
    for meeting in meetings {
        if let (Some(rep), Some(date)) = (meeting.owner.as_deref(), meeting.relevant_date()) {
            bump(rep, date, &|a| a.meetings += 1);
        }
    }
    for task in tasks {
        let (Some(rep), Some(date)) = (task.owner.as_deref(), task.relevant_date()) else {
            continue;
        };
        if task_completed(task) {
            bump(rep, date, &|a| a.completed_tasks += 1);
        } else if task_overdue(task, today) {
            bump(rep, date, &|a| a.overdue_tasks += 1);
        }
    }

    by_key.into_values().collect()
}

/// Single combined activity log, one row per activity, in input order
/// within each tab.
pub fn combined_activity_log(
    calls: &[Record],
    meetings: &[Record],
    tasks: &[Record],
) -> Vec<ActivityLogEntry> {
    let entry = |record: &Record, activity_type: ActivityType| ActivityLogEntry {
        activity_type,
        rep: record.owner.clone(),
        name: record.name.clone(),
        date: record.relevant_date(),
    };

    calls
        .iter()
        .map(|r| entry(r, ActivityType::Call))
        .chain(meetings.iter().map(|r| entry(r, ActivityType::Meeting)))
        .chain(tasks.iter().map(|r| entry(r, ActivityType::Task)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TabKind;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn activity(tab: TabKind, rep: &str, date: Option<NaiveDate>) -> Record {
        let mut r = Record::new(tab);
        r.owner = Some(rep.to_string());
        r.activity_date = date;
        r
    }

    fn task(rep: &str, status: Option<&str>, due: Option<NaiveDate>) -> Record {
        let mut r = Record::new(TabKind::Tasks);
        r.owner = Some(rep.to_string());
        r.stage = status.map(|s| s.to_string());
        r.due_date = due;
        r
    }

    #[test]
    fn counts_split_by_rep() {
        let today = d(2025, 8, 20);
        let calls = vec![
            activity(TabKind::Calls, "Jake Lynch", Some(d(2025, 8, 1))),
            activity(TabKind::Calls, "Jake Lynch", Some(d(2025, 8, 2))),
            activity(TabKind::Calls, "Brad Sherman", Some(d(2025, 8, 3))),
        ];
        let meetings = vec![activity(TabKind::Meetings, "Jake Lynch", Some(d(2025, 8, 4)))];
        let counts = count_activities(&calls, &meetings, &[], today);

        assert_eq!(counts.len(), 2);
        let jake = counts.iter().find(|c| c.rep == "Jake Lynch").unwrap();
        assert_eq!(jake.calls, 2);
        assert_eq!(jake.meetings, 1);
    }

    #[test]
    fn completed_status_variants_all_count() {
        for status in ["Completed", "COMPLETE", "done"] {
            assert!(task_completed(&task("A", Some(status), None)));
        }
        assert!(!task_completed(&task("A", Some("Not started"), None)));
        assert!(!task_completed(&task("A", None, None)));
    }

    #[test]
    fn overdue_requires_a_due_date() {
        let today = d(2025, 8, 20);
        // Past due and open -> overdue
        assert!(task_overdue(
            &task("A", Some("Not started"), Some(d(2025, 8, 1))),
            today
        ));
        // Completed late -> not overdue
        assert!(!task_overdue(
            &task("A", Some("Completed"), Some(d(2025, 8, 1))),
            today
        ));
        // Open with no due date -> excluded, fail-safe
        assert!(!task_overdue(&task("A", Some("Not started"), None), today));
        // Due today is not yet overdue
        assert!(!task_overdue(&task("A", None, Some(today)), today));
    }

    #[test]
    fn completed_task_with_missing_due_date_still_counts_completed() {
        let today = d(2025, 8, 20);
        let tasks = vec![task("Jake Lynch", Some("Completed"), None)];
        let counts = count_activities(&[], &[], &tasks, today);
        assert_eq!(counts[0].completed_tasks, 1);
        assert_eq!(counts[0].overdue_tasks, 0);
    }

    #[test]
    fn period_counts_bucket_by_week() {
        let today = d(2025, 8, 20);
        let calls = vec![
            activity(TabKind::Calls, "Jake Lynch", Some(d(2025, 8, 11))),
            activity(TabKind::Calls, "Jake Lynch", Some(d(2025, 8, 15))),
            activity(TabKind::Calls, "Jake Lynch", Some(d(2025, 8, 18))),
            activity(TabKind::Calls, "Jake Lynch", None),
        ];
        let trend = count_activities_by_period(&calls, &[], &[], PeriodGrain::Week, today);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].period, d(2025, 8, 11));
        assert_eq!(trend[0].calls, 2);
        assert_eq!(trend[1].period, d(2025, 8, 18));
        assert_eq!(trend[1].calls, 1);
    }

    #[test]
    fn empty_input_yields_empty_counts() {
        let counts = count_activities(&[], &[], &[], d(2025, 1, 1));
        assert!(counts.is_empty());
        assert!(combined_activity_log(&[], &[], &[]).is_empty());
    }

    #[test]
    fn activity_log_covers_all_tabs() {
        let calls = vec![activity(TabKind::Calls, "A", Some(d(2025, 8, 1)))];
        let meetings = vec![activity(TabKind::Meetings, "B", Some(d(2025, 8, 2)))];
        let tasks = vec![task("C", Some("Completed"), None)];
        let log = combined_activity_log(&calls, &meetings, &tasks);
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].activity_type, ActivityType::Call);
        assert_eq!(log[2].activity_type, ActivityType::Task);
    }
}
