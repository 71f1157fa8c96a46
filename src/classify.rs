//! Business-rule classification: terminal-stage tagging and rep / pipeline /
//! date-range filtering over normalized records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Vocab;
use crate::normalize::Record;
use crate::table::TabKind;

/// The closed-out outcomes a deal stage can map to. Terminal-ness is a pure
/// function of the stage name, independent of pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    ClosedWon,
    ClosedLost,
    Ncr,
    SalesOrderCreated,
}

impl TerminalStatus {
    pub fn all() -> [TerminalStatus; 4] {
        [
            TerminalStatus::ClosedWon,
            TerminalStatus::ClosedLost,
            TerminalStatus::Ncr,
            TerminalStatus::SalesOrderCreated,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            TerminalStatus::ClosedWon => "Closed Won",
            TerminalStatus::ClosedLost => "Closed Lost",
            TerminalStatus::Ncr => "NCR",
            TerminalStatus::SalesOrderCreated => "Sales Order Created",
        }
    }
}

fn stage_eq(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Map a stage name to its terminal status, if it is one of the four
/// configured terminal stages. Matching trims whitespace and ignores case,
/// so `"closed won"`, `"Closed Won "`, and `"CLOSED WON"` classify alike.
pub fn terminal_status(stage: &str, vocab: &Vocab) -> Option<TerminalStatus> {
    vocab
        .terminal_stages
        .iter()
        .find(|(name, _)| stage_eq(name, stage))
        .map(|(_, status)| *status)
}

/// Whether a deal's stage closes it out.
pub fn is_terminal(record: &Record, vocab: &Vocab) -> bool {
    record
        .stage
        .as_deref()
        .and_then(|s| terminal_status(s, vocab))
        .is_some()
}

/// Whether a terminal deal counts as a win (Closed Won or a sales order
/// cut straight to the ERP).
pub fn is_won(record: &Record, vocab: &Vocab) -> bool {
    record
        .stage
        .as_deref()
        .and_then(|s| terminal_status(s, vocab))
        .map(|status| {
            matches!(
                status,
                TerminalStatus::ClosedWon | TerminalStatus::SalesOrderCreated
            )
        })
        .unwrap_or(false)
}

/// Which record date the range filter applies to; the caller picks one per
/// tab kind (activity date for activities, close/created for deals).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Activity,
    Close,
    Created,
}

impl DateField {
    fn of(&self, record: &Record) -> Option<NaiveDate> {
        match self {
            DateField::Activity => record.activity_date,
            DateField::Close => record.close_date,
            DateField::Created => record.created_date,
        }
    }
}

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// The active filter selections a caller passes in. An absent filter keeps
/// everything, so unfiltered totals can still include out-of-scope owners.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    pub reps: Option<Vec<String>>,
    pub pipelines: Option<Vec<String>>,
    pub date_range: Option<DateRange>,
}

impl FilterSet {
    /// Scope to the configured vocabularies: the six reps and four pipelines.
    pub fn scoped_to(vocab: &Vocab) -> Self {
        Self {
            reps: Some(vocab.reps.clone()),
            pipelines: Some(vocab.pipelines.clone()),
            date_range: None,
        }
    }
}

fn rep_matches(record: &Record, reps: &[String]) -> bool {
    record
        .owner
        .as_deref()
        .map(|owner| reps.iter().any(|r| r.trim().eq_ignore_ascii_case(owner.trim())))
        .unwrap_or(false)
}

fn pipeline_matches(record: &Record, pipelines: &[String]) -> bool {
    record
        .pipeline
        .as_deref()
        .map(|p| pipelines.iter().any(|cfg| stage_eq(cfg, p)))
        .unwrap_or(false)
}

/// Keep only rows belonging to in-scope reps.
pub fn filter_by_rep(records: &[Record], reps: &[String]) -> Vec<Record> {
    let out: Vec<Record> = records
        .iter()
        .filter(|r| rep_matches(r, reps))
        .cloned()
        .collect();
    debug!(before = records.len(), after = out.len(), "Rep filter");
    out
}

/// Keep only rows in in-scope pipelines.
pub fn filter_by_pipeline(records: &[Record], pipelines: &[String]) -> Vec<Record> {
    let out: Vec<Record> = records
        .iter()
        .filter(|r| pipeline_matches(r, pipelines))
        .cloned()
        .collect();
    debug!(before = records.len(), after = out.len(), "Pipeline filter");
    out
}

/// Apply the full filter selection. Rep and date filters apply to every tab.
/// The pipeline filter applies to deals only (activities carry no pipeline
/// column); a deal whose pipeline is blank or unrecognized is excluded.
pub fn apply_filters(
    records: &[Record],
    filters: &FilterSet,
    date_field: DateField,
) -> Vec<Record> {
    let out: Vec<Record> = records
        .iter()
        .filter(|r| {
            if let Some(reps) = &filters.reps {
                if !rep_matches(r, reps) {
                    return false;
                }
            }
            if let Some(pipelines) = &filters.pipelines {
                if r.tab == TabKind::Deals && !pipeline_matches(r, pipelines) {
                    return false;
                }
            }
            if let Some(range) = &filters.date_range {
                match date_field.of(r) {
                    Some(d) if range.contains(d) => {}
                    _ => return false,
                }
            }
            true
        })
        .cloned()
        .collect();
    debug!(before = records.len(), after = out.len(), "Applied filters");
    out
}

/// Deals still in play.
pub fn active_deals<'a>(deals: &'a [Record], vocab: &Vocab) -> Vec<&'a Record> {
    deals.iter().filter(|d| !is_terminal(d, vocab)).collect()
}

/// Deals in a terminal stage.
pub fn terminal_deals<'a>(deals: &'a [Record], vocab: &Vocab) -> Vec<&'a Record> {
    deals.iter().filter(|d| is_terminal(d, vocab)).collect()
}
