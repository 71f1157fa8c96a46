//! Full pipeline orchestration: load -> normalize -> filter -> metrics.
//! One sequential pass per invocation; every run rebuilds the record set
//! from the current snapshot.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use tracing::info;

use crate::classify::{apply_filters, DateField, FilterSet};
use crate::config::Vocab;
use crate::dates::PeriodGrain;
use crate::error::Result;
use crate::metrics::activity::{
    combined_activity_log, count_activities, count_activities_by_period, ActivityLogEntry,
    PeriodActivity, RepActivity,
};
use crate::metrics::pipeline::{
    active_pipeline_value, avg_days_in_stage, deal_count_by_stage, deals_closing_this_quarter,
    overall_win_rate, total_active_value, win_rate_by_pipeline_rep, win_rate_by_value,
    PipelineValue, StageAge, StageCount, WinRate,
};
use crate::metrics::scoring::{activity_scores, score_trend, PeriodScore, RepScore};
use crate::metrics::terminal::{
    avg_sales_cycle, closed_won_vs_lost_by_rep, overall_avg_cycle_days, terminal_breakdown,
    total_terminal_value, SalesCycle, TerminalBreakdown, WonLostByRep,
};
use crate::normalize::{deduplicate_meetings, normalize_table, NormalizeReport, Record};
use crate::source::TabSource;
use crate::table::TabKind;

/// Every computed result for one snapshot load. Derived, never persisted;
/// recomputed from source truth on each call to [`load_all`].
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSnapshot {
    // Filtered base tables
    pub deals: Vec<Record>,
    pub meetings: Vec<Record>,
    pub tasks: Vec<Record>,
    pub tickets: Vec<Record>,
    pub calls: Vec<Record>,

    /// Normalization diagnostics per tab.
    pub normalize_reports: HashMap<TabKind, NormalizeReport>,

    // Activity
    pub activity: Vec<RepActivity>,
    pub activity_trend: Vec<PeriodActivity>,
    pub activity_log: Vec<ActivityLogEntry>,

    // Scores
    pub rep_scores: Vec<RepScore>,
    pub rep_score_trend: Vec<PeriodScore>,

    // Pipeline
    pub active_pipeline_value: Vec<PipelineValue>,
    pub total_active_value: f64,
    pub deals_closing_this_quarter: Vec<Record>,
    pub deal_count_by_stage: Vec<StageCount>,
    pub avg_days_in_stage: Vec<StageAge>,
    pub win_rates: Vec<WinRate>,
    pub overall_win_rate: f64,
    pub win_rate_by_value: f64,

    // Terminal
    pub terminal_breakdown: Vec<TerminalBreakdown>,
    pub total_terminal_value: f64,
    pub closed_won_vs_lost: Vec<WonLostByRep>,
    pub sales_cycles: Vec<SalesCycle>,
    pub overall_avg_cycle_days: Option<f64>,
}

/// Run the whole pipeline against one snapshot.
///
/// `filters` scope every engine to the same window; `grain` selects the
/// bucket size for the trend series; `today` anchors overdue and
/// current-quarter calculations so the computation stays deterministic.
pub fn load_all(
    source: &dyn TabSource,
    vocab: &Vocab,
    filters: &FilterSet,
    grain: PeriodGrain,
    today: NaiveDate,
) -> Result<AnalyticsSnapshot> {
    info!("Reading snapshot tabs...");
    let raw = source.read_all_tabs()?;

    info!("Normalizing...");
    let mut normalized: HashMap<TabKind, Vec<Record>> = HashMap::new();
    let mut normalize_reports = HashMap::new();
    for (tab, table) in &raw {
        let (records, report) = normalize_table(table, *tab);
        info!(tab = %tab, rows_in = report.rows_in, failures = report.coercion_failures, "Normalized tab");
        normalized.insert(*tab, records);
        normalize_reports.insert(*tab, report);
    }

    let tab = |kind: TabKind| normalized.get(&kind).cloned().unwrap_or_default();

    info!("Deduplicating meetings...");
    let meetings = deduplicate_meetings(tab(TabKind::Meetings));

    info!("Filtering...");
    let deals = apply_filters(&tab(TabKind::Deals), filters, DateField::Close);
    let meetings = apply_filters(&meetings, filters, DateField::Activity);
    // The Tasks export has no activity-date column; ranges apply to the
    // created date, matching how tasks are bucketed in the trend series.
    let tasks = apply_filters(&tab(TabKind::Tasks), filters, DateField::Created);
    let calls = apply_filters(&tab(TabKind::Calls), filters, DateField::Activity);
    let tickets = apply_filters(&tab(TabKind::Tickets), filters, DateField::Created);

    info!(
        deals = deals.len(),
        meetings = meetings.len(),
        tasks = tasks.len(),
        calls = calls.len(),
        "Computing metrics"
    );
    let activity = count_activities(&calls, &meetings, &tasks, today);
    let activity_trend = count_activities_by_period(&calls, &meetings, &tasks, grain, today);
    let activity_log = combined_activity_log(&calls, &meetings, &tasks);
    let rep_scores = activity_scores(&activity);
    let rep_score_trend = score_trend(&activity_trend);

    let snapshot = AnalyticsSnapshot {
        activity,
        activity_trend,
        activity_log,
        rep_scores,
        rep_score_trend,
        active_pipeline_value: active_pipeline_value(&deals, vocab),
        total_active_value: total_active_value(&deals, vocab),
        deals_closing_this_quarter: deals_closing_this_quarter(&deals, vocab, today),
        deal_count_by_stage: deal_count_by_stage(&deals, vocab),
        avg_days_in_stage: avg_days_in_stage(&deals, today),
        win_rates: win_rate_by_pipeline_rep(&deals, vocab),
        overall_win_rate: overall_win_rate(&deals, vocab),
        win_rate_by_value: win_rate_by_value(&deals, vocab),
        terminal_breakdown: terminal_breakdown(&deals, vocab),
        total_terminal_value: total_terminal_value(&deals, vocab),
        closed_won_vs_lost: closed_won_vs_lost_by_rep(&deals, vocab),
        sales_cycles: avg_sales_cycle(&deals, vocab),
        overall_avg_cycle_days: overall_avg_cycle_days(&deals, vocab),
        deals,
        meetings,
        tasks,
        tickets,
        calls,
        normalize_reports,
    };
    info!("All metrics computed");
    Ok(snapshot)
}

impl AnalyticsSnapshot {
    /// Plain-text dashboard summary for the CLI.
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "📊 Sales Performance Summary");
        let _ = writeln!(
            out,
            "   Records: {} deals, {} meetings, {} calls, {} tasks",
            self.deals.len(),
            self.meetings.len(),
            self.calls.len(),
            self.tasks.len()
        );

        let _ = writeln!(out, "\n💰 Active pipeline value: ${:.2}", self.total_active_value);
        for pv in &self.active_pipeline_value {
            let _ = writeln!(
                out,
                "   {:<40} {:>3} deals  ${:>12.2}",
                pv.pipeline, pv.deal_count, pv.total_value
            );
        }

        let _ = writeln!(
            out,
            "\n🏁 Closed: ${:.2} across terminal stages (win rate {:.1}%, by value {:.1}%)",
            self.total_terminal_value,
            self.overall_win_rate * 100.0,
            self.win_rate_by_value * 100.0
        );
        for tb in &self.terminal_breakdown {
            let _ = writeln!(
                out,
                "   {:<25} {:>4}  ${:>12.2}",
                tb.status.label(),
                tb.count,
                tb.total_value
            );
        }

        if let Some(avg) = self.overall_avg_cycle_days {
            let _ = writeln!(out, "\n⏱️  Average sales cycle: {:.1} days", avg);
        }

        let _ = writeln!(out, "\n🏆 Rep activity scores");
        for score in &self.rep_scores {
            let _ = writeln!(
                out,
                "   {:<20} {:>5}  ({}m / {}c / {}t done / {}t overdue)",
                score.rep,
                score.score,
                score.meetings,
                score.calls,
                score.completed_tasks,
                score.overdue_tasks
            );
        }

        let unmapped: usize = self
            .normalize_reports
            .values()
            .map(|r| r.unmapped_columns.len())
            .sum();
        let failures: usize = self
            .normalize_reports
            .values()
            .map(|r| r.coercion_failures)
            .sum();
        if failures > 0 || unmapped > 0 {
            let _ = writeln!(
                out,
                "\n⚠️  Data quality: {} coercion failures, {} unmapped column(s)",
                failures, unmapped
            );
        }
        out
    }
}
