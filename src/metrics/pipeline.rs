//! Pipeline metrics: active pipeline value, deal counts by stage, win rates,
//! deals closing this quarter, estimated days in stage.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::classify::{active_deals, is_terminal, terminal_status, TerminalStatus};
use crate::config::Vocab;
use crate::dates::current_quarter_range;
use crate::normalize::Record;

/// Open-deal value grouped by pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineValue {
    pub pipeline: String,
    pub deal_count: usize,
    pub total_value: f64,
    pub avg_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageCount {
    pub stage: String,
    pub count: usize,
    pub is_terminal: bool,
}

/// Closed-won vs closed-lost outcome for one pipeline x rep group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WinRate {
    pub pipeline: String,
    pub rep: String,
    pub closed_won: usize,
    pub closed_lost: usize,
    /// closed_won / (closed_won + closed_lost); 0 when the denominator is 0.
    pub win_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageAge {
    pub stage: String,
    pub avg_days: f64,
    pub deal_count: usize,
}

fn rate(won: f64, lost: f64) -> f64 {
    let denom = won + lost;
    if denom == 0.0 {
        0.0
    } else {
        won / denom
    }
}

/// Sum of deal amounts over non-terminal deals, grouped by pipeline. Deals
/// with no amount contribute zero; deals with no recognized pipeline are
/// excluded from the grouping.
pub fn active_pipeline_value(deals: &[Record], vocab: &Vocab) -> Vec<PipelineValue> {
    let mut by_pipeline: BTreeMap<String, (usize, f64)> = BTreeMap::new();
    for deal in active_deals(deals, vocab) {
        let Some(pipeline) = deal.pipeline.as_deref() else {
            continue;
        };
        let entry = by_pipeline.entry(pipeline.to_string()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += deal.amount.unwrap_or(0.0);
    }
    by_pipeline
        .into_iter()
        .map(|(pipeline, (deal_count, total_value))| PipelineValue {
            pipeline,
            deal_count,
            total_value,
            avg_value: if deal_count == 0 {
                0.0
            } else {
                total_value / deal_count as f64
            },
        })
        .collect()
}

/// Total open-deal value across every pipeline.
pub fn total_active_value(deals: &[Record], vocab: &Vocab) -> f64 {
    active_deals(deals, vocab)
        .iter()
        .map(|d| d.amount.unwrap_or(0.0))
        .sum()
}

/// Deal count in each stage, terminal stages included, sorted by count
/// descending then stage name.
pub fn deal_count_by_stage(deals: &[Record], vocab: &Vocab) -> Vec<StageCount> {
    let mut by_stage: BTreeMap<String, usize> = BTreeMap::new();
    for deal in deals {
        if let Some(stage) = deal.stage.as_deref() {
            *by_stage.entry(stage.to_string()).or_insert(0) += 1;
        }
    }
    let mut counts: Vec<StageCount> = by_stage
        .into_iter()
        .map(|(stage, count)| StageCount {
            is_terminal: terminal_status(&stage, vocab).is_some(),
            stage,
            count,
        })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then(a.stage.cmp(&b.stage)));
    counts
}

/// Win rate per pipeline x rep over closed-won and closed-lost deals only.
/// Groups missing either the pipeline or the owner are excluded.
pub fn win_rate_by_pipeline_rep(deals: &[Record], vocab: &Vocab) -> Vec<WinRate> {
    let mut by_group: BTreeMap<(String, String), (usize, usize)> = BTreeMap::new();
    for deal in deals {
        let Some(status) = deal.stage.as_deref().and_then(|s| terminal_status(s, vocab)) else {
            continue;
        };
        let (Some(pipeline), Some(rep)) = (deal.pipeline.as_deref(), deal.owner.as_deref())
        else {
            continue;
        };
        let entry = by_group
            .entry((pipeline.to_string(), rep.to_string()))
            .or_insert((0, 0));
        match status {
            TerminalStatus::ClosedWon => entry.0 += 1,
            TerminalStatus::ClosedLost => entry.1 += 1,
            _ => {}
        }
    }
    by_group
        .into_iter()
        .map(|((pipeline, rep), (won, lost))| WinRate {
            pipeline,
            rep,
            closed_won: won,
            closed_lost: lost,
            win_rate: rate(won as f64, lost as f64),
        })
        .collect()
}

/// Overall count-based win rate: closed-won / (closed-won + closed-lost).
pub fn overall_win_rate(deals: &[Record], vocab: &Vocab) -> f64 {
    let mut won = 0.0;
    let mut lost = 0.0;
    for deal in deals {
        match deal.stage.as_deref().and_then(|s| terminal_status(s, vocab)) {
            Some(TerminalStatus::ClosedWon) => won += 1.0,
            Some(TerminalStatus::ClosedLost) => lost += 1.0,
            _ => {}
        }
    }
    rate(won, lost)
}

/// Value-weighted win rate: won amount / (won + lost amount). The headline
/// figure when deal sizes vary widely.
pub fn win_rate_by_value(deals: &[Record], vocab: &Vocab) -> f64 {
    let mut won = 0.0;
    let mut lost = 0.0;
    for deal in deals {
        let amount = deal.amount.unwrap_or(0.0);
        match deal.stage.as_deref().and_then(|s| terminal_status(s, vocab)) {
            Some(TerminalStatus::ClosedWon) => won += amount,
            Some(TerminalStatus::ClosedLost) => lost += amount,
            _ => {}
        }
    }
    rate(won, lost)
}

/// Active deals whose close date falls in the calendar quarter containing
/// `today`.
pub fn deals_closing_this_quarter(
    deals: &[Record],
    vocab: &Vocab,
    today: NaiveDate,
) -> Vec<Record> {
    let (q_start, q_end) = current_quarter_range(today);
    deals
        .iter()
        .filter(|d| !is_terminal(d, vocab))
        .filter(|d| {
            d.close_date
                .map(|close| q_start <= close && close < q_end)
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Estimated average days deals have sat in their current stage, using the
/// last-modified date as a proxy (no stage-change history in the export),
/// falling back to the created date. Deals with neither are excluded.
pub fn avg_days_in_stage(deals: &[Record], today: NaiveDate) -> Vec<StageAge> {
    let mut by_stage: BTreeMap<String, (i64, usize)> = BTreeMap::new();
    for deal in deals {
        let Some(stage) = deal.stage.as_deref() else {
            continue;
        };
        let Some(reference) = deal.last_modified_date.or(deal.created_date) else {
            continue;
        };
        let days = (today - reference).num_days();
        let entry = by_stage.entry(stage.to_string()).or_insert((0, 0));
        entry.0 += days;
        entry.1 += 1;
    }
    let mut ages: Vec<StageAge> = by_stage
        .into_iter()
        .map(|(stage, (total_days, deal_count))| StageAge {
            stage,
            avg_days: total_days as f64 / deal_count as f64,
            deal_count,
        })
        .collect();
    ages.sort_by(|a, b| b.avg_days.total_cmp(&a.avg_days));
    ages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TabKind;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn deal(stage: &str, amount: Option<f64>, pipeline: &str) -> Record {
        let mut r = Record::new(TabKind::Deals);
        r.stage = Some(stage.to_string());
        r.amount = amount;
        r.pipeline = Some(pipeline.to_string());
        r.owner = Some("Jake Lynch".to_string());
        r
    }

    #[test]
    fn active_value_excludes_terminal_deals() {
        let vocab = Vocab::default();
        let deals = vec![
            deal("Negotiation", Some(2000.0), "Acquisition (New Customer)"),
            deal("Closed Won", Some(1000.0), "Acquisition (New Customer)"),
            deal("Closed Lost", Some(500.0), "Acquisition (New Customer)"),
        ];
        let values = active_pipeline_value(&deals, &vocab);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].deal_count, 1);
        assert_eq!(values[0].total_value, 2000.0);
        assert_eq!(values[0].avg_value, 2000.0);
    }

    #[test]
    fn active_value_is_total_minus_terminal() {
        let vocab = Vocab::default();
        let deals = vec![
            deal("Discovery", Some(750.0), "Calyx Distribution"),
            deal("Negotiation", Some(1250.0), "Calyx Distribution"),
            deal("Closed Won", Some(400.0), "Calyx Distribution"),
            deal("NCR", Some(100.0), "Calyx Distribution"),
        ];
        let total: f64 = deals.iter().filter_map(|d| d.amount).sum();
        let terminal: f64 = deals
            .iter()
            .filter(|d| is_terminal(d, &vocab))
            .filter_map(|d| d.amount)
            .sum();
        assert_eq!(total_active_value(&deals, &vocab), total - terminal);
    }

    #[test]
    fn win_rate_zero_when_no_terminal_deals() {
        let vocab = Vocab::default();
        let deals = vec![deal("Negotiation", Some(100.0), "Calyx Distribution")];
        assert_eq!(overall_win_rate(&deals, &vocab), 0.0);
        assert_eq!(overall_win_rate(&[], &vocab), 0.0);
        assert_eq!(win_rate_by_value(&[], &vocab), 0.0);
    }

    #[test]
    fn win_rate_stays_in_unit_interval() {
        let vocab = Vocab::default();
        let deals = vec![
            deal("Closed Won", Some(1000.0), "Calyx Distribution"),
            deal("Closed Won", Some(2000.0), "Calyx Distribution"),
            deal("Closed Lost", Some(500.0), "Calyx Distribution"),
        ];
        let r = overall_win_rate(&deals, &vocab);
        assert!((0.0..=1.0).contains(&r));
        assert!((r - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn value_weighted_win_rate_matches_amounts() {
        let vocab = Vocab::default();
        let deals = vec![
            deal("Closed Won", Some(1000.0), "Calyx Distribution"),
            deal("Closed Lost", Some(500.0), "Calyx Distribution"),
            deal("Negotiation", Some(2000.0), "Calyx Distribution"),
        ];
        let r = win_rate_by_value(&deals, &vocab);
        assert!((r - 1000.0 / 1500.0).abs() < 1e-9);
    }

    #[test]
    fn ncr_and_sales_order_do_not_move_the_win_rate() {
        let vocab = Vocab::default();
        let deals = vec![
            deal("Closed Won", Some(100.0), "Calyx Distribution"),
            deal("NCR", Some(100.0), "Calyx Distribution"),
            deal("Sales Order Created in NS", Some(100.0), "Calyx Distribution"),
        ];
        assert_eq!(overall_win_rate(&deals, &vocab), 1.0);
    }

    #[test]
    fn stage_counts_flag_terminal_stages() {
        let vocab = Vocab::default();
        let deals = vec![
            deal("Negotiation", None, "Calyx Distribution"),
            deal("Negotiation", None, "Calyx Distribution"),
            deal("Closed Won", None, "Calyx Distribution"),
        ];
        let counts = deal_count_by_stage(&deals, &vocab);
        assert_eq!(counts[0].stage, "Negotiation");
        assert_eq!(counts[0].count, 2);
        assert!(!counts[0].is_terminal);
        assert!(counts[1].is_terminal);
    }

    #[test]
    fn closing_this_quarter_requires_active_and_in_range() {
        let vocab = Vocab::default();
        let today = d(2025, 8, 20);
        let mut in_q = deal("Negotiation", Some(100.0), "Calyx Distribution");
        in_q.close_date = Some(d(2025, 9, 15));
        let mut next_q = deal("Negotiation", Some(100.0), "Calyx Distribution");
        next_q.close_date = Some(d(2025, 10, 1));
        let mut closed = deal("Closed Won", Some(100.0), "Calyx Distribution");
        closed.close_date = Some(d(2025, 9, 1));

        let closing = deals_closing_this_quarter(&[in_q, next_q, closed], &vocab, today);
        assert_eq!(closing.len(), 1);
        assert_eq!(closing[0].close_date, Some(d(2025, 9, 15)));
    }

    #[test]
    fn days_in_stage_prefers_last_modified() {
        let today = d(2025, 8, 20);
        let mut a = deal("Negotiation", None, "Calyx Distribution");
        a.last_modified_date = Some(d(2025, 8, 10));
        a.created_date = Some(d(2025, 1, 1));
        let mut b = deal("Negotiation", None, "Calyx Distribution");
        b.created_date = Some(d(2025, 8, 16));

        let ages = avg_days_in_stage(&[a, b], today);
        assert_eq!(ages.len(), 1);
        assert_eq!(ages[0].deal_count, 2);
        assert_eq!(ages[0].avg_days, (10.0 + 4.0) / 2.0);
    }

    #[test]
    fn empty_input_yields_empty_results() {
        let vocab = Vocab::default();
        assert!(active_pipeline_value(&[], &vocab).is_empty());
        assert!(deal_count_by_stage(&[], &vocab).is_empty());
        assert!(win_rate_by_pipeline_rep(&[], &vocab).is_empty());
        assert!(avg_days_in_stage(&[], d(2025, 1, 1)).is_empty());
    }
}
