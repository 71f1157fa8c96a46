//! Terminal deal metrics: per-outcome counts and sums, closed won vs lost
//! by rep, and sales cycle length statistics.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::classify::{terminal_deals, terminal_status, TerminalStatus};
use crate::config::Vocab;
use crate::dates::cycle_days;
use crate::normalize::Record;

/// Count and value sum for one terminal outcome. Every configured outcome
/// appears in the breakdown, zeros included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerminalBreakdown {
    pub status: TerminalStatus,
    pub count: usize,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WonLostByRep {
    pub rep: String,
    pub closed_won: usize,
    pub closed_lost: usize,
    pub net: i64,
}

/// Sales cycle statistics for one rep x pipeline group, over terminal deals
/// with both a created and a close date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesCycle {
    pub rep: String,
    pub pipeline: String,
    pub avg_days: f64,
    pub median_days: f64,
    pub deal_count: usize,
}

/// Counts and amount sums per terminal outcome.
pub fn terminal_breakdown(deals: &[Record], vocab: &Vocab) -> Vec<TerminalBreakdown> {
    let mut breakdown: Vec<TerminalBreakdown> = TerminalStatus::all()
        .into_iter()
        .map(|status| TerminalBreakdown {
            status,
            count: 0,
            total_value: 0.0,
        })
        .collect();

    for deal in deals {
        let Some(status) = deal.stage.as_deref().and_then(|s| terminal_status(s, vocab)) else {
            continue;
        };
        if let Some(entry) = breakdown.iter_mut().find(|b| b.status == status) {
            entry.count += 1;
            entry.total_value += deal.amount.unwrap_or(0.0);
        }
    }
    breakdown
}

/// Total amount across all terminal deals.
pub fn total_terminal_value(deals: &[Record], vocab: &Vocab) -> f64 {
    terminal_deals(deals, vocab)
        .iter()
        .map(|d| d.amount.unwrap_or(0.0))
        .sum()
}

/// Closed-won and closed-lost counts per rep, with the net. Only reps with
/// at least one won or lost deal appear.
pub fn closed_won_vs_lost_by_rep(deals: &[Record], vocab: &Vocab) -> Vec<WonLostByRep> {
    let mut by_rep: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for deal in deals {
        let Some(rep) = deal.owner.as_deref() else {
            continue;
        };
        match deal.stage.as_deref().and_then(|s| terminal_status(s, vocab)) {
            Some(TerminalStatus::ClosedWon) => by_rep.entry(rep.to_string()).or_insert((0, 0)).0 += 1,
            Some(TerminalStatus::ClosedLost) => by_rep.entry(rep.to_string()).or_insert((0, 0)).1 += 1,
            _ => {}
        }
    }
    by_rep
        .into_iter()
        .map(|(rep, (won, lost))| WonLostByRep {
            rep,
            closed_won: won,
            closed_lost: lost,
            net: won as i64 - lost as i64,
        })
        .collect()
}

fn median(sorted: &[i64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2] as f64
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0
    }
}

/// Average and median sales cycle (created -> closed, days) per rep x
/// pipeline. Deals missing either date, or with a close date before
/// creation, are excluded rather than counted as zero.
pub fn avg_sales_cycle(deals: &[Record], vocab: &Vocab) -> Vec<SalesCycle> {
    let mut by_group: BTreeMap<(String, String), Vec<i64>> = BTreeMap::new();
    for deal in terminal_deals(deals, vocab) {
        let (Some(rep), Some(pipeline)) = (deal.owner.as_deref(), deal.pipeline.as_deref())
        else {
            continue;
        };
        let Some(days) = cycle_days(deal.created_date, deal.close_date) else {
            continue;
        };
        if days < 0 {
            continue;
        }
        by_group
            .entry((rep.to_string(), pipeline.to_string()))
            .or_default()
            .push(days);
    }

    by_group
        .into_iter()
        .map(|((rep, pipeline), mut days)| {
            days.sort_unstable();
            let count = days.len();
            let avg = days.iter().sum::<i64>() as f64 / count as f64;
            SalesCycle {
                rep,
                pipeline,
                avg_days: avg,
                median_days: median(&days),
                deal_count: count,
            }
        })
        .collect()
}

/// Average cycle days across all terminal deals with both dates, ungrouped.
pub fn overall_avg_cycle_days(deals: &[Record], vocab: &Vocab) -> Option<f64> {
    let days: Vec<i64> = terminal_deals(deals, vocab)
        .iter()
        .filter_map(|d| cycle_days(d.created_date, d.close_date))
        .filter(|d| *d >= 0)
        .collect();
    if days.is_empty() {
        return None;
    }
    Some(days.iter().sum::<i64>() as f64 / days.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TabKind;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn closed_deal(
        stage: &str,
        amount: Option<f64>,
        created: Option<NaiveDate>,
        closed: Option<NaiveDate>,
    ) -> Record {
        let mut r = Record::new(TabKind::Deals);
        r.stage = Some(stage.to_string());
        r.amount = amount;
        r.created_date = created;
        r.close_date = closed;
        r.owner = Some("Dave Borkowski".to_string());
        r.pipeline = Some("Retention (Existing Product)".to_string());
        r
    }

    #[test]
    fn breakdown_lists_every_outcome_with_zeros() {
        let vocab = Vocab::default();
        let breakdown = terminal_breakdown(&[], &vocab);
        assert_eq!(breakdown.len(), 4);
        assert!(breakdown.iter().all(|b| b.count == 0 && b.total_value == 0.0));
    }

    #[test]
    fn breakdown_sums_amounts_per_outcome() {
        let vocab = Vocab::default();
        let deals = vec![
            closed_deal("Closed Won", Some(1000.0), None, None),
            closed_deal("Closed Lost", Some(500.0), None, None),
            closed_deal("Negotiation", Some(2000.0), None, None),
        ];
        let breakdown = terminal_breakdown(&deals, &vocab);
        let won = breakdown
            .iter()
            .find(|b| b.status == TerminalStatus::ClosedWon)
            .unwrap();
        assert_eq!(won.count, 1);
        assert_eq!(won.total_value, 1000.0);
        assert_eq!(total_terminal_value(&deals, &vocab), 1500.0);
    }

    #[test]
    fn won_vs_lost_nets_out_per_rep() {
        let vocab = Vocab::default();
        let deals = vec![
            closed_deal("Closed Won", None, None, None),
            closed_deal("Closed Won", None, None, None),
            closed_deal("Closed Lost", None, None, None),
        ];
        let rows = closed_won_vs_lost_by_rep(&deals, &vocab);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].closed_won, 2);
        assert_eq!(rows[0].closed_lost, 1);
        assert_eq!(rows[0].net, 1);
    }

    #[test]
    fn cycle_excludes_deals_missing_either_date() {
        let vocab = Vocab::default();
        let deals = vec![
            closed_deal("Closed Won", None, Some(d(2025, 1, 1)), Some(d(2025, 1, 31))),
            closed_deal("Closed Won", None, Some(d(2025, 2, 1)), Some(d(2025, 2, 11))),
            closed_deal("Closed Won", None, None, Some(d(2025, 3, 1))),
            closed_deal("Closed Lost", None, Some(d(2025, 3, 1)), None),
        ];
        let cycles = avg_sales_cycle(&deals, &vocab);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].deal_count, 2);
        assert_eq!(cycles[0].avg_days, 20.0);
        assert_eq!(cycles[0].median_days, 20.0);
    }

    #[test]
    fn negative_cycles_are_dropped() {
        let vocab = Vocab::default();
        let deals = vec![closed_deal(
            "Closed Won",
            None,
            Some(d(2025, 5, 1)),
            Some(d(2025, 4, 1)),
        )];
        assert!(avg_sales_cycle(&deals, &vocab).is_empty());
        assert_eq!(overall_avg_cycle_days(&deals, &vocab), None);
    }

    #[test]
    fn median_handles_even_and_odd_counts() {
        assert_eq!(median(&[10]), 10.0);
        assert_eq!(median(&[10, 20]), 15.0);
        assert_eq!(median(&[10, 20, 40]), 20.0);
        assert_eq!(median(&[]), 0.0);
    }
}
