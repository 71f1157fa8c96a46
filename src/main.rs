use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use crm_analytics::classify::{DateRange, FilterSet};
use crm_analytics::config::Vocab;
use crm_analytics::dates::PeriodGrain;
use crm_analytics::logging;
use crm_analytics::report::load_all;
use crm_analytics::source::CsvDirSource;
use crm_analytics::table::TabKind;

#[derive(Parser)]
#[command(name = "crm-analytics")]
#[command(about = "Sales performance analytics over CRM spreadsheet exports")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the vocabulary config (reps, pipelines, terminal stages)
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute all metrics from a snapshot and print the dashboard summary
    Report {
        /// Directory holding one CSV per tab (Deals.csv, Meetings.csv, ...)
        #[arg(long)]
        snapshot_dir: PathBuf,
        /// Restrict to specific reps (comma-separated); default is the configured six
        #[arg(long)]
        reps: Option<String>,
        /// Restrict to specific pipelines (comma-separated); default is the configured four
        #[arg(long)]
        pipelines: Option<String>,
        /// Start of the inclusive date range (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// End of the inclusive date range (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Trend bucket size
        #[arg(long, default_value = "week")]
        grain: String,
        /// Emit the full result set as JSON instead of the text summary
        #[arg(long)]
        json: bool,
    },
    /// Read a snapshot and report row counts and data-quality diagnostics
    Check {
        /// Directory holding one CSV per tab
        #[arg(long)]
        snapshot_dir: PathBuf,
    },
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_grain(raw: &str) -> anyhow::Result<PeriodGrain> {
    match raw.to_lowercase().as_str() {
        "day" => Ok(PeriodGrain::Day),
        "week" => Ok(PeriodGrain::Week),
        "month" => Ok(PeriodGrain::Month),
        "quarter" => Ok(PeriodGrain::Quarter),
        other => anyhow::bail!("unknown grain '{}'; expected day, week, month, or quarter", other),
    }
}

fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let cli = Cli::parse();
    let vocab = Vocab::load_or_default(&cli.config)?;
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Report {
            snapshot_dir,
            reps,
            pipelines,
            from,
            to,
            grain,
            json,
        } => {
            let grain = parse_grain(&grain)?;
            let mut filters = FilterSet::scoped_to(&vocab);
            if let Some(reps) = reps {
                filters.reps = Some(split_list(&reps));
            }
            if let Some(pipelines) = pipelines {
                filters.pipelines = Some(split_list(&pipelines));
            }
            if let (Some(from), Some(to)) = (from, to) {
                if to < from {
                    anyhow::bail!("--to must not be before --from");
                }
                filters.date_range = Some(DateRange { from, to });
            }

            info!(dir = %snapshot_dir.display(), "Loading snapshot");
            let source = CsvDirSource::new(snapshot_dir);
            let snapshot = load_all(&source, &vocab, &filters, grain, today)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print!("{}", snapshot.render_summary());
            }
        }
        Commands::Check { snapshot_dir } => {
            println!("🔎 Checking snapshot {}...", snapshot_dir.display());
            let source = CsvDirSource::new(snapshot_dir);
            let snapshot = load_all(
                &source,
                &vocab,
                &FilterSet::default(),
                PeriodGrain::Week,
                today,
            )?;
            for tab in TabKind::all() {
                if let Some(report) = snapshot.normalize_reports.get(&tab) {
                    println!(
                        "   {:<10} {:>5} rows, {:>3} coercion failures, {:>3} unmapped columns",
                        tab.tab_name(),
                        report.rows_in,
                        report.coercion_failures,
                        report.unmapped_columns.len()
                    );
                    for (column, count) in &report.unmapped_columns {
                        println!("      ignored column '{}' ({} cells)", column, count);
                    }
                }
            }
        }
    }
    Ok(())
}
