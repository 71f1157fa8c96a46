//! Column normalization: snake_case header conversion, alias mapping to
//! canonical fields, date/amount coercion.
//!
//! The alias table maps raw spreadsheet headers (after snake_casing) to the
//! canonical `Record` fields used throughout the crate. A malformed cell
//! nulls that one field and is counted in the `NormalizeReport`; it never
//! takes the rest of the row down with it.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

use crate::table::{CellValue, RawTable, TabKind};

/// Canonical field slots a raw column can map into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Name,
    Owner,
    Stage,
    Amount,
    Pipeline,
    Company,
    CreatedDate,
    CloseDate,
    ActivityDate,
    DueDate,
    CompletedAt,
    LastModifiedDate,
}

impl Field {
    fn is_date(&self) -> bool {
        matches!(
            self,
            Field::CreatedDate
                | Field::CloseDate
                | Field::ActivityDate
                | Field::DueDate
                | Field::CompletedAt
                | Field::LastModifiedDate
        )
    }
}

/// One canonical record, one source row. Every field except `tab` is
/// optional: a column that was absent or unparsable is simply `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub tab: TabKind,
    pub id: Option<String>,
    pub name: Option<String>,
    /// Rep name, resolved from whichever owner column the tab carries.
    pub owner: Option<String>,
    /// Deal stage for deals, status for tasks/tickets/calls.
    pub stage: Option<String>,
    /// Monetary amount; deals only.
    pub amount: Option<f64>,
    pub pipeline: Option<String>,
    pub company: Option<String>,
    pub created_date: Option<NaiveDate>,
    pub close_date: Option<NaiveDate>,
    pub activity_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub completed_at: Option<NaiveDate>,
    pub last_modified_date: Option<NaiveDate>,
}

impl Record {
    pub fn new(tab: TabKind) -> Self {
        Self {
            tab,
            id: None,
            name: None,
            owner: None,
            stage: None,
            amount: None,
            pipeline: None,
            company: None,
            created_date: None,
            close_date: None,
            activity_date: None,
            due_date: None,
            completed_at: None,
            last_modified_date: None,
        }
    }

    /// The date that places this record in time for range filtering and
    /// period bucketing: activity date for activities, close date (falling
    /// back to created) for deals and tickets.
    pub fn relevant_date(&self) -> Option<NaiveDate> {
        match self.tab {
            TabKind::Deals => self.close_date.or(self.created_date),
            _ => self.activity_date.or(self.created_date),
        }
    }
}

/// Diagnostics from one table's normalization pass. Nothing here is fatal;
/// the counts exist so the dashboard can surface data-quality drift.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizeReport {
    pub rows_in: usize,
    pub rows_out: usize,
    /// Raw headers that matched no alias, with occurrence counts.
    pub unmapped_columns: BTreeMap<String, usize>,
    /// Individual cells that failed date/amount coercion.
    pub coercion_failures: usize,
}

// Keys are the snake_case form of the raw spreadsheet header. Each tab names
// its owner column differently (Opp Owner, Activity assigned to, Full Name,
// Deal Owner); they all land in the Owner slot so downstream filtering only
// ever sees one name for the rep.
//
// Order matters: when one row carries two columns that land in the same
// slot (say Opp Owner and HubSpot Owner Name), the earlier entry wins,
// every run.
static COLUMN_ALIASES: &[(&str, Field)] = &[
    // Identifiers
    ("deal_id", Field::Id),
    ("call_id", Field::Id),
    ("ticket_id", Field::Id),
    ("task_id", Field::Id),
    ("meeting_id", Field::Id),
    // Display names
    ("deal_name", Field::Name),
    ("meeting_name", Field::Name),
    ("task_title", Field::Name),
    ("call_title", Field::Name),
    ("ticket_name", Field::Name),
    // Owner / rep, in candidate priority order
    ("hubspot_owner_name", Field::Owner),
    ("opp_owner", Field::Owner),
    ("activity_assigned_to", Field::Owner),
    ("full_name", Field::Owner),
    ("deal_owner", Field::Owner),
    // Stage / status
    ("deal_stage", Field::Stage),
    ("task_status", Field::Stage),
    ("ticket_status", Field::Stage),
    ("call_status", Field::Stage),
    // Money
    ("amount", Field::Amount),
    // Grouping
    ("pipeline", Field::Pipeline),
    ("associated_company_name", Field::Company),
    ("company_name", Field::Company),
    // Dates
    ("create_date", Field::CreatedDate),
    ("created_at", Field::CreatedDate),
    ("created_date", Field::CreatedDate),
    ("close_date", Field::CloseDate),
    ("activity_date", Field::ActivityDate),
    ("meeting_start_time", Field::ActivityDate),
    ("due_date", Field::DueDate),
    ("completed_at", Field::CompletedAt),
    ("last_modified_date", Field::LastModifiedDate),
    ("last_modified_at", Field::LastModifiedDate),
];

static ALIAS_LOOKUP: Lazy<HashMap<&'static str, Field>> =
    Lazy::new(|| COLUMN_ALIASES.iter().copied().collect());

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-\./()]+").unwrap());
static CAMEL_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());
static UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").unwrap());

/// Convert a raw header to snake_case: `"Close Date"` -> `"close_date"`,
/// `"HubSpot Owner"` -> `"hub_spot_owner"`.
pub fn to_snake_case(name: &str) -> String {
    let s = SEPARATORS.replace_all(name.trim(), "_");
    let s = CAMEL_BOUNDARY.replace_all(&s, "${1}_${2}");
    let s = UNDERSCORES.replace_all(&s, "_");
    s.to_lowercase().trim_matches('_').to_string()
}

/// Resolve a raw header to its canonical field, if it is one we keep.
pub fn resolve_column(raw_header: &str) -> Option<Field> {
    ALIAS_LOOKUP.get(to_snake_case(raw_header).as_str()).copied()
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M"];

/// Parse a date cell. Accepts bare dates and datetimes (time-of-day is
/// dropped); trailing `Z`/UTC offsets are tolerated.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim().trim_end_matches('Z');
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// Parse a monetary amount, stripping currency symbols, commas, and
/// whitespace. `"$1,200.50"` -> `1200.5`. Non-numeric input is `None`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

fn assign_text(record: &mut Record, field: Field, value: String) {
    let slot = match field {
        Field::Id => &mut record.id,
        Field::Name => &mut record.name,
        Field::Owner => &mut record.owner,
        Field::Stage => &mut record.stage,
        Field::Pipeline => &mut record.pipeline,
        Field::Company => &mut record.company,
        _ => return,
    };
    // Earlier alias wins; a lower-priority candidate column never clobbers it.
    if slot.is_none() {
        *slot = Some(value);
    }
}

fn assign_date(record: &mut Record, field: Field, value: NaiveDate) {
    let slot = match field {
        Field::CreatedDate => &mut record.created_date,
        Field::CloseDate => &mut record.close_date,
        Field::ActivityDate => &mut record.activity_date,
        Field::DueDate => &mut record.due_date,
        Field::CompletedAt => &mut record.completed_at,
        Field::LastModifiedDate => &mut record.last_modified_date,
        _ => return,
    };
    if slot.is_none() {
        *slot = Some(value);
    }
}

/// Normalize one raw table into canonical records. Output order equals input
/// row order; no sorting happens here.
pub fn normalize_table(table: &RawTable, tab: TabKind) -> (Vec<Record>, NormalizeReport) {
    let mut report = NormalizeReport {
        rows_in: table.len(),
        ..Default::default()
    };
    let mut records = Vec::with_capacity(table.len());

    for row in &table.rows {
        let mut record = Record::new(tab);

        // Index the row by snake_case header first; columns are then
        // consumed in alias-table order so two columns landing in the same
        // slot resolve the same way every run.
        let mut columns: Vec<(&String, &CellValue)> = row.iter().collect();
        columns.sort_by(|a, b| a.0.cmp(b.0));
        let mut by_snake: HashMap<String, (&String, &CellValue)> = HashMap::new();
        for (header, cell) in columns {
            let snake = to_snake_case(header);
            if !ALIAS_LOOKUP.contains_key(snake.as_str()) {
                *report.unmapped_columns.entry(header.clone()).or_insert(0) += 1;
                continue;
            }
            by_snake.entry(snake).or_insert((header, cell));
        }

        for (alias, field) in COLUMN_ALIASES {
            let Some((header, cell)) = by_snake.get(*alias) else {
                continue;
            };
            let field = *field;
            match cell {
                CellValue::Missing => {}
                CellValue::Date(d) if field.is_date() => assign_date(&mut record, field, *d),
                CellValue::Number(n) if field == Field::Amount => {
                    if record.amount.is_none() {
                        record.amount = Some(*n);
                    }
                }
                CellValue::Text(s) if field.is_date() => match parse_date(s) {
                    Some(d) => assign_date(&mut record, field, d),
                    None => {
                        report.coercion_failures += 1;
                        warn!(header = %header, value = %s, "Unparsable date; nulling field");
                    }
                },
                CellValue::Text(s) if field == Field::Amount => match parse_amount(s) {
                    Some(n) => {
                        if record.amount.is_none() {
                            record.amount = Some(n);
                        }
                    }
                    None => {
                        report.coercion_failures += 1;
                        warn!(header = %header, value = %s, "Unparsable amount; nulling field");
                    }
                },
                CellValue::Text(s) => assign_text(&mut record, field, (*s).clone()),
                // A numeric cell landing in a text slot (e.g. a numeric id)
                // is rendered rather than dropped.
                CellValue::Number(n) => assign_text(&mut record, field, format_number(*n)),
                CellValue::Date(_) => {
                    report.coercion_failures += 1;
                }
            }
        }
        records.push(record);
    }

    report.rows_out = records.len();
    debug!(
        tab = %tab,
        rows = report.rows_out,
        unmapped = report.unmapped_columns.len(),
        failures = report.coercion_failures,
        "Normalized table"
    );
    (records, report)
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Collapse duplicate meeting rows before anything counts them. Exports
/// sometimes carry the same meeting once per attendee; the first occurrence
/// wins. Identity is the meeting id when present, otherwise name + owner +
/// activity date.
pub fn deduplicate_meetings(meetings: Vec<Record>) -> Vec<Record> {
    let before = meetings.len();
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut seen_keys: HashSet<(Option<String>, Option<String>, Option<NaiveDate>)> =
        HashSet::new();

    let mut out = Vec::with_capacity(before);
    for meeting in meetings {
        let fresh = match &meeting.id {
            Some(id) => seen_ids.insert(id.clone()),
            None => seen_keys.insert((
                meeting.name.clone(),
                meeting.owner.clone(),
                meeting.activity_date,
            )),
        };
        if fresh {
            out.push(meeting);
        }
    }
    if out.len() < before {
        debug!(before, after = out.len(), "Deduplicated meetings");
    }
    out
}
