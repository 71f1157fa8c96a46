use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A raw spreadsheet cell as handed over by the fetch layer. Cells arrive
/// loosely typed (text, number, or blank); this tagged union is the only
/// place that shape exists — normalization converts it into typed `Record`
/// fields and nothing downstream branches on it again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Missing,
}

impl CellValue {
    /// Text content, if this cell carries any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// Build a cell from a raw string, folding blanks and spreadsheet null
    /// markers into `Missing`.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("nan")
            || trimmed.eq_ignore_ascii_case("none")
            || trimmed.eq_ignore_ascii_case("null")
        {
            CellValue::Missing
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }
}

/// One raw row: spreadsheet column header -> cell value.
pub type RawRow = HashMap<String, CellValue>;

/// An ordered raw table for one tab, exactly as fetched.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// The source tabs we know how to normalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TabKind {
    Deals,
    Meetings,
    Tasks,
    Tickets,
    Calls,
}

impl TabKind {
    pub fn all() -> [TabKind; 5] {
        [
            TabKind::Deals,
            TabKind::Meetings,
            TabKind::Tasks,
            TabKind::Tickets,
            TabKind::Calls,
        ]
    }

    /// The spreadsheet tab name (also the CSV file stem in a snapshot dir).
    pub fn tab_name(&self) -> &'static str {
        match self {
            TabKind::Deals => "Deals",
            TabKind::Meetings => "Meetings",
            TabKind::Tasks => "Tasks",
            TabKind::Tickets => "Tickets",
            TabKind::Calls => "Calls",
        }
    }

    pub fn is_activity(&self) -> bool {
        matches!(self, TabKind::Meetings | TabKind::Tasks | TabKind::Calls)
    }
}

impl std::fmt::Display for TabKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tab_name())
    }
}
