//! The collaborator boundary to the spreadsheet. The core only ever sees
//! `RawTable`s of header -> cell mappings; authentication, rate limits, and
//! network retries live behind whatever implements `TabSource`.

use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;

use crate::error::{AnalyticsError, Result};
use crate::table::{CellValue, RawRow, RawTable, TabKind};

/// Source of raw tab data for a single snapshot.
pub trait TabSource {
    /// Read one tab as an ordered sequence of raw rows. A tab the source
    /// does not carry comes back as an empty table, not an error.
    fn read_tab(&self, tab: TabKind) -> Result<RawTable>;

    /// Read every known tab.
    fn read_all_tabs(&self) -> Result<HashMap<TabKind, RawTable>> {
        let mut tabs = HashMap::new();
        for tab in TabKind::all() {
            tabs.insert(tab, self.read_tab(tab)?);
        }
        Ok(tabs)
    }
}

/// Reads a snapshot directory of CSV exports, one file per tab
/// (`Deals.csv`, `Meetings.csv`, ...). This is the runnable stand-in for
/// the hosted-spreadsheet fetch layer.
pub struct CsvDirSource {
    dir: PathBuf,
}

impl CsvDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TabSource for CsvDirSource {
    fn read_tab(&self, tab: TabKind) -> Result<RawTable> {
        let path = self.dir.join(format!("{}.csv", tab.tab_name()));
        if !path.exists() {
            info!(tab = %tab, "No CSV for tab in snapshot; treating as empty");
            return Ok(RawTable::default());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&path)?;
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut row = RawRow::new();
            for (i, header) in headers.iter().enumerate() {
                if header.is_empty() {
                    continue;
                }
                let raw = record.get(i).unwrap_or("");
                row.insert(header.clone(), CellValue::from_raw(raw));
            }
            rows.push(row);
        }

        info!(tab = %tab, rows = rows.len(), "Read snapshot tab");
        Ok(RawTable::new(rows))
    }
}

/// In-memory source for tests and fixtures.
#[derive(Default)]
pub struct InMemorySource {
    tabs: HashMap<TabKind, RawTable>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tab(mut self, tab: TabKind, table: RawTable) -> Self {
        self.tabs.insert(tab, table);
        self
    }
}

impl TabSource for InMemorySource {
    fn read_tab(&self, tab: TabKind) -> Result<RawTable> {
        Ok(self.tabs.get(&tab).cloned().unwrap_or_default())
    }
}

/// A source that refuses to read, for exercising collaborator failures.
pub struct FailingSource;

impl TabSource for FailingSource {
    fn read_tab(&self, tab: TabKind) -> Result<RawTable> {
        Err(AnalyticsError::MissingTab(tab.tab_name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn reads_csv_tab_preserving_row_order() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("Deals.csv"),
            "Deal Name,Amount\nAlpha,$100\nBeta,\n",
        )
        .unwrap();

        let source = CsvDirSource::new(dir.path());
        let table = source.read_tab(TabKind::Deals).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.rows[0].get("Deal Name"),
            Some(&CellValue::Text("Alpha".to_string()))
        );
        assert_eq!(table.rows[1].get("Amount"), Some(&CellValue::Missing));
    }

    #[test]
    fn missing_csv_is_an_empty_tab() {
        let dir = tempdir().unwrap();
        let source = CsvDirSource::new(dir.path());
        let table = source.read_tab(TabKind::Calls).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn failing_source_surfaces_the_error_unchanged() {
        let err = FailingSource.read_tab(TabKind::Deals).unwrap_err();
        assert!(matches!(err, AnalyticsError::MissingTab(_)));
    }

    #[test]
    fn in_memory_source_round_trips() {
        let table = RawTable::new(vec![RawRow::from([(
            "Call Title".to_string(),
            CellValue::Text("intro call".to_string()),
        )])]);
        let source = InMemorySource::new().with_tab(TabKind::Calls, table);
        assert_eq!(source.read_tab(TabKind::Calls).unwrap().len(), 1);
        assert!(source.read_tab(TabKind::Deals).unwrap().is_empty());
    }
}
