use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::classify::TerminalStatus;
use crate::error::{AnalyticsError, Result};

/// The fixed business vocabularies the dashboard is scoped to: which reps,
/// which pipelines, and which deal stages count as terminal. Loaded once at
/// startup and passed explicitly into filtering and metric functions.
#[derive(Debug, Clone, Deserialize)]
pub struct Vocab {
    /// Reps in scope; records owned by anyone else are dropped from
    /// rep-scoped aggregation.
    pub reps: Vec<String>,
    /// Pipelines in scope.
    pub pipelines: Vec<String>,
    /// Stage names that close out a deal, and the outcome each represents.
    pub terminal_stages: BTreeMap<String, TerminalStatus>,
}

impl Default for Vocab {
    fn default() -> Self {
        Self {
            reps: vec![
                "Brad Sherman".to_string(),
                "Lance Mitton".to_string(),
                "Dave Borkowski".to_string(),
                "Jake Lynch".to_string(),
                "Alex Gonzalez".to_string(),
                "Owen Labombard".to_string(),
            ],
            pipelines: vec![
                "Growth Pipeline (Upsell/Cross-sell)".to_string(),
                "Acquisition (New Customer)".to_string(),
                "Retention (Existing Product)".to_string(),
                "Calyx Distribution".to_string(),
            ],
            terminal_stages: BTreeMap::from([
                ("Closed Won".to_string(), TerminalStatus::ClosedWon),
                ("Closed Lost".to_string(), TerminalStatus::ClosedLost),
                ("NCR".to_string(), TerminalStatus::Ncr),
                (
                    "Sales Order Created in NS".to_string(),
                    TerminalStatus::SalesOrderCreated,
                ),
            ]),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    vocab: Vocab,
}

impl Vocab {
    /// Load the vocabularies from a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AnalyticsError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: ConfigFile = toml::from_str(&content)?;
        config.vocab.validate()?;
        Ok(config.vocab)
    }

    /// Load from a config file if present, otherwise fall back to the
    /// compiled-in vocabularies.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if self.reps.is_empty() {
            return Err(AnalyticsError::Config("vocab.reps must not be empty".to_string()));
        }
        if self.pipelines.is_empty() {
            return Err(AnalyticsError::Config(
                "vocab.pipelines must not be empty".to_string(),
            ));
        }
        if self.terminal_stages.is_empty() {
            return Err(AnalyticsError::Config(
                "vocab.terminal_stages must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
