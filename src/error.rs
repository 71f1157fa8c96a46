use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Snapshot tab not found: {0}")]
    MissingTab(String),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
