pub mod classify;
pub mod config;
pub mod dates;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod normalize;
pub mod report;
pub mod source;
pub mod table;
