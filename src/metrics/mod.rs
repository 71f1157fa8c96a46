//! Pure aggregation engines over filtered record slices. Every function here
//! takes its inputs explicitly (records, vocab, `today`), keeps no state
//! between invocations, and returns an empty/zero result for empty input.

pub mod activity;
pub mod pipeline;
pub mod scoring;
pub mod terminal;
