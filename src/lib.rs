//! FXLens - curated-query analytics for EUR/USD forex data.
//!
//! Questions are matched against a store of vetted SQL queries. Matches run
//! against the `forex_bars` table; anything unmatched is logged to a CSV file
//! for review, and can optionally be handed to the Atlas LLM first.

pub mod app;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod output;
pub mod persistence;
pub mod registry;
pub mod safety;
pub mod tui;
