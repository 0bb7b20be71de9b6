#![warn(missing_docs)]
//! Core library entry points for the pppcalc service.
//!
//! The pipeline fetches PPP observations from the World Bank indicator API,
//! normalizes them down to one latest record per country, and persists that
//! snapshot for the income-conversion endpoint to read back.

pub mod calculator;
pub mod normalizer;
pub mod store;
pub mod worldbank;

pub use calculator::{adjust_income, CalculateError};
pub use normalizer::{
    deduplicate, latest_per_country, reduce_to_latest, NormalizeError, NormalizedEntry, PppRecord,
};
pub use store::{PppStore, SENTINEL_COUNTRY};
pub use worldbank::{
    parse_envelope, RawObservation, WorldBankClient, DEFAULT_FETCH_TIMEOUT_SECS,
    DEFAULT_INDICATOR_URL,
};
