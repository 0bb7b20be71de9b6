//! PPP observation normalization: key deduplication plus latest-per-country
//! reduction.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::worldbank::RawObservation;

/// One unique (country, year) observation carrying a non-null value.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEntry {
    /// ISO3 country identifier.
    pub country_code: String,
    /// Human-readable country name.
    pub country_name: String,
    /// Calendar year parsed from the raw date string.
    pub year: i32,
    /// PPP index value.
    pub value: f64,
}

impl NormalizedEntry {
    fn into_record(self) -> PppRecord {
        PppRecord {
            country_code: self.country_code,
            country_name: self.country_name,
            year: self.year,
            value: self.value,
        }
    }
}

/// The most recent observation retained per country; the durable unit
/// written to and read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PppRecord {
    /// ISO3 country identifier.
    pub country_code: String,
    /// Human-readable country name.
    pub country_name: String,
    /// Calendar year of the retained observation.
    pub year: i32,
    /// PPP index value.
    pub value: f64,
}

/// Errors surfaced while normalizing raw observations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// A record carried a date that does not parse as a calendar year.
    InvalidYear {
        /// Country the malformed record belongs to.
        country_code: String,
        /// The raw date string as delivered.
        date: String,
    },
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidYear { country_code, date } => {
                write!(f, "observation for {country_code} has non-year date {date:?}")
            }
        }
    }
}

impl std::error::Error for NormalizeError {}

/// Collapses raw observations into the unique-entries working set.
///
/// Records with a null value are skipped. The remaining records are keyed by
/// `(country_code, country_name, year)`; the first occurrence of a key wins
/// and later duplicates are ignored. Output preserves first-occurrence input
/// order.
pub fn deduplicate(raw: &[RawObservation]) -> Result<Vec<NormalizedEntry>, NormalizeError> {
    let mut seen: HashSet<(String, String, i32)> = HashSet::new();
    let mut entries = Vec::new();
    for record in raw {
        let Some(value) = record.value else {
            continue;
        };
        let year = parse_year(record)?;
        let key = (
            record.country_code.clone(),
            record.country.value.clone(),
            year,
        );
        if seen.insert(key) {
            entries.push(NormalizedEntry {
                country_code: record.country_code.clone(),
                country_name: record.country.value.clone(),
                year,
                value,
            });
        }
    }
    Ok(entries)
}

fn parse_year(record: &RawObservation) -> Result<i32, NormalizeError> {
    record
        .date
        .trim()
        .parse()
        .map_err(|_| NormalizeError::InvalidYear {
            country_code: record.country_code.clone(),
            date: record.date.clone(),
        })
}

/// Reduces unique entries to exactly one record per country code.
///
/// The first entry seen for a country claims its slot; a later entry
/// replaces it only when its year is strictly greater. With the
/// order-preserving output of [`deduplicate`], a tie on the maximal year
/// therefore keeps the earliest-encountered record. Output is in first-seen
/// country order.
pub fn reduce_to_latest(entries: Vec<NormalizedEntry>) -> Vec<PppRecord> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut latest: Vec<PppRecord> = Vec::new();
    for entry in entries {
        match slots.get(&entry.country_code) {
            Some(&idx) => {
                if entry.year > latest[idx].year {
                    latest[idx] = entry.into_record();
                }
            }
            None => {
                slots.insert(entry.country_code.clone(), latest.len());
                latest.push(entry.into_record());
            }
        }
    }
    latest
}

/// Full normalization pipeline: raw observations in, one latest record per
/// country out.
pub fn latest_per_country(raw: &[RawObservation]) -> Result<Vec<PppRecord>, NormalizeError> {
    Ok(reduce_to_latest(deduplicate(raw)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worldbank::CountryRef;

    fn obs(code: &str, name: &str, date: &str, value: Option<f64>) -> RawObservation {
        RawObservation {
            country_code: code.to_string(),
            country: CountryRef {
                value: name.to_string(),
            },
            date: date.to_string(),
            value,
        }
    }

    #[test]
    fn duplicate_keys_keep_first_value() {
        let raw = vec![
            obs("USA", "United States", "2020", Some(1.0)),
            obs("USA", "United States", "2020", Some(9.9)),
        ];

        let entries = deduplicate(&raw).expect("deduplicate");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, 1.0);
    }

    #[test]
    fn null_values_never_enter_the_set() {
        let raw = vec![
            obs("IND", "India", "2019", None),
            obs("USA", "United States", "2020", Some(1.0)),
        ];

        let entries = deduplicate(&raw).expect("deduplicate");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].country_code, "USA");
    }

    #[test]
    fn deduplicate_is_order_preserving_and_repeatable() {
        let raw = vec![
            obs("FRA", "France", "2018", Some(1.2)),
            obs("USA", "United States", "2020", Some(1.0)),
            obs("FRA", "France", "2015", Some(1.0)),
        ];

        let first = deduplicate(&raw).expect("deduplicate");
        let second = deduplicate(&raw).expect("deduplicate");
        assert_eq!(first, second);
        let codes: Vec<&str> = first.iter().map(|e| e.country_code.as_str()).collect();
        assert_eq!(codes, ["FRA", "USA", "FRA"]);
    }

    #[test]
    fn non_year_date_is_an_error() {
        let raw = vec![obs("USA", "United States", "latest", Some(1.0))];
        let err = deduplicate(&raw).expect_err("invalid year rejected");
        assert_eq!(
            err,
            NormalizeError::InvalidYear {
                country_code: "USA".to_string(),
                date: "latest".to_string(),
            }
        );
    }

    #[test]
    fn null_value_skips_before_date_validation() {
        // A record filtered on its null value never reaches the year parser.
        let raw = vec![obs("USA", "United States", "not-a-year", None)];
        assert!(deduplicate(&raw).expect("deduplicate").is_empty());
    }

    #[test]
    fn latest_year_wins_per_country() {
        let raw = vec![
            obs("USA", "United States", "2020", Some(1.0)),
            obs("USA", "United States", "2020", Some(1.0)),
            obs("USA", "United States", "2021", Some(1.1)),
        ];

        let latest = latest_per_country(&raw).expect("pipeline");
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].year, 2021);
        assert_eq!(latest[0].value, 1.1);
    }

    #[test]
    fn reduction_is_insensitive_to_input_order() {
        let newer = obs("FRA", "France", "2018", Some(1.2));
        let older = obs("FRA", "France", "2015", Some(1.0));

        for raw in [
            vec![newer.clone(), older.clone()],
            vec![older, newer],
        ] {
            let latest = latest_per_country(&raw).expect("pipeline");
            assert_eq!(latest.len(), 1);
            assert_eq!(latest[0].year, 2018);
            assert_eq!(latest[0].value, 1.2);
        }
    }

    #[test]
    fn tie_on_max_year_keeps_first_encountered() {
        // Same country and year under two names is two distinct keys; the
        // strict-greater rule leaves the earlier one in place.
        let raw = vec![
            obs("COD", "Congo, Dem. Rep.", "2020", Some(900.0)),
            obs("COD", "Zaire", "2020", Some(901.0)),
        ];

        let latest = latest_per_country(&raw).expect("pipeline");
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].country_name, "Congo, Dem. Rep.");
        assert_eq!(latest[0].value, 900.0);
    }

    #[test]
    fn every_country_appears_exactly_once() {
        let raw = vec![
            obs("USA", "United States", "2019", Some(1.0)),
            obs("IND", "India", "2021", Some(73.0)),
            obs("USA", "United States", "2021", Some(1.1)),
            obs("FRA", "France", "2018", Some(0.72)),
            obs("IND", "India", "2018", Some(70.0)),
        ];

        let latest = latest_per_country(&raw).expect("pipeline");
        let codes: Vec<&str> = latest.iter().map(|r| r.country_code.as_str()).collect();
        assert_eq!(codes, ["USA", "IND", "FRA"]);
        assert_eq!(latest[0].year, 2021);
        assert_eq!(latest[1].year, 2021);
        assert_eq!(latest[2].year, 2018);
    }
}
