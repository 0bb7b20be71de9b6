//! Postgres-backed gateway for the persisted per-country PPP snapshot.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_postgres::Client;

use crate::normalizer::PppRecord;

/// Country whose presence marks the snapshot as already persisted.
pub const SENTINEL_COUNTRY: &str = "IND";

const TABLE: &str = "ppp_records";

/// Handle to the per-country PPP record table. One row per country, keyed by
/// uppercased ISO3 code; rows are written once and never updated.
#[derive(Clone)]
pub struct PppStore {
    client: Arc<Client>,
}

impl PppStore {
    /// Wraps an established Postgres client.
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// Creates the backing table when missing.
    pub async fn ensure_table(&self) -> Result<()> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {TABLE} (
                country_code TEXT PRIMARY KEY,
                country_name TEXT NOT NULL,
                year INT NOT NULL,
                value DOUBLE PRECISION NOT NULL
            )"
        );
        self.client
            .execute(&ddl, &[])
            .await
            .context("failed to create PPP record table")?;
        Ok(())
    }

    /// Reports whether a record for `country_code` is present.
    pub async fn exists(&self, country_code: &str) -> Result<bool> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {TABLE} WHERE country_code = $1)");
        let row = self
            .client
            .query_one(&sql, &[&country_code.to_uppercase()])
            .await
            .context("PPP record existence check failed")?;
        Ok(row.get(0))
    }

    /// Writes the snapshot unless the sentinel record is already present,
    /// then reports the post-write sentinel state.
    ///
    /// Rows are inserted individually with conflict-skip semantics and no
    /// surrounding transaction; an interrupted run can leave a partial
    /// snapshot behind, which surfaces as `false` here.
    pub async fn put_if_absent(&self, records: &[PppRecord]) -> Result<bool> {
        if self.exists(SENTINEL_COUNTRY).await? {
            return Ok(true);
        }

        let sql = format!(
            "INSERT INTO {TABLE} (country_code, country_name, year, value) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (country_code) DO NOTHING"
        );
        let statement = self
            .client
            .prepare(&sql)
            .await
            .context("failed to prepare PPP insert")?;
        for record in records {
            self.client
                .execute(
                    &statement,
                    &[
                        &record.country_code.to_uppercase(),
                        &record.country_name,
                        &record.year,
                        &record.value,
                    ],
                )
                .await
                .with_context(|| {
                    format!("failed to insert PPP record for {}", record.country_code)
                })?;
        }

        self.exists(SENTINEL_COUNTRY).await
    }

    /// Point lookup by country code; the code is uppercased before the query.
    pub async fn get(&self, country_code: &str) -> Result<Option<PppRecord>> {
        let sql = format!(
            "SELECT country_code, country_name, year, value \
             FROM {TABLE} WHERE country_code = $1"
        );
        let row = self
            .client
            .query_opt(&sql, &[&country_code.to_uppercase()])
            .await
            .context("PPP record lookup failed")?;
        Ok(row.map(|row| PppRecord {
            country_code: row.get("country_code"),
            country_name: row.get("country_name"),
            year: row.get("year"),
            value: row.get("value"),
        }))
    }
}
