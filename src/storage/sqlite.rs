//! SQLite sink with replace-all semantics.
//!
//! Each publish deletes every row of the target table and inserts the new
//! result set in batches, inside one transaction.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};

use crate::error::{AppError, Result};
use crate::models::{DatabaseConfig, NAV_DATE_FORMAT, ResultSet};
use crate::storage::{Publication, ResultSink};

/// SQLite's default SQLITE_MAX_VARIABLE_NUMBER is 999; 5 binds per row.
const MAX_ROWS_PER_BATCH: usize = 150;

/// Database sink.
#[derive(Debug, Clone)]
pub struct SqliteSink {
    url: String,
    database: String,
    table: String,
}

impl SqliteSink {
    /// `table` must already be a validated identifier; it is interpolated
    /// into SQL.
    pub fn new(url: impl Into<String>, database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            table: table.into(),
        }
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Ok(Self::new(
            config.require_url()?,
            config.name.clone(),
            config.collection.clone(),
        ))
    }

    async fn connect(&self) -> Result<SqlitePool> {
        let options = SqliteConnectOptions::from_str(&self.url)
            .map_err(|e| AppError::sink(self.name(), format!("invalid connection string: {e}")))?
            .create_if_missing(true);

        Ok(SqlitePool::connect_with(options).await?)
    }

    async fn ensure_table(&self, pool: &SqlitePool) -> Result<()> {
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                code TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                nav REAL NOT NULL,
                date TEXT NOT NULL,
                last_updated_on TEXT NOT NULL
            )
            "#,
            self.table
        );
        sqlx::query(&ddl).execute(pool).await?;
        Ok(())
    }

    async fn replace_all(&self, pool: &SqlitePool, results: &ResultSet) -> Result<u64> {
        let mut tx = pool.begin().await?;

        let deleted = sqlx::query(&format!("DELETE FROM {}", self.table))
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for chunk in results.as_slice().chunks(MAX_ROWS_PER_BATCH) {
            let mut query_builder = sqlx::QueryBuilder::new(format!(
                "INSERT INTO {} (code, name, nav, date, last_updated_on) ",
                self.table
            ));

            query_builder.push_values(chunk, |mut b, result| {
                b.push_bind(result.identifier.as_str().to_string())
                    .push_bind(result.display_name.clone())
                    .push_bind(result.value)
                    .push_bind(result.observed_at.format(NAV_DATE_FORMAT).to_string())
                    .push_bind(result.recorded_at.to_rfc3339());
            });

            query_builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(deleted)
    }
}

#[async_trait]
impl ResultSink for SqliteSink {
    fn name(&self) -> &str {
        "database"
    }

    async fn publish(&self, results: &ResultSet) -> Result<Publication> {
        if results.is_empty() {
            return Ok(Publication::Skipped {
                reason: "no active funds; existing rows kept".to_string(),
            });
        }

        let pool = self.connect().await?;
        let outcome: Result<u64> = async {
            self.ensure_table(&pool).await?;
            self.replace_all(&pool, results).await
        }
        .await;
        pool.close().await;

        let deleted = outcome?;
        Ok(Publication::Written {
            count: results.len(),
            location: format!("{}.{}", self.database, self.table),
            replaced: Some(deleted),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use tempfile::TempDir;

    use crate::models::{DetailResult, RecordRef};

    fn result(code: &str) -> DetailResult {
        DetailResult {
            identifier: RecordRef::new(code).unwrap(),
            display_name: format!("Scheme {code}"),
            value: 12.5,
            observed_at: NaiveDate::from_ymd_opt(2026, 10, 14).unwrap(),
            recorded_at: Utc::now(),
        }
    }

    fn sink_in(dir: &TempDir) -> SqliteSink {
        let url = format!("sqlite:{}", dir.path().join("funds.db").display());
        SqliteSink::new(url, "test", "py_active_fund")
    }

    async fn codes(sink: &SqliteSink) -> Vec<String> {
        let pool = sink.connect().await.unwrap();
        let rows: Vec<(String,)> = sqlx::query_as("SELECT code FROM py_active_fund ORDER BY code")
            .fetch_all(&pool)
            .await
            .unwrap();
        pool.close().await;
        rows.into_iter().map(|(code,)| code).collect()
    }

    #[tokio::test]
    async fn test_replace_all_semantics() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir);

        let first = ResultSet::new(vec![result("1"), result("2"), result("3")]);
        let publication = sink.publish(&first).await.unwrap();
        assert_eq!(
            publication,
            Publication::Written {
                count: 3,
                location: "test.py_active_fund".into(),
                replaced: Some(0)
            }
        );

        let second = ResultSet::new(vec![result("4")]);
        let publication = sink.publish(&second).await.unwrap();
        assert!(matches!(
            publication,
            Publication::Written {
                count: 1,
                replaced: Some(3),
                ..
            }
        ));
        assert_eq!(codes(&sink).await, vec!["4"]);
    }

    #[tokio::test]
    async fn test_large_set_is_batched() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir);

        let many: Vec<_> = (0..(MAX_ROWS_PER_BATCH * 2 + 7))
            .map(|i| result(&format!("{i:05}")))
            .collect();
        sink.publish(&ResultSet::new(many)).await.unwrap();
        assert_eq!(codes(&sink).await.len(), MAX_ROWS_PER_BATCH * 2 + 7);
    }

    #[tokio::test]
    async fn test_empty_set_skips_and_keeps_rows() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir);

        sink.publish(&ResultSet::new(vec![result("9")])).await.unwrap();
        let publication = sink.publish(&ResultSet::default()).await.unwrap();

        assert!(matches!(publication, Publication::Skipped { .. }));
        assert_eq!(codes(&sink).await, vec!["9"]);
    }

    #[tokio::test]
    async fn test_unreachable_database_is_an_error() {
        let sink = SqliteSink::new("sqlite:/nonexistent-dir/for/sure/funds.db", "test", "t");
        assert!(sink.publish(&ResultSet::new(vec![result("1")])).await.is_err());
    }
}
