//! PostgreSQL-backed paged source for [`ExampleRecord`]s.
//!
//! Reads `example (id BIGINT, data TEXT)` one page per query with
//! `LIMIT`/`OFFSET`. Only allow-listed columns may appear in `ORDER BY`.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument};

use super::source::PagedSource;
use crate::error::ReadError;
use crate::models::{ExampleRecord, PageRequest};

const SORTABLE_COLUMNS: &[&str] = &["id"];

#[derive(Debug, Clone)]
pub struct PgPagedSource {
    pool: PgPool,
    table: String,
}

impl PgPagedSource {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table: "example".to_string(),
        }
    }

    fn page_query(&self, request: &PageRequest) -> Result<String, ReadError> {
        let column = SORTABLE_COLUMNS
            .iter()
            .find(|column| **column == request.sort.key)
            .ok_or_else(|| ReadError::UnsupportedSortKey {
                key: request.sort.key.clone(),
            })?;

        Ok(format!(
            "SELECT id, data FROM {} ORDER BY {} {} LIMIT $1 OFFSET $2",
            self.table, column, request.sort.direction
        ))
    }
}

#[async_trait]
impl PagedSource<ExampleRecord> for PgPagedSource {
    #[instrument(
        skip(self),
        fields(page_index = request.page_index, page_size = request.page_size)
    )]
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<ExampleRecord>, ReadError> {
        let query = self.page_query(request)?;
        let limit = i64::try_from(request.page_size).map_err(|_| {
            ReadError::fetch_failed(request.page_index, "page size exceeds i64::MAX")
        })?;
        let offset = i64::try_from(request.offset()).map_err(|_| {
            ReadError::fetch_failed(request.page_index, "page offset exceeds i64::MAX")
        })?;

        let rows = sqlx::query(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let records = rows
            .iter()
            .map(|row| {
                Ok(ExampleRecord {
                    id: row.try_get("id")?,
                    data: row.try_get("data")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        debug!(returned = records.len(), "PostgreSQL page fetched");
        Ok(records)
    }

    fn name(&self) -> &str {
        &self.table
    }
}
