//! Paged-query data sources.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::ReadError;
use crate::models::{PageRequest, Record, SortDirection};

/// The only query contract the engine needs from storage
///
/// Implementations must be deterministic: fetching the same request twice
/// without an intervening data change returns identical records. Every call
/// is an independent query, so a source may be shared freely.
#[async_trait]
pub trait PagedSource<R: Record>: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<R>, ReadError>;

    fn name(&self) -> &str {
        "paged_source"
    }
}

/// A paged source over records held in memory, kept sorted by `sort_key`
#[derive(Debug)]
pub struct InMemoryPagedSource<R: Record> {
    name: String,
    records: RwLock<Vec<R>>,
}

impl<R: Record> InMemoryPagedSource<R> {
    pub fn new(name: impl Into<String>, records: Vec<R>) -> Self {
        let source = Self {
            name: name.into(),
            records: RwLock::new(Vec::with_capacity(records.len())),
        };
        source.extend(records);
        source
    }

    pub fn extend(&self, records: impl IntoIterator<Item = R>) {
        let mut guard = self.records.write();
        guard.extend(records);
        guard.sort_by_key(Record::sort_key);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl<R: Record> PagedSource<R> for InMemoryPagedSource<R> {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<R>, ReadError> {
        if request.sort.key != R::sort_field() {
            return Err(ReadError::UnsupportedSortKey {
                key: request.sort.key.clone(),
            });
        }

        let records = self.records.read();
        let offset = request.offset().min(records.len());
        let page: Vec<R> = match request.sort.direction {
            SortDirection::Ascending => records
                .iter()
                .skip(offset)
                .take(request.page_size)
                .cloned()
                .collect(),
            SortDirection::Descending => records
                .iter()
                .rev()
                .skip(offset)
                .take(request.page_size)
                .cloned()
                .collect(),
        };

        debug!(
            source = %self.name,
            page_index = request.page_index,
            page_size = request.page_size,
            returned = page.len(),
            "In-memory page fetched"
        );
        Ok(page)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
