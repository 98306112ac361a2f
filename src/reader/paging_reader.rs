//! Record-at-a-time reader over a [`PagedSource`].

use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

use super::source::PagedSource;
use crate::error::ReadError;
use crate::models::{Page, PageRequest, Record, Sort};

/// Position of a [`PagingReader`] in the record stream
///
/// Owned by exactly one reader and mutated only through `&mut` access by
/// its fetch/advance logic.
#[derive(Debug)]
pub struct ReaderCursor<R> {
    /// Index of the next page to fetch
    page_index: usize,
    /// Records already handed out from the current page
    offset: usize,
    buffer: VecDeque<R>,
    /// The last fetched page was short, so no further page exists
    last_page_reached: bool,
    /// End of stream (or a read error) was observed; the reader is spent
    finished: bool,
}

impl<R> Default for ReaderCursor<R> {
    fn default() -> Self {
        Self {
            page_index: 0,
            offset: 0,
            buffer: VecDeque::new(),
            last_page_reached: false,
            finished: false,
        }
    }
}

impl<R> ReaderCursor<R> {
    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn load(&mut self, page: Page<R>) {
        self.last_page_reached = page.is_last();
        self.page_index = page.index + 1;
        self.offset = 0;
        self.buffer = page.records.into();
    }

    fn advance(&mut self) -> Option<R> {
        let record = self.buffer.pop_front()?;
        self.offset += 1;
        Some(record)
    }
}

/// Produces records one at a time, fetching the next page on demand
///
/// Pages are requested with an increasing page index starting at 0. The
/// stream ends when a fetched page is empty, or once a short page has been
/// drained. There is no seeking: a reader only moves forward, and a spent
/// reader stays spent. Each job run builds a fresh reader.
pub struct PagingReader<R: Record> {
    source: Arc<dyn PagedSource<R>>,
    page_size: usize,
    sort: Sort,
    cursor: ReaderCursor<R>,
    pages_fetched: usize,
    items_read: usize,
}

impl<R: Record> PagingReader<R> {
    pub fn new(source: Arc<dyn PagedSource<R>>, page_size: usize, sort: Sort) -> Self {
        Self {
            source,
            page_size,
            sort,
            cursor: ReaderCursor::default(),
            pages_fetched: 0,
            items_read: 0,
        }
    }

    /// Next record, or `None` at end of stream
    pub async fn read(&mut self) -> Result<Option<R>, ReadError> {
        loop {
            if self.cursor.finished {
                return Ok(None);
            }

            if let Some(record) = self.cursor.advance() {
                self.items_read += 1;
                return Ok(Some(record));
            }

            if self.cursor.last_page_reached {
                self.cursor.finished = true;
                debug!(
                    source = self.source.name(),
                    pages_fetched = self.pages_fetched,
                    items_read = self.items_read,
                    "Paging reader reached end of stream"
                );
                return Ok(None);
            }

            self.read_page().await?;
        }
    }

    async fn read_page(&mut self) -> Result<(), ReadError> {
        let request = PageRequest::new(self.cursor.page_index, self.page_size, self.sort.clone());

        let records = match self.source.fetch_page(&request).await {
            Ok(records) => records,
            Err(error) => {
                self.cursor.finished = true;
                warn!(
                    source = self.source.name(),
                    page_index = request.page_index,
                    error = %error,
                    "Page fetch failed"
                );
                return Err(error);
            }
        };

        if records.len() > self.page_size {
            self.cursor.finished = true;
            return Err(ReadError::fetch_failed(
                request.page_index,
                format!(
                    "source returned {} records for page size {}",
                    records.len(),
                    self.page_size
                ),
            ));
        }

        self.pages_fetched += 1;
        debug!(
            source = self.source.name(),
            page_index = request.page_index,
            page_size = self.page_size,
            list_size = records.len(),
            "Page fetched"
        );
        self.cursor.load(Page::new(&request, records));
        Ok(())
    }

    pub fn cursor(&self) -> &ReaderCursor<R> {
        &self.cursor
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub fn items_read(&self) -> usize {
        self.items_read
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExampleRecord;
    use crate::reader::InMemoryPagedSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn reader_over(count: usize, page_size: usize) -> PagingReader<ExampleRecord> {
        let source = Arc::new(InMemoryPagedSource::new(
            "example",
            ExampleRecord::sequence(count),
        ));
        PagingReader::new(source, page_size, Sort::ascending("id"))
    }

    async fn drain(reader: &mut PagingReader<ExampleRecord>) -> Vec<i64> {
        let mut ids = Vec::new();
        while let Some(record) = reader.read().await.unwrap() {
            ids.push(record.id);
        }
        ids
    }

    #[tokio::test]
    async fn test_reads_every_record_once_in_order() {
        let mut reader = reader_over(250, 100);
        let ids = drain(&mut reader).await;

        assert_eq!(ids, (1..=250).collect::<Vec<_>>());
        assert_eq!(reader.pages_fetched(), 3);
        assert_eq!(reader.items_read(), 250);
        assert!(reader.cursor().is_finished());
    }

    #[tokio::test]
    async fn test_exact_multiple_needs_one_empty_fetch() {
        let mut reader = reader_over(200, 100);
        let ids = drain(&mut reader).await;

        assert_eq!(ids.len(), 200);
        assert_eq!(reader.pages_fetched(), 3);
    }

    #[tokio::test]
    async fn test_empty_source_ends_after_first_fetch() {
        let mut reader = reader_over(0, 100);
        assert_eq!(reader.read().await.unwrap(), None);
        assert_eq!(reader.pages_fetched(), 1);

        // end of stream is permanent
        assert_eq!(reader.read().await.unwrap(), None);
        assert_eq!(reader.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn test_cursor_tracks_page_and_offset() {
        let mut reader = reader_over(30, 10);
        for _ in 0..13 {
            reader.read().await.unwrap();
        }
        assert_eq!(reader.cursor().page_index(), 2);
        assert_eq!(reader.cursor().offset(), 3);
        assert_eq!(reader.cursor().buffered(), 7);
    }

    struct FlakySource {
        fail_on_page: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PagedSource<ExampleRecord> for FlakySource {
        async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<ExampleRecord>, ReadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if request.page_index == self.fail_on_page {
                return Err(ReadError::fetch_failed(request.page_index, "connection reset"));
            }
            let start = request.offset() as i64 + 1;
            Ok((start..start + request.page_size as i64)
                .map(|id| ExampleRecord::new(id, "x"))
                .collect())
        }
    }

    #[tokio::test]
    async fn test_read_error_is_terminal() {
        let source = Arc::new(FlakySource {
            fail_on_page: 1,
            calls: AtomicUsize::new(0),
        });
        let mut reader = PagingReader::new(source.clone(), 5, Sort::ascending("id"));

        for _ in 0..5 {
            assert!(reader.read().await.unwrap().is_some());
        }
        let err = reader.read().await.unwrap_err();
        assert_eq!(err, ReadError::fetch_failed(1, "connection reset"));

        assert_eq!(reader.read().await.unwrap(), None);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
