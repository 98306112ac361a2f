//! Instrumented sources, writers and listeners for integration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use batchline_core::{
    Chunk, ChunkWriter, ExampleRecord, InMemoryPagedSource, Job, JobExecutionContext,
    JobExecutionListener, JobState, PageRequest, PagedSource, PoolLifecycle, ReadError,
    WriteError,
};

pub fn example_source(count: usize) -> Arc<InMemoryPagedSource<ExampleRecord>> {
    Arc::new(InMemoryPagedSource::new(
        "example",
        ExampleRecord::sequence(count),
    ))
}

/// Records the size of every page it serves
pub struct CountingSource {
    inner: Arc<InMemoryPagedSource<ExampleRecord>>,
    fetches: Mutex<Vec<(usize, usize)>>,
}

impl CountingSource {
    pub fn new(count: usize) -> Self {
        Self {
            inner: example_source(count),
            fetches: Mutex::new(Vec::new()),
        }
    }

    /// `(page_index, returned)` for every fetch, in call order
    pub fn fetches(&self) -> Vec<(usize, usize)> {
        self.fetches.lock().clone()
    }

    pub fn page_sizes(&self) -> Vec<usize> {
        self.fetches().into_iter().map(|(_, size)| size).collect()
    }
}

#[async_trait]
impl PagedSource<ExampleRecord> for CountingSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<ExampleRecord>, ReadError> {
        let page = self.inner.fetch_page(request).await?;
        self.fetches.lock().push((request.page_index, page.len()));
        Ok(page)
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Fails every fetch of one page index
pub struct FailingSource {
    inner: Arc<InMemoryPagedSource<ExampleRecord>>,
    fail_on_page: usize,
}

impl FailingSource {
    pub fn new(count: usize, fail_on_page: usize) -> Self {
        Self {
            inner: example_source(count),
            fail_on_page,
        }
    }
}

#[async_trait]
impl PagedSource<ExampleRecord> for FailingSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<ExampleRecord>, ReadError> {
        if request.page_index == self.fail_on_page {
            return Err(ReadError::fetch_failed(
                request.page_index,
                "connection reset by peer",
            ));
        }
        self.inner.fetch_page(request).await
    }
}

/// Tracks the highest number of writes in progress at once
pub struct ConcurrencyTrackingWriter {
    in_flight: AtomicUsize,
    high_water: AtomicUsize,
    delay: Duration,
    written: Mutex<Vec<u64>>,
}

impl ConcurrencyTrackingWriter {
    pub fn new(delay: Duration) -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
            delay,
            written: Mutex::new(Vec::new()),
        }
    }

    pub fn high_water_mark(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    pub fn written_chunks(&self) -> Vec<u64> {
        let mut written = self.written.lock().clone();
        written.sort_unstable();
        written
    }
}

#[async_trait]
impl ChunkWriter<ExampleRecord> for ConcurrencyTrackingWriter {
    async fn write(&self, chunk: &Chunk<ExampleRecord>) -> Result<(), WriteError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.written.lock().push(chunk.index());
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "concurrency_tracking"
    }
}

/// Rejects the chunks with the given indices and accepts the rest
pub struct FailOnChunkWriter {
    fail_on: HashSet<u64>,
    written: Mutex<Vec<Chunk<ExampleRecord>>>,
}

impl FailOnChunkWriter {
    pub fn new(fail_on: impl IntoIterator<Item = u64>) -> Self {
        Self {
            fail_on: fail_on.into_iter().collect(),
            written: Mutex::new(Vec::new()),
        }
    }

    pub fn written_indices(&self) -> Vec<u64> {
        let mut indices: Vec<u64> = self.written.lock().iter().map(Chunk::index).collect();
        indices.sort_unstable();
        indices
    }
}

#[async_trait]
impl ChunkWriter<ExampleRecord> for FailOnChunkWriter {
    async fn write(&self, chunk: &Chunk<ExampleRecord>) -> Result<(), WriteError> {
        if self.fail_on.contains(&chunk.index()) {
            return Err(WriteError::Unavailable(format!(
                "sink refused chunk {}",
                chunk.index()
            )));
        }
        self.written.lock().push(chunk.clone());
        Ok(())
    }
}

/// Captures what each lifecycle callback observed
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<(String, JobState, Option<PoolLifecycle>)>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(callback, status, executor lifecycle)` in call order
    pub fn events(&self) -> Vec<(String, JobState, Option<PoolLifecycle>)> {
        self.events.lock().clone()
    }
}

impl JobExecutionListener for RecordingListener {
    fn before_job(&self, context: &JobExecutionContext) {
        self.events.lock().push((
            "before_job".to_string(),
            context.status(),
            context.executor_lifecycle(),
        ));
    }

    fn after_job(&self, context: &JobExecutionContext) {
        self.events.lock().push((
            "after_job".to_string(),
            context.status(),
            context.executor_lifecycle(),
        ));
    }
}

pub fn build_job(
    name: &str,
    source: Arc<dyn PagedSource<ExampleRecord>>,
    writer: Arc<dyn ChunkWriter<ExampleRecord>>,
    listener: Arc<dyn JobExecutionListener>,
) -> Job<ExampleRecord> {
    Job::<ExampleRecord>::builder(name)
        .source(source)
        .writer(writer)
        .listener(listener)
        .build()
        .expect("job definition should be valid")
}
