//! Job definitions and their builder.

use std::fmt;
use std::sync::Arc;

use super::listener::{JobExecutionListener, NoopListener};
use crate::constants;
use crate::error::{BatchError, BatchResult};
use crate::models::{Record, Sort};
use crate::reader::PagedSource;
use crate::step::{ChunkProcessor, PassThroughProcessor};
use crate::writer::ChunkWriter;

/// A named, single-step chunk job: source → processor → writer
pub struct Job<R: Record> {
    name: String,
    source: Arc<dyn PagedSource<R>>,
    processor: Arc<dyn ChunkProcessor<R>>,
    writer: Arc<dyn ChunkWriter<R>>,
    listener: Arc<dyn JobExecutionListener>,
    sort: Sort,
    worker_name_prefix: String,
}

impl<R: Record> Job<R> {
    pub fn builder(name: impl Into<String>) -> JobBuilder<R> {
        JobBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &Arc<dyn PagedSource<R>> {
        &self.source
    }

    pub fn processor(&self) -> &Arc<dyn ChunkProcessor<R>> {
        &self.processor
    }

    pub fn writer(&self) -> &Arc<dyn ChunkWriter<R>> {
        &self.writer
    }

    pub fn listener(&self) -> &Arc<dyn JobExecutionListener> {
        &self.listener
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    pub fn worker_name_prefix(&self) -> &str {
        &self.worker_name_prefix
    }
}

impl<R: Record> fmt::Debug for Job<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("source", &self.source.name())
            .field("writer", &self.writer.name())
            .field("sort", &self.sort)
            .field("worker_name_prefix", &self.worker_name_prefix)
            .finish()
    }
}

/// Builds a [`Job`]; a source and a writer are required
pub struct JobBuilder<R: Record> {
    name: String,
    source: Option<Arc<dyn PagedSource<R>>>,
    processor: Arc<dyn ChunkProcessor<R>>,
    writer: Option<Arc<dyn ChunkWriter<R>>>,
    listener: Arc<dyn JobExecutionListener>,
    sort: Sort,
    worker_name_prefix: String,
}

impl<R: Record> JobBuilder<R> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            processor: Arc::new(PassThroughProcessor),
            writer: None,
            listener: Arc::new(NoopListener),
            sort: Sort::ascending(R::sort_field()),
            worker_name_prefix: constants::DEFAULT_WORKER_NAME_PREFIX.to_string(),
        }
    }

    pub fn source(mut self, source: Arc<dyn PagedSource<R>>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn processor(mut self, processor: Arc<dyn ChunkProcessor<R>>) -> Self {
        self.processor = processor;
        self
    }

    pub fn writer(mut self, writer: Arc<dyn ChunkWriter<R>>) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn JobExecutionListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Order pages by `key`, ascending
    pub fn sort_key(mut self, key: impl Into<String>) -> Self {
        self.sort = Sort::ascending(key);
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn worker_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.worker_name_prefix = prefix.into();
        self
    }

    pub fn build(self) -> BatchResult<Job<R>> {
        if self.name.trim().is_empty() {
            return Err(BatchError::InvalidParameter(
                "job name must not be empty".to_string(),
            ));
        }
        let source = self.source.ok_or_else(|| {
            BatchError::InvalidParameter(format!("job '{}' has no paged source", self.name))
        })?;
        let writer = self.writer.ok_or_else(|| {
            BatchError::InvalidParameter(format!("job '{}' has no chunk writer", self.name))
        })?;

        Ok(Job {
            name: self.name,
            source,
            processor: self.processor,
            writer,
            listener: self.listener,
            sort: self.sort,
            worker_name_prefix: self.worker_name_prefix,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExampleRecord;
    use crate::reader::InMemoryPagedSource;
    use crate::writer::InMemoryChunkWriter;

    #[test]
    fn test_builder_defaults() {
        let job = Job::<ExampleRecord>::builder("exampleJob")
            .source(Arc::new(InMemoryPagedSource::new("example", Vec::<ExampleRecord>::new())))
            .writer(Arc::new(InMemoryChunkWriter::<ExampleRecord>::new()))
            .build()
            .unwrap();

        assert_eq!(job.name(), "exampleJob");
        assert_eq!(job.sort(), &Sort::ascending("id"));
        assert_eq!(job.worker_name_prefix(), "executor-");
        assert_eq!(job.source().name(), "example");
    }

    #[test]
    fn test_builder_requires_source_and_writer() {
        let err = Job::<ExampleRecord>::builder("exampleJob")
            .writer(Arc::new(InMemoryChunkWriter::<ExampleRecord>::new()))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("no paged source"));

        let err = Job::<ExampleRecord>::builder("exampleJob")
            .source(Arc::new(InMemoryPagedSource::new("example", Vec::<ExampleRecord>::new())))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("no chunk writer"));
    }
}
