//! End-to-end job runs through the launcher.

mod common;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use batchline_core::{
    Chunk, ChunkFailure, ChunkProcessor, ExampleRecord, InMemoryChunkWriter, Job, JobLauncher,
    JobParameters, JobState, NoopListener, PoolLifecycle, ProcessError, WriteError,
};
use common::*;

async fn run(
    job: Job<ExampleRecord>,
    parameters: JobParameters,
) -> batchline_core::JobExecutionContext {
    let name = job.name().to_string();
    let launcher = JobLauncher::new();
    launcher.register(job).unwrap();
    launcher.run_job(&name, parameters).await.unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_250_records_in_three_pages_and_chunks() {
    let source = Arc::new(CountingSource::new(250));
    let writer = Arc::new(InMemoryChunkWriter::<ExampleRecord>::new());
    let job = build_job("exampleJob", source.clone(), writer.clone(), Arc::new(NoopListener));

    let context = run(job, JobParameters::default()).await;

    assert_eq!(context.status(), JobState::Completed);
    assert_eq!(source.page_sizes(), vec![100, 100, 50]);
    assert_eq!(context.pages_fetched(), 3);
    let chunk_sizes: Vec<usize> = writer
        .written()
        .iter()
        .map(|entry| entry.chunk.len())
        .collect();
    assert_eq!(chunk_sizes, vec![100, 100, 50]);
    assert_eq!(context.chunks_processed(), 3);
    assert_eq!(context.chunks_failed(), 0);
    assert_eq!(context.items_written(), 250);
    assert_eq!(writer.written_ids(), (1..=250).collect::<Vec<i64>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_chunk_fails_job_without_stopping_siblings() {
    let writer = Arc::new(FailOnChunkWriter::new([2]));
    let listener = Arc::new(RecordingListener::new());
    let job = build_job(
        "exampleJob",
        example_source(500),
        writer.clone(),
        listener.clone(),
    );

    let context = run(job, JobParameters::default()).await;

    assert_eq!(context.status(), JobState::Failed);
    assert_eq!(context.chunks_processed(), 5);
    assert_eq!(context.chunks_failed(), 1);
    assert_eq!(writer.written_indices(), vec![0, 1, 3, 4]);

    let outcomes: Vec<(u64, bool)> = context
        .chunk_results()
        .iter()
        .map(|result| (result.chunk_index, result.is_success()))
        .collect();
    assert_eq!(
        outcomes,
        vec![(0, true), (1, true), (2, false), (3, true), (4, true)]
    );
    assert_eq!(
        context.chunk_results()[2].error,
        Some(ChunkFailure::Write(WriteError::Unavailable(
            "sink refused chunk 2".to_string()
        )))
    );

    let events = listener.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].0, "before_job");
    assert_eq!(events[0].1, JobState::Running);
    assert_eq!(
        events[1],
        (
            "after_job".to_string(),
            JobState::Failed,
            Some(PoolLifecycle::Terminated)
        )
    );
    assert_eq!(context.executor_lifecycle(), Some(PoolLifecycle::Terminated));
}

#[tokio::test]
async fn test_empty_source_completes_with_no_chunks() {
    let source = Arc::new(CountingSource::new(0));
    let writer = Arc::new(InMemoryChunkWriter::<ExampleRecord>::new());
    let listener = Arc::new(RecordingListener::new());
    let job = build_job("exampleJob", source.clone(), writer.clone(), listener.clone());

    let context = run(job, JobParameters::default()).await;

    assert_eq!(context.status(), JobState::Completed);
    assert_eq!(source.fetches(), vec![(0, 0)]);
    assert_eq!(context.chunks_processed(), 0);
    assert_eq!(writer.chunk_count(), 0);
    assert_eq!(listener.events().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_throttle_limit_of_one_serializes_writes() {
    let writer = Arc::new(ConcurrencyTrackingWriter::new(Duration::from_millis(5)));
    let job = build_job(
        "exampleJob",
        example_source(300),
        writer.clone(),
        Arc::new(NoopListener),
    );

    let context = run(
        job,
        JobParameters::default()
            .with_chunk_size(20)
            .with_page_size(20)
            .with_throttle_limit(1),
    )
    .await;

    assert_eq!(context.status(), JobState::Completed);
    assert_eq!(context.chunks_processed(), 15);
    assert_eq!(writer.high_water_mark(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writes_never_exceed_throttle_limit() {
    let writer = Arc::new(ConcurrencyTrackingWriter::new(Duration::from_millis(10)));
    let job = build_job(
        "exampleJob",
        example_source(1_000),
        writer.clone(),
        Arc::new(NoopListener),
    );

    let context = run(
        job,
        JobParameters::default()
            .with_chunk_size(25)
            .with_throttle_limit(4),
    )
    .await;

    assert_eq!(context.status(), JobState::Completed);
    assert_eq!(writer.written_chunks(), (0..40).collect::<Vec<u64>>());
    let high_water = writer.high_water_mark();
    assert!(high_water >= 1 && high_water <= 4, "high water mark {high_water}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_read_error_fails_job_and_drops_the_failing_page() {
    let writer = Arc::new(InMemoryChunkWriter::<ExampleRecord>::new());
    let listener = Arc::new(RecordingListener::new());
    let job = build_job(
        "exampleJob",
        Arc::new(FailingSource::new(500, 2)),
        writer.clone(),
        listener.clone(),
    );

    let context = run(job, JobParameters::default()).await;

    assert_eq!(context.status(), JobState::Failed);
    assert_eq!(context.pages_fetched(), 2);
    assert_eq!(context.items_read(), 200);
    assert_eq!(context.chunks_processed(), 2);
    assert_eq!(context.chunks_failed(), 0);
    assert_eq!(writer.written_ids(), (1..=200).collect::<Vec<i64>>());
    assert!(context
        .failures()
        .iter()
        .any(|failure| failure.contains("read failed") && failure.contains("page 2")));
    assert_eq!(
        listener.events().last().map(|event| event.2),
        Some(Some(PoolLifecycle::Terminated))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_read_error_mid_chunk_discards_partial_chunk() {
    let writer = Arc::new(InMemoryChunkWriter::<ExampleRecord>::new());
    let job = build_job(
        "exampleJob",
        Arc::new(FailingSource::new(500, 3)),
        writer.clone(),
        Arc::new(NoopListener),
    );

    // Pages of 50: chunk 1 would need pages 2 and 3
    let context = run(
        job,
        JobParameters::default().with_page_size(50).with_chunk_size(100),
    )
    .await;

    assert_eq!(context.status(), JobState::Failed);
    assert_eq!(context.items_read(), 150);
    assert_eq!(writer.written_ids(), (1..=100).collect::<Vec<i64>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_chunk_size_not_a_multiple_of_page_size() {
    let source = Arc::new(CountingSource::new(400));
    let writer = Arc::new(InMemoryChunkWriter::<ExampleRecord>::new());
    let job = build_job("exampleJob", source.clone(), writer.clone(), Arc::new(NoopListener));

    let context = run(job, JobParameters::default().with_chunk_size(150)).await;

    assert_eq!(context.status(), JobState::Completed);
    // 400 is an exact multiple of the page size, so one empty fetch ends the stream
    assert_eq!(source.page_sizes(), vec![100, 100, 100, 100, 0]);
    let chunk_sizes: Vec<usize> = writer
        .written()
        .iter()
        .map(|entry| entry.chunk.len())
        .collect();
    assert_eq!(chunk_sizes, vec![150, 150, 100]);
}

struct EvenIdsOnly;

#[async_trait]
impl ChunkProcessor<ExampleRecord> for EvenIdsOnly {
    async fn process(
        &self,
        chunk: Chunk<ExampleRecord>,
    ) -> Result<Chunk<ExampleRecord>, ProcessError> {
        let index = chunk.index();
        let kept = chunk
            .into_items()
            .into_iter()
            .filter(|record| record.id % 2 == 0)
            .collect();
        Ok(Chunk::new(index, kept))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_processor_output_reaches_writer() {
    let writer = Arc::new(InMemoryChunkWriter::<ExampleRecord>::new());
    let job = Job::<ExampleRecord>::builder("filterJob")
        .source(example_source(100))
        .processor(Arc::new(EvenIdsOnly))
        .writer(writer.clone())
        .build()
        .unwrap();

    let context = run(job, JobParameters::default().with_chunk_size(10)).await;

    assert_eq!(context.status(), JobState::Completed);
    assert_eq!(context.items_read(), 100);
    assert_eq!(context.items_written(), 50);
    assert!(writer.written_ids().iter().all(|id| id % 2 == 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_worker_names_use_configured_prefix() {
    let writer = Arc::new(InMemoryChunkWriter::<ExampleRecord>::new());
    let job = Job::<ExampleRecord>::builder("exampleJob")
        .source(example_source(200))
        .writer(writer.clone())
        .worker_name_prefix("chunk-worker-")
        .build()
        .unwrap();

    let context = run(job, JobParameters::default().with_chunk_size(20)).await;

    assert_eq!(context.status(), JobState::Completed);
    for result in context.chunk_results() {
        assert!(result.worker.starts_with("chunk-worker-"), "{}", result.worker);
    }
    for entry in writer.written() {
        assert!(entry.worker.unwrap().starts_with("chunk-worker-"));
    }
}

#[tokio::test]
async fn test_context_serializes_for_reporting() {
    let job = build_job(
        "exampleJob",
        example_source(30),
        Arc::new(InMemoryChunkWriter::<ExampleRecord>::new()),
        Arc::new(NoopListener),
    );

    let context = run(job, JobParameters::default().with_chunk_size(10)).await;
    let json = serde_json::to_value(&context).unwrap();

    assert_eq!(json["status"], "COMPLETED");
    assert_eq!(json["run_id"], 1);
    assert_eq!(json["executor_lifecycle"], "TERMINATED");
    assert_eq!(json["chunk_results"].as_array().unwrap().len(), 3);
}
