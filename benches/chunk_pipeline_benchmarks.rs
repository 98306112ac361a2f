use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tokio::runtime::Runtime;

use batchline_core::{
    ChunkAssembler, ExampleRecord, InMemoryPagedSource, Job, JobLauncher, JobParameters,
    LoggingChunkWriter, PagingReader, Sort,
};

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .expect("benchmark runtime")
}

fn benchmark_chunk_assembly(c: &mut Criterion) {
    let runtime = runtime();
    let source = Arc::new(InMemoryPagedSource::new(
        "example",
        ExampleRecord::sequence(10_000),
    ));

    let mut group = c.benchmark_group("chunk_assembly");
    for page_size in [50usize, 100, 500] {
        group.bench_with_input(
            BenchmarkId::from_parameter(page_size),
            &page_size,
            |b, &page_size| {
                b.iter(|| {
                    runtime.block_on(async {
                        let reader =
                            PagingReader::new(source.clone(), page_size, Sort::ascending("id"));
                        let mut assembler = ChunkAssembler::new(reader, 100);
                        let mut chunks = 0;
                        while let Some(chunk) = assembler.next_chunk().await.expect("read") {
                            black_box(chunk.len());
                            chunks += 1;
                        }
                        chunks
                    })
                })
            },
        );
    }
    group.finish();
}

fn benchmark_job_run(c: &mut Criterion) {
    let runtime = runtime();
    let launcher = JobLauncher::new();
    let job = Job::<ExampleRecord>::builder("benchJob")
        .source(Arc::new(InMemoryPagedSource::new(
            "example",
            ExampleRecord::sequence(5_000),
        )))
        .writer(Arc::new(LoggingChunkWriter::default()))
        .build()
        .expect("job");
    launcher.register(job).expect("register");

    let mut group = c.benchmark_group("job_run");
    for throttle_limit in [1usize, 4, 10] {
        group.bench_with_input(
            BenchmarkId::from_parameter(throttle_limit),
            &throttle_limit,
            |b, &throttle_limit| {
                b.iter(|| {
                    runtime.block_on(async {
                        let parameters =
                            JobParameters::default().with_throttle_limit(throttle_limit);
                        launcher
                            .run_job("benchJob", parameters)
                            .await
                            .expect("job run")
                    })
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, benchmark_chunk_assembly, benchmark_job_run);
criterion_main!(benches);
