use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fetchguard_rs::{ApiResponse, ErrorBoundary, FetchState, RetryPolicy};
use std::error::Error;
use std::fmt;
use std::time::Duration;
use tokio::runtime::Runtime;

// Custom error type that implements Error trait
#[derive(Debug)]
struct BenchError(String);

impl BenchError {
    fn new(msg: &str) -> Self {
        BenchError(msg.to_string())
    }
}

impl fmt::Display for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Benchmark error: {}", self.0)
    }
}

impl Error for BenchError {}

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn bench_execute_success(c: &mut Criterion) {
    let rt = runtime();
    let fetch = rt.block_on(async {
        FetchState::<Vec<u32>, BenchError>::builder(|| async {
            Ok(ApiResponse::ok(vec![1, 2, 3, 4]))
        })
        .immediate(false)
        .build()
        .unwrap()
    });

    c.bench_function("fetch_execute_success", |b| {
        b.iter(|| rt.block_on(fetch.execute()));
    });
}

fn bench_execute_failure(c: &mut Criterion) {
    let rt = runtime();
    let fetch = rt.block_on(async {
        FetchState::<Vec<u32>, BenchError>::builder(|| async {
            Err(BenchError::new("Simulated failure"))
        })
        .immediate(false)
        .build()
        .unwrap()
    });

    c.bench_function("fetch_execute_network_error", |b| {
        b.iter(|| rt.block_on(fetch.execute()));
    });
}

fn bench_retry_first_try(c: &mut Criterion) {
    let rt = runtime();
    let fetch = rt.block_on(async {
        FetchState::<u64, BenchError>::builder(|| async { Ok(ApiResponse::ok(42)) })
            .immediate(false)
            .build_with_retry(RetryPolicy::new(3, Duration::from_millis(1000)))
            .unwrap()
    });

    c.bench_function("retry_fetch_first_try_success", |b| {
        b.iter(|| rt.block_on(fetch.execute()));
    });
}

fn bench_snapshot_concurrent(c: &mut Criterion) {
    use std::sync::{Arc, Barrier};
    use std::thread;

    let rt = runtime();
    let fetch = rt.block_on(async {
        let fetch = FetchState::<String, BenchError>::builder(|| async {
            Ok(ApiResponse::ok("dashboard".to_string()))
        })
        .immediate(false)
        .build()
        .unwrap();
        fetch.execute().await;
        fetch
    });

    const THREAD_COUNT: usize = 4;
    const ITERATIONS_PER_THREAD: usize = 1000;

    c.bench_function("fetch_snapshot_concurrent", |b| {
        b.iter(|| {
            let barrier = Arc::new(Barrier::new(THREAD_COUNT + 1));
            let mut handles = Vec::with_capacity(THREAD_COUNT);

            for _ in 0..THREAD_COUNT {
                let thread_fetch = fetch.clone();
                let thread_barrier = Arc::clone(&barrier);

                handles.push(thread::spawn(move || {
                    thread_barrier.wait();
                    for _ in 0..ITERATIONS_PER_THREAD {
                        black_box(thread_fetch.snapshot());
                    }
                }));
            }

            barrier.wait();

            for handle in handles {
                handle.join().unwrap();
            }
        });
    });
}

fn bench_boundary_render(c: &mut Criterion) {
    let mut boundary = ErrorBoundary::<usize>::new("bench");

    c.bench_function("boundary_render_clean", |b| {
        b.iter(|| black_box(boundary.render(|| black_box(7))));
    });
}

criterion_group!(
    benches,
    bench_execute_success,
    bench_execute_failure,
    bench_retry_first_try,
    bench_snapshot_concurrent,
    bench_boundary_render
);
criterion_main!(benches);
