use fetchguard_rs::{ApiResponse, FetchState};
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Custom error type that implements Error trait
#[derive(Debug)]
struct ServiceError(String);

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service error: {}", self.0)
    }
}

impl Error for ServiceError {}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fetchguard_rs=debug".into()),
        )
        .init();

    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    // Odd calls succeed, every third call is rejected by the API, the rest
    // fail in transport.
    let orders = FetchState::<Vec<u32>, ServiceError>::builder(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            if n % 3 == 0 {
                Ok(ApiResponse::failure("Store is closed"))
            } else if n % 2 == 0 {
                Err(ServiceError("connection reset".to_string()))
            } else {
                Ok(ApiResponse::ok(vec![n, n * 10]))
            }
        }
    })
    .name("orders")
    .immediate(false)
    .on_success(|orders: &Vec<u32>| println!("received {} orders", orders.len()))
    .on_error(|error| println!("request failed: {error}"))
    .build()
    .expect("must run inside a Tokio runtime");

    println!("initial phase: {:?}", orders.phase());

    for attempt in 1..=6 {
        println!("\nRefetch {attempt}:");
        orders.refetch().await.expect("refetch task panicked");

        let state = orders.snapshot();
        println!(
            "phase={:?} data={:?} error={:?} stale={}",
            state.phase(),
            state.data,
            state.error.as_ref().map(|e| e.code().as_str().to_string()),
            state.is_stale()
        );
    }

    println!(
        "\nexecutions={} error_rate={:.2}",
        orders.stats().executions(),
        orders.stats().error_rate()
    );
}
