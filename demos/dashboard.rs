//! Dashboard Example
//!
//! This example demonstrates:
//! 1. Loading shared API settings from the environment
//! 2. Retrying a flaky endpoint with linear backoff
//! 3. Rendering widgets inside error boundaries
//! 4. Recovering a tripped boundary

use fetchguard_rs::{
    with_boundary, ApiConfig, ApiResponse, ErrorBoundary, FetchState, HookRegistry,
    RecoveryAction, Rendered,
};
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
struct ServiceError(String);

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service error: {}", self.0)
    }
}

impl Error for ServiceError {}

#[derive(Debug, Clone)]
struct Revenue {
    total: f64,
    orders: u32,
}

fn show(label: &str, rendered: Rendered<String>) {
    match rendered {
        Rendered::Content(view) => println!("[{label}] {view}"),
        Rendered::Fallback(view) => println!("[{label}] fallback: {view}"),
        Rendered::Recovery(view) => {
            println!("[{label}] {}: {}", view.title, view.message);
            if let Some(details) = view.details {
                println!("[{label}]   {details}");
            }
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fetchguard_rs=info".into()),
        )
        .init();

    let config = ApiConfig::from_env().with_retry_delay(Duration::from_millis(200));
    println!("=== Dashboard against {} ===\n", config.endpoint("/revenue"));

    // 1. Hooks for observability
    let hooks = HookRegistry::new();
    hooks.set_on_retry(|attempt, delay| println!("retry #{attempt} in {delay:?}"));
    hooks.set_on_success(|revenue: &Revenue| println!("revenue loaded: {:.2}", revenue.total));

    // 2. The first two calls time out, the third succeeds
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    let revenue = FetchState::<Revenue, ServiceError>::builder(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if n < 2 {
                Err(ServiceError("gateway timeout".to_string()))
            } else {
                Ok(ApiResponse::ok(Revenue {
                    total: 18_240.5,
                    orders: 312,
                }))
            }
        }
    })
    .name("revenue")
    .immediate(false)
    .hooks(hooks)
    .build_with_retry(config.retry_policy())
    .expect("must run inside a Tokio runtime");

    revenue.execute().await;
    println!(
        "attempts={} retry_count={} phase={:?}\n",
        calls.load(Ordering::SeqCst),
        revenue.retry_count(),
        revenue.phase()
    );

    // 3. A widget that renders from the fetched state
    let state = revenue.clone();
    let mut summary = with_boundary(
        move || {
            let data = state.data().expect("revenue must be loaded");
            format!("{} orders, {:.2} total", data.orders, data.total)
        },
        ErrorBoundary::new("revenue-summary"),
    );
    show("summary", summary.render());

    // 4. A widget that fails on its first render
    let mut broken_once = true;
    let mut chart = ErrorBoundary::<String>::new("revenue-chart")
        .show_details(true)
        .on_error(|error| println!("boundary reported {}", error.code()));

    show(
        "chart",
        chart.render(|| {
            if broken_once {
                panic!("chart series had no points");
            }
            "chart ok".to_string()
        }),
    );

    broken_once = false;
    chart.handle(RecoveryAction::TryAgain);
    show(
        "chart",
        chart.render(|| {
            if broken_once {
                panic!("chart series had no points");
            }
            "chart ok".to_string()
        }),
    );

    println!("\n=== Example Completed ===");
}
