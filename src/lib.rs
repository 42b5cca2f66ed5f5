//! # fetchguard-rs
//!
//! Observable async fetch state with bounded linear-backoff retry, plus
//! panic-containing render boundaries.
//!
//! The crate has three parts:
//!
//! - **[`FetchState`]**: drives a zero-argument async producer and publishes
//!   `{data, loading, error}` for consumers, with `refetch` to run it again.
//!   A failed refetch keeps the last good `data` next to the new `error`.
//! - **[`RetryFetch`]**: the same state, with a producer that retries failures
//!   up to `max_retries` times, waiting `retry_delay × attempt` between tries.
//! - **[`ErrorBoundary`]**: builds a child view under `catch_unwind` and swaps
//!   in a fallback when it panics, until the user chooses to try again.
//!
//! ## Basic Usage
//!
//! ```rust
//! use fetchguard_rs::{ApiResponse, FetchState};
//! use std::fmt;
//!
//! #[derive(Debug)]
//! struct TransportError(String);
//!
//! impl fmt::Display for TransportError {
//!     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
//!         write!(f, "transport error: {}", self.0)
//!     }
//! }
//!
//! impl std::error::Error for TransportError {}
//!
//! # tokio_test::block_on(async {
//! let orders = FetchState::builder(|| async {
//!     Ok::<_, TransportError>(ApiResponse::ok(vec![12.5_f64, 40.0]))
//! })
//! .name("orders")
//! .immediate(false)
//! .build()
//! .unwrap();
//!
//! orders.execute().await;
//!
//! assert!(!orders.is_loading());
//! assert_eq!(orders.data(), Some(vec![12.5, 40.0]));
//! assert!(orders.error().is_none());
//! # });
//! ```
//!
//! ## Retrying
//!
//! ```rust,no_run
//! use fetchguard_rs::{ApiResponse, RetryFetch, RetryPolicy};
//! use std::time::Duration;
//!
//! # async fn demo() {
//! let revenue = RetryFetch::new(
//!     || async { Ok::<_, std::io::Error>(ApiResponse::ok(1_250_u64)) },
//!     RetryPolicy::new(3, Duration::from_millis(1000)),
//! )
//! .unwrap();
//!
//! let mut updates = revenue.subscribe();
//! updates.wait_for(|state| !state.loading).await.unwrap();
//! println!("revenue={:?} retries={}", revenue.data(), revenue.retry_count());
//! # }
//! ```
//!
//! ## Features
//!
//! - `prometheus` - Prometheus metrics sink

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod boundary;
mod config;
mod error;
mod fetch;
mod hook;
mod metrics;
mod panic;
mod policy;
pub mod prelude;
mod response;
mod retry;
mod settings;
mod state;

// Re-exports
pub use boundary::{
    with_boundary, Bounded, BoundaryState, ErrorBoundary, RecoveryAction, RecoveryView, Rendered,
    RECOVERY_MESSAGE, RECOVERY_TITLE,
};
pub use config::FetchBuilder;
pub use error::{
    BuildError, ErrorCode, ErrorInfo, FetchResult, DEFAULT_API_ERROR_MESSAGE,
    DEFAULT_NETWORK_ERROR_MESSAGE, DEFAULT_RENDER_ERROR_MESSAGE,
};
pub use fetch::{FetchState, Producer};
pub use hook::HookRegistry;
#[cfg(feature = "prometheus")]
pub use metrics::PrometheusSink;
pub use metrics::{FetchStats, MetricSink, NullMetricSink, Outcome};
pub use policy::{RetryPolicy, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY};
pub use response::{ApiResponse, MISSING_DATA_MESSAGE};
pub use retry::{RetryFetch, RetryState};
pub use settings::{
    ApiConfig, Environment, ENV_API_URL, ENV_ENVIRONMENT, ENV_RETRY_ATTEMPTS, ENV_RETRY_DELAY_MS,
    ENV_TIMEOUT_MS,
};
pub use state::{Phase, RequestState};
