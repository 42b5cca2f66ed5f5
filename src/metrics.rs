//! Execution statistics and metric sinks.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// How a single producer attempt ended, as seen by the fetch state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The producer resolved with data.
    Success,

    /// The producer resolved with a structured failure.
    ApiError,

    /// The producer failed outright or panicked.
    NetworkError,
}

impl Outcome {
    /// A stable lowercase label for this outcome.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::ApiError => "api_error",
            Outcome::NetworkError => "network_error",
        }
    }
}

/// Trait for metrics sinks that can receive fetch, retry and boundary events.
pub trait MetricSink: Send + Sync + 'static {
    /// Records a completed execution.
    fn record_attempt(&self, outcome: Outcome, duration: Duration);

    /// Records a scheduled retry.
    fn record_retry(&self, attempt: u32, delay: Duration);

    /// Records a boundary switching to its fallback.
    fn record_boundary_trip(&self, boundary: &str);
}

/// A null metrics sink that discards all events.
pub struct NullMetricSink;

impl MetricSink for NullMetricSink {
    fn record_attempt(&self, _outcome: Outcome, _duration: Duration) {}
    fn record_retry(&self, _attempt: u32, _delay: Duration) {}
    fn record_boundary_trip(&self, _boundary: &str) {}
}

/// Counters for one fetch handle.
#[derive(Debug)]
pub struct FetchStats {
    executions: AtomicU64,
    successes: AtomicU64,
    api_errors: AtomicU64,
    network_errors: AtomicU64,
    discarded: AtomicU64,
    last_success_time: Mutex<Option<Instant>>,
    last_failure_time: Mutex<Option<Instant>>,
}

impl Default for FetchStats {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchStats {
    /// Creates a new empty stats tracker.
    pub fn new() -> Self {
        Self {
            executions: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            api_errors: AtomicU64::new(0),
            network_errors: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            last_success_time: Mutex::new(None),
            last_failure_time: Mutex::new(None),
        }
    }

    /// Number of completed executions.
    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    /// Number of executions that produced data.
    pub fn successes(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    /// Number of executions that ended with `API_ERROR`.
    pub fn api_errors(&self) -> u64 {
        self.api_errors.load(Ordering::Relaxed)
    }

    /// Number of executions that ended with `NETWORK_ERROR`.
    pub fn network_errors(&self) -> u64 {
        self.network_errors.load(Ordering::Relaxed)
    }

    /// Number of results dropped because the owner was gone or the execution was superseded.
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    /// When the last successful execution completed.
    pub fn last_success_time(&self) -> Option<Instant> {
        *self.last_success_time.lock()
    }

    /// When the last failed execution completed.
    pub fn last_failure_time(&self) -> Option<Instant> {
        *self.last_failure_time.lock()
    }

    /// Records the outcome of a completed execution.
    pub fn record(&self, outcome: Outcome) {
        self.executions.fetch_add(1, Ordering::Relaxed);
        match outcome {
            Outcome::Success => {
                self.successes.fetch_add(1, Ordering::Relaxed);
                *self.last_success_time.lock() = Some(Instant::now());
            }
            Outcome::ApiError => {
                self.api_errors.fetch_add(1, Ordering::Relaxed);
                *self.last_failure_time.lock() = Some(Instant::now());
            }
            Outcome::NetworkError => {
                self.network_errors.fetch_add(1, Ordering::Relaxed);
                *self.last_failure_time.lock() = Some(Instant::now());
            }
        }
    }

    pub(crate) fn record_discard(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Fraction of executions that failed.
    pub fn error_rate(&self) -> f64 {
        let total = self.executions();
        if total == 0 {
            return 0.0;
        }

        (self.api_errors() + self.network_errors()) as f64 / total as f64
    }

    /// Resets all statistics.
    pub fn reset(&self) {
        self.executions.store(0, Ordering::Relaxed);
        self.successes.store(0, Ordering::Relaxed);
        self.api_errors.store(0, Ordering::Relaxed);
        self.network_errors.store(0, Ordering::Relaxed);
        self.discarded.store(0, Ordering::Relaxed);
        *self.last_success_time.lock() = None;
        *self.last_failure_time.lock() = None;
    }
}

#[cfg(feature = "prometheus")]
pub use self::prometheus::PrometheusSink;

#[cfg(feature = "prometheus")]
mod prometheus {
    use super::{MetricSink, Outcome};
    use prometheus_client::encoding::EncodeLabelSet;
    use prometheus_client::metrics::counter::Counter;
    use prometheus_client::metrics::family::Family;
    use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
    use prometheus_client::registry::Registry;
    use std::time::Duration;

    #[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
    struct OutcomeLabels {
        outcome: String,
    }

    #[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
    struct BoundaryLabels {
        boundary: String,
    }

    /// A metric sink backed by a Prometheus registry.
    ///
    /// Clones share the same metrics, so one sink can serve several fetch
    /// handles and boundaries.
    #[cfg_attr(docsrs, doc(cfg(feature = "prometheus")))]
    #[derive(Clone)]
    pub struct PrometheusSink {
        attempts: Family<OutcomeLabels, Counter>,
        attempt_duration: Histogram,
        retries: Counter,
        retry_delay: Histogram,
        boundary_trips: Family<BoundaryLabels, Counter>,
    }

    impl PrometheusSink {
        /// Creates the sink and registers its metrics in `registry`.
        pub fn new(registry: &mut Registry) -> Self {
            let sink = Self {
                attempts: Family::default(),
                attempt_duration: Histogram::new(exponential_buckets(0.005, 2.0, 14)),
                retries: Counter::default(),
                retry_delay: Histogram::new(exponential_buckets(0.1, 2.0, 10)),
                boundary_trips: Family::default(),
            };

            registry.register(
                "fetchguard_executions",
                "Completed fetch executions by outcome",
                sink.attempts.clone(),
            );
            registry.register(
                "fetchguard_execution_seconds",
                "Wall time of fetch executions",
                sink.attempt_duration.clone(),
            );
            registry.register(
                "fetchguard_retries",
                "Retries scheduled after a failed attempt",
                sink.retries.clone(),
            );
            registry.register(
                "fetchguard_retry_delay_seconds",
                "Backoff delay scheduled before a retry",
                sink.retry_delay.clone(),
            );
            registry.register(
                "fetchguard_boundary_trips",
                "Panics contained by error boundaries",
                sink.boundary_trips.clone(),
            );

            sink
        }
    }

    impl MetricSink for PrometheusSink {
        fn record_attempt(&self, outcome: Outcome, duration: Duration) {
            self.attempts
                .get_or_create(&OutcomeLabels {
                    outcome: outcome.as_str().to_string(),
                })
                .inc();
            self.attempt_duration.observe(duration.as_secs_f64());
        }

        fn record_retry(&self, _attempt: u32, delay: Duration) {
            self.retries.inc();
            self.retry_delay.observe(delay.as_secs_f64());
        }

        fn record_boundary_trip(&self, boundary: &str) {
            self.boundary_trips
                .get_or_create(&BoundaryLabels {
                    boundary: boundary.to_string(),
                })
                .inc();
        }
    }
}
