//! Retry decorator with linear backoff.

use std::error::Error;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use smallvec::SmallVec;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::FetchBuilder;
use crate::error::{ErrorInfo, FetchResult};
use crate::fetch::{FetchState, Producer};
use crate::hook::HookRegistry;
use crate::metrics::MetricSink;
use crate::policy::RetryPolicy;
use crate::response::ApiResponse;
use crate::state::{Phase, RequestState};

/// Attempt bookkeeping for one retrying producer.
#[derive(Debug, Default)]
pub struct RetryState {
    attempt_count: AtomicU32,
    delays: Mutex<SmallVec<[Duration; 8]>>,
}

impl RetryState {
    /// Creates a new state with no attempts recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// 1-based number of the last failed attempt that was followed by a retry.
    ///
    /// Zero after any successful completion. Left in place when retries run out.
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count.load(Ordering::Acquire)
    }

    /// Backoff delays scheduled during the most recent retry sequence.
    pub fn last_delays(&self) -> Vec<Duration> {
        self.delays.lock().to_vec()
    }

    fn begin_sequence(&self) {
        self.delays.lock().clear();
    }

    fn record_retry(&self, attempt: u32, delay: Duration) {
        self.attempt_count.store(attempt, Ordering::Release);
        self.delays.lock().push(delay);
    }

    fn reset(&self) {
        self.attempt_count.store(0, Ordering::Release);
    }
}

/// A producer that retries its inner producer on failure.
///
/// Only outright failures (`Err`) are retried. A structured `success: false`
/// response counts as a completed call and is returned as is.
pub struct Retrying<T, E> {
    producer: Arc<dyn Producer<T, E>>,
    policy: RetryPolicy,
    state: Arc<RetryState>,
    hooks: Arc<HookRegistry<T>>,
    metric_sink: Arc<dyn MetricSink>,
    name: Arc<str>,
}

impl<T, E> Retrying<T, E> {
    pub(crate) fn new(
        producer: Arc<dyn Producer<T, E>>,
        policy: RetryPolicy,
        state: Arc<RetryState>,
        hooks: Arc<HookRegistry<T>>,
        metric_sink: Arc<dyn MetricSink>,
        name: String,
    ) -> Self {
        Self {
            producer,
            policy,
            state,
            hooks,
            metric_sink,
            name: name.into(),
        }
    }
}

impl<T, E> Producer<T, E> for Retrying<T, E>
where
    T: Send + 'static,
    E: Error + Send + 'static,
{
    fn produce(&self) -> BoxFuture<'static, Result<ApiResponse<T>, E>> {
        let producer = Arc::clone(&self.producer);
        let policy = self.policy;
        let state = Arc::clone(&self.state);
        let hooks = Arc::clone(&self.hooks);
        let sink = Arc::clone(&self.metric_sink);
        let name = Arc::clone(&self.name);

        Box::pin(async move {
            state.begin_sequence();
            let mut attempt = 0u32;

            loop {
                let err = match producer.produce().await {
                    Ok(response) => {
                        state.reset();
                        return Ok(response);
                    }
                    Err(err) => err,
                };
                attempt += 1;

                let Some(delay) = policy.delay_for_attempt(attempt) else {
                    tracing::debug!(fetch = %name, attempts = attempt, "retries exhausted");
                    return Err(err);
                };

                tracing::warn!(
                    fetch = %name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "attempt failed, retrying"
                );

                state.record_retry(attempt, delay);
                hooks.execute_retry_hook(attempt, delay);
                sink.record_retry(attempt, delay);

                tokio::time::sleep(delay).await;
            }
        })
    }
}

/// A fetch handle whose producer retries with linear backoff.
///
/// Exposes the same state as [`FetchState`] plus [`retry_count`](Self::retry_count).
pub struct RetryFetch<T, E> {
    fetch: FetchState<T, E>,
    retry: Arc<RetryState>,
}

impl<T, E> Clone for RetryFetch<T, E> {
    fn clone(&self) -> Self {
        Self {
            fetch: self.fetch.clone(),
            retry: Arc::clone(&self.retry),
        }
    }
}

impl<T, E> RetryFetch<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Error + Send + 'static,
{
    /// Builds a retrying handle with default options that runs immediately.
    pub fn new<P>(producer: P, policy: RetryPolicy) -> FetchResult<Self>
    where
        P: Producer<T, E>,
    {
        FetchBuilder::new(producer).build_with_retry(policy)
    }

    pub(crate) fn from_parts(fetch: FetchState<T, E>, retry: Arc<RetryState>) -> Self {
        Self { fetch, retry }
    }

    /// The underlying fetch handle.
    pub fn fetch(&self) -> &FetchState<T, E> {
        &self.fetch
    }

    /// The retry bookkeeping shared with the producer.
    pub fn retry_state(&self) -> &RetryState {
        &self.retry
    }

    /// Current attempt count of the retry decorator.
    pub fn retry_count(&self) -> u32 {
        self.retry.attempt_count()
    }

    /// Runs the retrying producer once and records the outcome.
    pub async fn execute(&self) {
        self.fetch.execute().await
    }

    /// Starts [`execute`](Self::execute) in the background.
    pub fn refetch(&self) -> JoinHandle<()> {
        self.fetch.refetch()
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> RequestState<T> {
        self.fetch.snapshot()
    }

    /// Last successful payload.
    pub fn data(&self) -> Option<T> {
        self.fetch.data()
    }

    /// Whether an execution, retries included, is outstanding.
    pub fn is_loading(&self) -> bool {
        self.fetch.is_loading()
    }

    /// Failure from the most recent completed execution.
    pub fn error(&self) -> Option<ErrorInfo> {
        self.fetch.error()
    }

    /// The derived lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.fetch.phase()
    }

    /// A receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<RequestState<T>> {
        self.fetch.subscribe()
    }
}
