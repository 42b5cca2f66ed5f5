//! Fetch state machine.

use std::error::Error;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::json;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::FetchBuilder;
use crate::error::{ErrorCode, ErrorInfo, DEFAULT_NETWORK_ERROR_MESSAGE};
use crate::hook::HookRegistry;
use crate::metrics::{FetchStats, MetricSink, Outcome};
use crate::panic::payload_message;
use crate::response::ApiResponse;
use crate::state::{Phase, RequestState, StateCell};

/// A zero-argument asynchronous operation yielding an [`ApiResponse`] or failing.
///
/// Implemented for every `Fn() -> impl Future<Output = Result<ApiResponse<T>, E>>`.
pub trait Producer<T, E>: Send + Sync + 'static {
    /// Starts one invocation.
    fn produce(&self) -> BoxFuture<'static, Result<ApiResponse<T>, E>>;
}

impl<T, E, F, Fut> Producer<T, E> for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ApiResponse<T>, E>> + Send + 'static,
{
    fn produce(&self) -> BoxFuture<'static, Result<ApiResponse<T>, E>> {
        Box::pin(self())
    }
}

/// State shared by every handle and in-flight execution.
pub(crate) struct FetchInner<T, E> {
    name: String,
    producer: Arc<dyn Producer<T, E>>,
    state: StateCell<T>,
    hooks: Arc<HookRegistry<T>>,
    stats: FetchStats,
    metric_sink: Arc<dyn MetricSink>,
    discard_superseded: bool,
    runtime: Handle,
}

/// Retires the shared state once the last handle is gone.
struct Owner<T, E> {
    inner: Arc<FetchInner<T, E>>,
}

impl<T, E> Drop for Owner<T, E> {
    fn drop(&mut self) {
        self.inner.state.retire();
    }
}

/// Observable lifecycle of one asynchronous operation.
///
/// Cloning is cheap and every clone observes and drives the same state. When
/// the last clone is dropped, executions still in flight finish silently
/// without touching state or firing hooks.
pub struct FetchState<T, E> {
    owner: Arc<Owner<T, E>>,
}

impl<T, E> Clone for FetchState<T, E> {
    fn clone(&self) -> Self {
        Self {
            owner: Arc::clone(&self.owner),
        }
    }
}

impl<T, E> FetchState<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Error + Send + 'static,
{
    /// Creates a new builder around `producer`.
    pub fn builder<P>(producer: P) -> FetchBuilder<T, E>
    where
        P: Producer<T, E>,
    {
        FetchBuilder::new(producer)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        producer: Arc<dyn Producer<T, E>>,
        immediate: bool,
        hooks: Arc<HookRegistry<T>>,
        metric_sink: Arc<dyn MetricSink>,
        discard_superseded: bool,
        runtime: Handle,
    ) -> Self {
        let inner = FetchInner {
            name,
            producer,
            state: StateCell::new(immediate),
            hooks,
            stats: FetchStats::new(),
            metric_sink,
            discard_superseded,
            runtime,
        };

        let fetch = Self {
            owner: Arc::new(Owner {
                inner: Arc::new(inner),
            }),
        };

        if immediate {
            drop(fetch.refetch());
        }

        fetch
    }

    fn inner(&self) -> &Arc<FetchInner<T, E>> {
        &self.owner.inner
    }

    /// Label used in logs and metrics.
    pub fn name(&self) -> &str {
        &self.inner().name
    }

    /// Runs the producer once and records the outcome.
    ///
    /// Never fails: producer errors and panics end up in [`error`](Self::error).
    ///
    /// Overlapping calls are not serialized. Unless the handle was built with
    /// [`discard_superseded`](FetchBuilder::discard_superseded), each call
    /// writes its own result and clears `loading` when it finishes, even if
    /// another call is still in flight.
    pub async fn execute(&self) {
        run(Arc::clone(self.inner())).await
    }

    /// Starts [`execute`](Self::execute) on the runtime captured at build time.
    ///
    /// The returned handle may be awaited or dropped.
    pub fn refetch(&self) -> JoinHandle<()> {
        let inner = Arc::clone(self.inner());
        self.inner().runtime.spawn(run(inner))
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> RequestState<T> {
        self.inner().state.with(RequestState::clone)
    }

    /// Last successful payload.
    pub fn data(&self) -> Option<T> {
        self.inner().state.with(|s| s.data.clone())
    }

    /// Whether an execution is outstanding.
    pub fn is_loading(&self) -> bool {
        self.inner().state.with(|s| s.loading)
    }

    /// Failure from the most recent completed execution.
    pub fn error(&self) -> Option<ErrorInfo> {
        self.inner().state.with(|s| s.error.clone())
    }

    /// The derived lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.inner().state.with(RequestState::phase)
    }

    /// A receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<RequestState<T>> {
        self.inner().state.subscribe()
    }

    /// Execution counters for this handle.
    pub fn stats(&self) -> &FetchStats {
        &self.inner().stats
    }
}

async fn run<T, E>(inner: Arc<FetchInner<T, E>>)
where
    T: Clone + Send + Sync + 'static,
    E: Error + Send + 'static,
{
    let ticket = inner.state.begin();
    let discard = inner.discard_superseded;
    let _finish = scopeguard::guard(ticket, |ticket| inner.state.finish(ticket, discard));

    tracing::debug!(fetch = %inner.name, ticket, "execution started");

    let start = Instant::now();
    // The call itself sits inside the guarded future so that producers which
    // panic before returning a future are contained too.
    let outcome = AssertUnwindSafe(async { inner.producer.produce().await })
        .catch_unwind()
        .await;
    let elapsed = start.elapsed();

    let result = match outcome {
        Ok(Ok(response)) => response.into_payload(),
        Ok(Err(err)) => Err(network_error(&err)),
        Err(payload) => Err(panic_error(&*payload)),
    };

    match result {
        Ok(data) => complete_success(&inner, ticket, data, elapsed),
        Err(error) => complete_failure(&inner, ticket, error, elapsed),
    }
}

fn complete_success<T, E>(inner: &FetchInner<T, E>, ticket: u64, data: T, elapsed: Duration)
where
    T: Clone,
{
    inner.stats.record(Outcome::Success);
    inner.metric_sink.record_attempt(Outcome::Success, elapsed);

    if !inner.state.accepts(ticket, inner.discard_superseded) {
        inner.stats.record_discard();
        tracing::debug!(fetch = %inner.name, ticket, "discarding result of retired or superseded execution");
        return;
    }

    tracing::debug!(fetch = %inner.name, ticket, elapsed_ms = elapsed.as_millis() as u64, "execution succeeded");
    inner.state.set_data(data.clone());
    inner.hooks.execute_success_hook(&data);
}

fn complete_failure<T, E>(inner: &FetchInner<T, E>, ticket: u64, error: ErrorInfo, elapsed: Duration) {
    let outcome = match error.code() {
        ErrorCode::Api => Outcome::ApiError,
        _ => Outcome::NetworkError,
    };
    inner.stats.record(outcome);
    inner.metric_sink.record_attempt(outcome, elapsed);

    if !inner.state.accepts(ticket, inner.discard_superseded) {
        inner.stats.record_discard();
        tracing::debug!(fetch = %inner.name, ticket, "discarding failure of retired or superseded execution");
        return;
    }

    tracing::warn!(
        fetch = %inner.name,
        ticket,
        code = %error.code(),
        message = error.message(),
        "execution failed"
    );
    inner.state.set_error(error.clone());
    inner.hooks.execute_error_hook(&error);
}

fn network_error<E: Error>(err: &E) -> ErrorInfo {
    let mut message = err.to_string();
    if message.is_empty() {
        message = DEFAULT_NETWORK_ERROR_MESSAGE.to_string();
    }
    ErrorInfo::network(message, json!({ "originalError": format!("{err:?}") }))
}

fn panic_error(payload: &(dyn std::any::Any + Send)) -> ErrorInfo {
    let mut message = payload_message(payload);
    if message.is_empty() {
        message = DEFAULT_NETWORK_ERROR_MESSAGE.to_string();
    }
    ErrorInfo::network(message, json!({ "originalError": "panic" }))
}
