//! Configuration for fetch handles.

use std::error::Error;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::error::{BuildError, ErrorInfo, FetchResult};
use crate::fetch::{FetchState, Producer};
use crate::hook::HookRegistry;
use crate::metrics::{MetricSink, NullMetricSink};
use crate::policy::RetryPolicy;
use crate::retry::{RetryFetch, RetryState, Retrying};

struct BuildOptions<T> {
    name: String,
    immediate: bool,
    discard_superseded: bool,
    metric_sink: Arc<dyn MetricSink>,
    hook_registry: Arc<HookRegistry<T>>,
}

/// Builder for [`FetchState`] and [`RetryFetch`] handles.
pub struct FetchBuilder<T, E> {
    producer: Arc<dyn Producer<T, E>>,
    options: BuildOptions<T>,
}

impl<T, E> FetchBuilder<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Error + Send + 'static,
{
    /// Creates a new builder with default settings.
    ///
    /// Defaults: run immediately, no hooks, no metrics, last write wins.
    pub fn new<P>(producer: P) -> Self
    where
        P: Producer<T, E>,
    {
        Self {
            producer: Arc::new(producer),
            options: BuildOptions {
                name: "fetch".to_string(),
                immediate: true,
                discard_superseded: false,
                metric_sink: Arc::new(NullMetricSink),
                hook_registry: Arc::new(HookRegistry::new()),
            },
        }
    }

    /// Sets the label used in logs and metrics.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.options.name = name.into();
        self
    }

    /// Sets whether the producer runs once as soon as the handle is built.
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.options.immediate = immediate;
        self
    }

    /// Drops results of executions that a later `execute` has superseded.
    ///
    /// Off by default, in which case overlapping executions race and the last
    /// to complete wins. In that mode the first execution to finish also
    /// clears `loading` while the others are still running. When enabled,
    /// only the newest execution writes data or error and clears `loading`.
    pub fn discard_superseded(mut self, discard: bool) -> Self {
        self.options.discard_superseded = discard;
        self
    }

    /// Sets the hook called with the payload of each successful execution.
    pub fn on_success<F>(self, f: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.options.hook_registry.set_on_success(f);
        self
    }

    /// Sets the hook called with the record of each failed execution.
    pub fn on_error<F>(self, f: F) -> Self
    where
        F: Fn(&ErrorInfo) + Send + Sync + 'static,
    {
        self.options.hook_registry.set_on_error(f);
        self
    }

    /// Replaces the hook registry, including hooks set through `on_success`
    /// and `on_error` so far.
    pub fn hooks(mut self, hooks: HookRegistry<T>) -> Self {
        self.options.hook_registry = Arc::new(hooks);
        self
    }

    /// Sets a metric sink.
    pub fn metric_sink<M: MetricSink>(mut self, sink: M) -> Self {
        self.options.metric_sink = Arc::new(sink);
        self
    }

    /// Builds a fetch handle.
    ///
    /// Must be called inside a Tokio runtime; the runtime is captured for
    /// [`FetchState::refetch`] and the immediate first run.
    pub fn build(self) -> FetchResult<FetchState<T, E>> {
        let runtime = current_runtime()?;
        Ok(assemble(self.producer, self.options, runtime))
    }

    /// Builds a fetch handle whose producer retries with `policy`.
    pub fn build_with_retry(self, policy: RetryPolicy) -> FetchResult<RetryFetch<T, E>> {
        let runtime = current_runtime()?;
        let retry = Arc::new(RetryState::new());
        let retrying = Retrying::new(
            self.producer,
            policy,
            Arc::clone(&retry),
            Arc::clone(&self.options.hook_registry),
            Arc::clone(&self.options.metric_sink),
            self.options.name.clone(),
        );

        let fetch = assemble(Arc::new(retrying), self.options, runtime);
        Ok(RetryFetch::from_parts(fetch, retry))
    }
}

fn current_runtime() -> Result<Handle, BuildError> {
    Handle::try_current().map_err(|_| BuildError::NoRuntime)
}

fn assemble<T, E>(
    producer: Arc<dyn Producer<T, E>>,
    options: BuildOptions<T>,
    runtime: Handle,
) -> FetchState<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Error + Send + 'static,
{
    FetchState::new(
        options.name,
        producer,
        options.immediate,
        options.hook_registry,
        options.metric_sink,
        options.discard_superseded,
        runtime,
    )
}
