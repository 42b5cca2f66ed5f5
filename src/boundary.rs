//! Fault containment boundary.
//!
//! An [`ErrorBoundary`] owns the construction of a child view. A panic raised
//! while the child is being built trips the boundary. From then on it renders
//! a fallback until a [`RecoveryAction::TryAgain`] clears it.
//!
//! Only panics raised synchronously inside [`ErrorBoundary::render`] are
//! contained. Failures in spawned tasks, timers or other threads are not seen
//! here; surface those through [`FetchState::error`](crate::FetchState::error).

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::json;

use crate::error::{ErrorInfo, DEFAULT_RENDER_ERROR_MESSAGE};
use crate::hook::ErrorHook;
use crate::metrics::{MetricSink, NullMetricSink};
use crate::panic::{self as capture, Scope};
use crate::settings::ApiConfig;

/// Title of the default recovery view.
pub const RECOVERY_TITLE: &str = "Something went wrong";

/// Body of the default recovery view.
pub const RECOVERY_MESSAGE: &str = "Something unexpected happened. Try again, or refresh to restart \
     the page. Contact support if the problem persists.";

type FallbackFn<V> = Box<dyn Fn(&ErrorInfo) -> V + Send + Sync + 'static>;
type RefreshHook = Arc<dyn Fn() + Send + Sync + 'static>;

/// Whether a boundary is showing its child or its fallback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryState {
    tripped: bool,
    last_error: Option<ErrorInfo>,
}

impl BoundaryState {
    /// True while the fallback is shown.
    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    /// Record of the panic that tripped the boundary.
    pub fn last_error(&self) -> Option<&ErrorInfo> {
        self.last_error.as_ref()
    }
}

/// Actions offered by the default recovery view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Clear the boundary and render the child again.
    TryAgain,

    /// Restart the host page or process.
    Refresh,
}

/// The view rendered when no custom fallback is configured.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryView {
    /// Heading.
    pub title: &'static str,
    /// Explanation shown to the user.
    pub message: &'static str,
    /// The contained error, present only when details are enabled.
    pub details: Option<ErrorInfo>,
    /// Available actions, in display order.
    pub actions: [RecoveryAction; 2],
}

/// Result of rendering through a boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered<V> {
    /// The child rendered normally.
    Content(V),

    /// The boundary is tripped and a custom fallback was rendered.
    Fallback(V),

    /// The boundary is tripped and the default recovery view applies.
    Recovery(RecoveryView),
}

impl<V> Rendered<V> {
    /// The child's output, if it rendered.
    pub fn content(self) -> Option<V> {
        match self {
            Rendered::Content(view) => Some(view),
            _ => None,
        }
    }

    /// Whether a fallback of either kind was rendered.
    pub fn is_fallback(&self) -> bool {
        !matches!(self, Rendered::Content(_))
    }
}

/// Supervises the construction of a child view and contains its panics.
pub struct ErrorBoundary<V> {
    name: String,
    state: BoundaryState,
    fallback: Option<FallbackFn<V>>,
    on_error: Option<ErrorHook>,
    on_refresh: Option<RefreshHook>,
    show_details: Option<bool>,
    metric_sink: Arc<dyn MetricSink>,
}

impl<V> ErrorBoundary<V> {
    /// Creates a clear boundary labelled `name`.
    ///
    /// Unless [`show_details`](Self::show_details) is set, the default view
    /// carries error details only when [`ApiConfig::global`] names the
    /// development environment. That is checked when the view is built, so a
    /// config installed after construction still applies.
    pub fn new(name: impl Into<String>) -> Self {
        capture::install();
        Self {
            name: name.into(),
            state: BoundaryState::default(),
            fallback: None,
            on_error: None,
            on_refresh: None,
            show_details: None,
            metric_sink: Arc::new(NullMetricSink),
        }
    }

    /// Renders `fallback` instead of the default recovery view.
    pub fn fallback<F>(mut self, fallback: F) -> Self
    where
        F: Fn(&ErrorInfo) -> V + Send + Sync + 'static,
    {
        self.fallback = Some(Box::new(fallback));
        self
    }

    /// Sets the sink receiving the record of each trip.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&ErrorInfo) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Sets the host capability invoked by [`RecoveryAction::Refresh`].
    pub fn on_refresh<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_refresh = Some(Arc::new(f));
        self
    }

    /// Sets whether the default view carries the error record.
    pub fn show_details(mut self, show: bool) -> Self {
        self.show_details = Some(show);
        self
    }

    /// Sets a metric sink.
    pub fn metric_sink<M: MetricSink>(mut self, sink: M) -> Self {
        self.metric_sink = Arc::new(sink);
        self
    }

    /// Label used in logs, metrics and component stacks.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state.
    pub fn state(&self) -> &BoundaryState {
        &self.state
    }

    /// True while the fallback is shown.
    pub fn is_tripped(&self) -> bool {
        self.state.tripped
    }

    /// Record of the panic that tripped the boundary.
    pub fn last_error(&self) -> Option<&ErrorInfo> {
        self.state.last_error.as_ref()
    }

    /// Builds the child, or the fallback if the boundary is tripped or the
    /// child panics.
    pub fn render<F>(&mut self, child: F) -> Rendered<V>
    where
        F: FnOnce() -> V,
    {
        if self.state.tripped {
            return self.fallback_view();
        }

        let (result, component_stack) = {
            let _scope = Scope::enter(&self.name);
            capture::take_captured();
            let result = panic::catch_unwind(AssertUnwindSafe(child));
            let stack = result.is_err().then(capture::component_stack);
            (result, stack)
        };

        match result {
            Ok(view) => Rendered::Content(view),
            Err(payload) => {
                let error = self.contained_error(&*payload, component_stack.unwrap_or_default());
                self.trip(error);
                self.fallback_view()
            }
        }
    }

    /// Applies a recovery action from the fallback view.
    pub fn handle(&mut self, action: RecoveryAction) {
        match action {
            RecoveryAction::TryAgain => self.reset(),
            RecoveryAction::Refresh => match &self.on_refresh {
                Some(refresh) => {
                    tracing::info!(boundary = %self.name, "refresh requested");
                    refresh();
                }
                None => {
                    tracing::warn!(boundary = %self.name, "refresh requested but no refresh handler is set");
                }
            },
        }
    }

    /// Clears the boundary so the next render builds the child again.
    pub fn reset(&mut self) {
        if self.state.tripped {
            tracing::debug!(boundary = %self.name, "boundary cleared");
        }
        self.state = BoundaryState::default();
    }

    fn contained_error(&self, payload: &(dyn std::any::Any + Send), component_stack: String) -> ErrorInfo {
        let record = capture::take_captured();

        let mut message = record
            .as_ref()
            .map(|r| r.message.clone())
            .unwrap_or_else(|| capture::payload_message(payload));
        if message.is_empty() {
            message = DEFAULT_RENDER_ERROR_MESSAGE.to_string();
        }

        let details = json!({
            "name": "panic",
            "stack": record.as_ref().map(|r| r.backtrace.clone()),
            "location": record.as_ref().and_then(|r| r.location.clone()),
            "componentStack": component_stack,
        });

        ErrorInfo::render(message, details)
    }

    fn trip(&mut self, error: ErrorInfo) {
        tracing::error!(
            boundary = %self.name,
            message = error.message(),
            location = error.details()["location"].as_str().unwrap_or("unknown"),
            "render panicked, showing fallback"
        );

        self.metric_sink.record_boundary_trip(&self.name);
        if let Some(hook) = &self.on_error {
            hook(&error);
        }

        self.state = BoundaryState {
            tripped: true,
            last_error: Some(error),
        };
    }

    fn details_enabled(&self) -> bool {
        self.show_details
            .unwrap_or_else(|| ApiConfig::global().environment().is_development())
    }

    fn fallback_view(&self) -> Rendered<V> {
        let error = self.state.last_error.as_ref();

        match (&self.fallback, error) {
            (Some(fallback), Some(error)) => Rendered::Fallback(fallback(error)),
            _ => Rendered::Recovery(RecoveryView {
                title: RECOVERY_TITLE,
                message: RECOVERY_MESSAGE,
                details: error.filter(|_| self.details_enabled()).cloned(),
                actions: [RecoveryAction::TryAgain, RecoveryAction::Refresh],
            }),
        }
    }
}

/// A component permanently wrapped in its own boundary.
pub struct Bounded<C, V> {
    component: C,
    boundary: ErrorBoundary<V>,
}

/// Wraps `component` so every render goes through `boundary`.
pub fn with_boundary<C, V>(component: C, boundary: ErrorBoundary<V>) -> Bounded<C, V>
where
    C: FnMut() -> V,
{
    Bounded {
        component,
        boundary,
    }
}

impl<C, V> Bounded<C, V>
where
    C: FnMut() -> V,
{
    /// Renders the wrapped component.
    pub fn render(&mut self) -> Rendered<V> {
        let component = &mut self.component;
        self.boundary.render(component)
    }

    /// The wrapping boundary.
    pub fn boundary(&self) -> &ErrorBoundary<V> {
        &self.boundary
    }

    /// Mutable access to the wrapping boundary, e.g. to handle recovery actions.
    pub fn boundary_mut(&mut self) -> &mut ErrorBoundary<V> {
        &mut self.boundary
    }
}
