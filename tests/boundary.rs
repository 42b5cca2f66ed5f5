use chrono::DateTime;
use fetchguard_rs::{
    with_boundary, ErrorBoundary, ErrorCode, ErrorInfo, MetricSink, Outcome, RecoveryAction,
    Rendered, RECOVERY_TITLE,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn exploding() -> String {
    panic!("chart data was empty")
}

#[test]
fn test_panicking_child_trips_boundary() {
    let mut boundary = ErrorBoundary::<String>::new("revenue-chart").show_details(true);

    let rendered = boundary.render(exploding);

    assert!(boundary.is_tripped());
    match rendered {
        Rendered::Recovery(view) => {
            assert_eq!(view.title, RECOVERY_TITLE);
            assert_eq!(view.actions, [RecoveryAction::TryAgain, RecoveryAction::Refresh]);
            let details = view.details.expect("details enabled");
            assert_eq!(details.code(), &ErrorCode::Render);
            assert_eq!(details.message(), "chart data was empty");
        }
        other => panic!("expected recovery view, got {other:?}"),
    }
}

#[test]
fn test_clean_render_passes_content_through() {
    let mut boundary = ErrorBoundary::<&str>::new("header");

    let rendered = boundary.render(|| "Dashboard");

    assert_eq!(rendered, Rendered::Content("Dashboard"));
    assert!(!boundary.is_tripped());
    assert!(boundary.last_error().is_none());
}

#[test]
fn test_on_error_fires_once_with_timestamped_record() {
    let seen = Arc::new(Mutex::new(Vec::<ErrorInfo>::new()));
    let sink = Arc::clone(&seen);

    let mut boundary =
        ErrorBoundary::<String>::new("orders-table").on_error(move |error| sink.lock().push(error.clone()));

    boundary.render(exploding);
    boundary.render(exploding);

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);

    let error = &seen[0];
    assert_eq!(error.code().as_str(), "REACT_ERROR");
    assert!(!error.message().is_empty());
    assert!(DateTime::parse_from_rfc3339(&error.timestamp_iso()).is_ok());
    assert!(error.details()["componentStack"]
        .as_str()
        .unwrap()
        .contains("in orders-table"));
    assert!(error.details()["location"]
        .as_str()
        .unwrap()
        .contains("boundary.rs"));
}

#[test]
fn test_tripped_boundary_does_not_build_child() {
    let builds = Arc::new(AtomicUsize::new(0));
    let mut boundary = ErrorBoundary::<u32>::new("kpi");

    boundary.render(|| panic!("first"));

    let counter = Arc::clone(&builds);
    let rendered = boundary.render(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        7
    });

    assert!(rendered.is_fallback());
    assert_eq!(builds.load(Ordering::SeqCst), 0);
}

#[test]
fn test_try_again_renders_child_again() {
    let mut boundary = ErrorBoundary::<&str>::new("menu");

    boundary.render(|| panic!("transient"));
    assert!(boundary.is_tripped());

    boundary.handle(RecoveryAction::TryAgain);
    assert!(!boundary.is_tripped());
    assert!(boundary.last_error().is_none());

    assert_eq!(boundary.render(|| "menu items"), Rendered::Content("menu items"));
}

#[test]
fn test_child_panicking_again_after_reset_trips_again() {
    let trips = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&trips);
    let mut boundary = ErrorBoundary::<String>::new("staff").on_error(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    boundary.render(exploding);
    boundary.handle(RecoveryAction::TryAgain);
    boundary.render(exploding);

    assert!(boundary.is_tripped());
    assert_eq!(trips.load(Ordering::SeqCst), 2);
}

#[test]
fn test_custom_fallback_receives_error() {
    let mut boundary = ErrorBoundary::<String>::new("inventory")
        .fallback(|error| format!("inventory unavailable: {}", error.message()));

    let rendered = boundary.render(exploding);

    assert_eq!(
        rendered,
        Rendered::Fallback("inventory unavailable: chart data was empty".to_string())
    );
}

#[test]
fn test_refresh_invokes_host_handler() {
    let refreshes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&refreshes);

    let mut boundary = ErrorBoundary::<String>::new("page").on_refresh(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    boundary.render(exploding);
    boundary.handle(RecoveryAction::Refresh);

    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    // Refresh leaves the boundary state to the host.
    assert!(boundary.is_tripped());
}

#[test]
fn test_refresh_without_handler_is_harmless() {
    let mut boundary = ErrorBoundary::<String>::new("page");
    boundary.render(exploding);
    boundary.handle(RecoveryAction::Refresh);
    assert!(boundary.is_tripped());
}

#[test]
fn test_details_hidden_when_disabled() {
    let mut boundary = ErrorBoundary::<String>::new("reports").show_details(false);

    match boundary.render(exploding) {
        Rendered::Recovery(view) => assert!(view.details.is_none()),
        other => panic!("expected recovery view, got {other:?}"),
    }
    assert!(boundary.last_error().is_some());
}

#[test]
fn test_inner_boundary_contains_panic_for_outer() {
    let mut outer = ErrorBoundary::<String>::new("dashboard");
    let mut inner = ErrorBoundary::<String>::new("sales-widget").show_details(true);

    let rendered = outer.render(|| match inner.render(exploding) {
        Rendered::Content(view) => view,
        _ => "widget offline".to_string(),
    });

    assert_eq!(rendered, Rendered::Content("widget offline".to_string()));
    assert!(!outer.is_tripped());
    assert!(inner.is_tripped());

    let stack = inner.last_error().unwrap().details()["componentStack"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(stack, "in sales-widget\nin dashboard");
}

#[test]
fn test_with_boundary_wraps_component() {
    let mut healthy = true;
    let mut widget = with_boundary(
        move || {
            if !healthy {
                panic!("widget broke");
            }
            healthy = false;
            "ok"
        },
        ErrorBoundary::new("widget"),
    );

    assert_eq!(widget.render(), Rendered::Content("ok"));
    assert!(widget.render().is_fallback());
    assert_eq!(widget.boundary().name(), "widget");
    assert_eq!(
        widget.boundary().last_error().map(ErrorInfo::message),
        Some("widget broke")
    );

    widget.boundary_mut().handle(RecoveryAction::TryAgain);
    assert!(!widget.boundary().is_tripped());
}

#[test]
fn test_non_string_payload_uses_default_message() {
    let mut boundary = ErrorBoundary::<()>::new("opaque");

    boundary.render(|| std::panic::panic_any(42_u8));

    assert_eq!(boundary.last_error().unwrap().message(), "Rendering failed");
}

#[derive(Clone, Default)]
struct TripSink {
    trips: Arc<Mutex<Vec<String>>>,
}

impl MetricSink for TripSink {
    fn record_attempt(&self, _outcome: Outcome, _duration: Duration) {}

    fn record_retry(&self, _attempt: u32, _delay: Duration) {}

    fn record_boundary_trip(&self, boundary: &str) {
        self.trips.lock().push(boundary.to_string());
    }
}

#[test]
fn test_metric_sink_counts_trips() {
    let sink = TripSink::default();
    let mut boundary = ErrorBoundary::<String>::new("orders").metric_sink(sink.clone());

    boundary.render(exploding);

    assert_eq!(*sink.trips.lock(), vec!["orders".to_string()]);
}
