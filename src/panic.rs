//! Panic capture for boundaries.
//!
//! A process-wide hook is chained in front of whatever hook was installed
//! before. While a boundary is rendering on the current thread the hook stores
//! the panic's message, location and backtrace for the boundary to pick up and
//! stays silent. Everywhere else it defers to the previous hook.

use once_cell::sync::OnceCell;
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;

static HOOK: OnceCell<()> = OnceCell::new();

thread_local! {
    static SCOPES: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    static CAPTURED: RefCell<Option<PanicRecord>> = const { RefCell::new(None) };
}

/// What the hook saw of a contained panic.
#[derive(Debug, Clone)]
pub(crate) struct PanicRecord {
    pub(crate) message: String,
    pub(crate) location: Option<String>,
    pub(crate) backtrace: String,
}

/// Installs the capturing hook once per process.
pub(crate) fn install() {
    HOOK.get_or_init(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let contained = SCOPES
                .try_with(|scopes| !scopes.borrow().is_empty())
                .unwrap_or(false);

            if !contained {
                previous(info);
                return;
            }

            let record = PanicRecord {
                message: payload_message(info.payload()),
                location: info.location().map(|l| l.to_string()),
                backtrace: Backtrace::capture().to_string(),
            };
            let _ = CAPTURED.try_with(|slot| *slot.borrow_mut() = Some(record));
        }));
    });
}

/// Marks the current thread as rendering inside boundary `name` until dropped.
pub(crate) struct Scope(());

impl Scope {
    pub(crate) fn enter(name: &str) -> Self {
        SCOPES.with(|scopes| scopes.borrow_mut().push(name.to_string()));
        Scope(())
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        let _ = SCOPES.try_with(|scopes| scopes.borrow_mut().pop());
    }
}

/// Names of the boundaries currently rendering on this thread, innermost first.
pub(crate) fn component_stack() -> String {
    SCOPES
        .try_with(|scopes| {
            scopes
                .borrow()
                .iter()
                .rev()
                .map(|name| format!("in {name}"))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

/// Takes the record left by the most recent contained panic on this thread.
pub(crate) fn take_captured() -> Option<PanicRecord> {
    CAPTURED
        .try_with(|slot| slot.borrow_mut().take())
        .ok()
        .flatten()
}

/// Best-effort text of a panic payload.
pub(crate) fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_message_reads_str_and_string() {
        let literal: Box<dyn Any + Send> = Box::new("static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let other: Box<dyn Any + Send> = Box::new(42_u8);

        assert_eq!(payload_message(&*literal), "static");
        assert_eq!(payload_message(&*owned), "owned");
        assert_eq!(payload_message(&*other), "");
    }

    #[test]
    fn scopes_nest_innermost_first() {
        let _outer = Scope::enter("dashboard");
        {
            let _inner = Scope::enter("orders-panel");
            assert_eq!(component_stack(), "in orders-panel\nin dashboard");
        }
        assert_eq!(component_stack(), "in dashboard");
    }
}
