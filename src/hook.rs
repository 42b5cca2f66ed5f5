//! Hook registry for fetch and retry events.

use crate::error::ErrorInfo;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

type SuccessHook<T> = Arc<dyn Fn(&T) + Send + Sync + 'static>;
pub(crate) type ErrorHook = Arc<dyn Fn(&ErrorInfo) + Send + Sync + 'static>;
type RetryHook = Arc<dyn Fn(u32, Duration) + Send + Sync + 'static>;

/// Callbacks fired as executions complete or retry.
///
/// Hooks are best-effort. A panic inside a hook is not caught.
pub struct HookRegistry<T> {
    on_success: RwLock<Option<SuccessHook<T>>>,
    on_error: RwLock<Option<ErrorHook>>,
    on_retry: RwLock<Option<RetryHook>>,
}

impl<T> Default for HookRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HookRegistry<T> {
    /// Creates a new empty hook registry.
    pub fn new() -> Self {
        Self {
            on_success: RwLock::new(None),
            on_error: RwLock::new(None),
            on_retry: RwLock::new(None),
        }
    }

    /// Sets the hook called with the payload of each successful execution.
    pub fn set_on_success<F>(&self, f: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        *self.on_success.write() = Some(Arc::new(f));
    }

    /// Sets the hook called with the record of each failed execution.
    pub fn set_on_error<F>(&self, f: F)
    where
        F: Fn(&ErrorInfo) + Send + Sync + 'static,
    {
        *self.on_error.write() = Some(Arc::new(f));
    }

    /// Sets the hook called before each backoff with the attempt number and delay.
    pub fn set_on_retry<F>(&self, f: F)
    where
        F: Fn(u32, Duration) + Send + Sync + 'static,
    {
        *self.on_retry.write() = Some(Arc::new(f));
    }

    // Hooks are cloned out so user code never runs under the lock.

    pub(crate) fn execute_success_hook(&self, data: &T) {
        let hook = self.on_success.read().clone();
        if let Some(hook) = hook {
            hook(data);
        }
    }

    pub(crate) fn execute_error_hook(&self, error: &ErrorInfo) {
        let hook = self.on_error.read().clone();
        if let Some(hook) = hook {
            hook(error);
        }
    }

    pub(crate) fn execute_retry_hook(&self, attempt: u32, delay: Duration) {
        let hook = self.on_retry.read().clone();
        if let Some(hook) = hook {
            hook(attempt, delay);
        }
    }
}
