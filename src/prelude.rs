//! Re-exports common types for convenient usage.
//!
//! # Example
//! ```rust,no_run
//! use fetchguard_rs::prelude::*;
//! ```

pub use crate::{
    ApiResponse, ErrorBoundary, ErrorInfo, FetchState, Phase, RecoveryAction, Rendered,
    RequestState, RetryFetch, RetryPolicy,
};
