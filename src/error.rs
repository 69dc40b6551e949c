//! Error classification, context capture and the handling pipeline.
//!
//! Raw failures are never shown to the user. They are wrapped into a
//! [`ViewError`] that carries a fixed severity, a recoverable flag and a
//! sanitized user message, and are then handed to [`ErrorHandler`].

mod code;
mod handler;
mod retry;
mod stack;
mod view_error;

pub use code::{ErrorCode, ErrorSeverity};
pub use handler::{
    ErrorCounters, ErrorHandler, ErrorMetrics, NoopMetrics, RecoveryAction, RecoveryDispatcher,
};
pub use retry::retryable_error;
pub use stack::{BacktraceCapture, NoStackCapture, StackCapture};
pub use view_error::{BoxError, ErrorContext, ErrorFactory, Failure, Metadata, ViewError};
