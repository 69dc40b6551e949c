//! The single pipeline every failure goes through.
//!
//! [`ErrorHandler`] classifies, logs once at a severity-derived level,
//! records metrics through a pluggable [`ErrorMetrics`] hook, and hands
//! recoverable errors to a [`RecoveryDispatcher`]. It never decides what a
//! recovery does; integrators register [`RecoveryAction`]s per code.

use std::cell::RefCell;
use std::collections::HashMap;

use tracing::{Level, debug, info};

use crate::config::ErrorConfig;
use crate::error::code::{ErrorCode, ErrorSeverity};
use crate::error::view_error::{ErrorFactory, Failure, ViewError};

/// Metrics hook invoked for every handled error when metrics are enabled.
pub trait ErrorMetrics {
    fn record(&self, error: &ViewError);
}

#[derive(Debug, Default)]
pub struct NoopMetrics;

impl ErrorMetrics for NoopMetrics {
    fn record(&self, _error: &ViewError) {}
}

/// Counts handled errors per code.
#[derive(Debug, Default)]
pub struct ErrorCounters {
    counts: RefCell<HashMap<ErrorCode, u64>>,
}

impl ErrorCounters {
    pub fn count(&self, code: ErrorCode) -> u64 {
        self.counts.borrow().get(&code).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.borrow().values().sum()
    }
}

impl ErrorMetrics for ErrorCounters {
    fn record(&self, error: &ViewError) {
        *self.counts.borrow_mut().entry(error.code).or_default() += 1;
    }
}

impl<M: ErrorMetrics + ?Sized> ErrorMetrics for std::rc::Rc<M> {
    fn record(&self, error: &ViewError) {
        (**self).record(error);
    }
}

/// A concrete recovery step for one error code.
pub trait RecoveryAction {
    fn recover(&self, error: &ViewError);
}

impl<F> RecoveryAction for F
where
    F: Fn(&ViewError),
{
    fn recover(&self, error: &ViewError) {
        self(error);
    }
}

/// Routes recoverable errors to the action registered for their code.
#[derive(Default)]
pub struct RecoveryDispatcher {
    actions: HashMap<ErrorCode, Box<dyn RecoveryAction>>,
}

impl RecoveryDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the action for `code`, replacing any previous one.
    pub fn register<A>(&mut self, code: ErrorCode, action: A)
    where
        A: RecoveryAction + 'static,
    {
        self.actions.insert(code, Box::new(action));
    }

    pub fn has_action(&self, code: ErrorCode) -> bool {
        self.actions.contains_key(&code)
    }

    pub fn attempt(&self, error: &ViewError) {
        if let Some(action) = self.actions.get(&error.code) {
            debug!(code = %error.code, operation = %error.operation(), "Running recovery action");
            action.recover(error);
            return;
        }

        let intent = match error.code {
            ErrorCode::RateLimited => "back off before the next request",
            ErrorCode::Timeout => "retry the operation",
            ErrorCode::NetworkFailure => "check connectivity and retry",
            ErrorCode::UserInputError | ErrorCode::ValidationFailure => {
                "ask the user to correct the input"
            }
            ErrorCode::ResourceNotFound => "refresh the resource list",
            _ => "no recovery registered",
        };
        info!(code = %error.code, operation = %error.operation(), intent, "Recovery attempt");
    }
}

macro_rules! log_view_error {
    ($level:expr, $err:expr, $cause:expr, $metadata:expr) => {
        tracing::event!(
            $level,
            code = %$err.code,
            severity = %$err.severity,
            component = %$err.context.component,
            operation = %$err.context.operation,
            recoverable = $err.recoverable,
            cause = $cause,
            metadata = $metadata,
            stack = $err.context.stack_trace.as_deref(),
            "{}",
            $err.message
        )
    };
}

pub struct ErrorHandler {
    factory: ErrorFactory,
    metrics: Box<dyn ErrorMetrics>,
    recovery: RecoveryDispatcher,
}

impl ErrorHandler {
    pub fn new(component: impl Into<String>, config: ErrorConfig) -> Self {
        Self::with_factory(ErrorFactory::new(component, config))
    }

    pub fn with_factory(factory: ErrorFactory) -> Self {
        Self {
            factory,
            metrics: Box::new(NoopMetrics),
            recovery: RecoveryDispatcher::new(),
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: impl ErrorMetrics + 'static) -> Self {
        self.metrics = Box::new(metrics);
        self
    }

    #[must_use]
    pub fn with_recovery(mut self, recovery: RecoveryDispatcher) -> Self {
        self.recovery = recovery;
        self
    }

    pub const fn factory(&self) -> &ErrorFactory {
        &self.factory
    }

    const fn config(&self) -> &ErrorConfig {
        self.factory.config()
    }

    /// Run `error` through the pipeline. `None` does nothing.
    pub fn handle_error(&self, error: Option<Failure>) {
        let _ = self.handle_and_log(error);
    }

    /// Run `error` through the pipeline and hand back the classified error.
    pub fn handle_and_log(&self, error: Option<Failure>) -> Option<ViewError> {
        error.map(|error| self.process(self.factory.classify(error)))
    }

    /// Shorthand for handling a failure that is known to be present.
    pub fn report(&self, error: impl Into<Failure>) -> ViewError {
        self.process(self.factory.classify(error.into()))
    }

    fn process(&self, error: ViewError) -> ViewError {
        self.log(&error);
        if self.config().enable_metrics {
            self.metrics.record(&error);
        }
        if error.recoverable && self.config().enable_recovery {
            self.recovery.attempt(&error);
        }
        error
    }

    fn log(&self, error: &ViewError) {
        let cause = error.cause_message();
        let cause = cause.as_deref();
        let metadata = (self.config().log_metadata && !error.context.metadata.is_empty())
            .then(|| serde_json::to_string(&error.context.metadata).unwrap_or_default());
        let metadata = metadata.as_deref();

        match error.severity {
            ErrorSeverity::Critical | ErrorSeverity::High => {
                log_view_error!(Level::ERROR, error, cause, metadata);
            }
            ErrorSeverity::Medium => log_view_error!(Level::WARN, error, cause, metadata),
            ErrorSeverity::Low | ErrorSeverity::Info => {
                log_view_error!(Level::DEBUG, error, cause, metadata);
            }
        }
    }
}
