use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::config::ErrorConfig;
use crate::error::code::{ErrorCode, ErrorSeverity};
use crate::error::stack::{BacktraceCapture, NoStackCapture, StackCapture};

/// Boxed underlying failure carried as the cause of a [`ViewError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Free-form metadata attached to an error context.
pub type Metadata = BTreeMap<String, Value>;

/// Where and when an error was raised.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub component: String,
    pub operation: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: Metadata,
    pub stack_trace: Option<String>,
}

/// Canonical classified failure.
///
/// Severity, recoverability and the user message are derived from the code
/// once, when the error is built. Wrapping an existing `ViewError` never
/// re-derives them.
#[derive(Debug, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct ViewError {
    pub code: ErrorCode,
    pub message: String,
    pub severity: ErrorSeverity,
    #[source]
    pub cause: Option<BoxError>,
    pub context: ErrorContext,
    pub recoverable: bool,
    pub user_message: String,
}

impl ViewError {
    pub fn operation(&self) -> &str {
        &self.context.operation
    }

    /// Merge `metadata` into the context, overwriting existing keys.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.context.metadata.extend(metadata);
        self
    }

    /// Add one metadata entry.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.metadata.insert(key.into(), value.into());
        self
    }

    pub fn cause_message(&self) -> Option<String> {
        self.cause.as_ref().map(ToString::to_string)
    }
}

/// Any failure handed to the error pipeline.
#[derive(Debug)]
pub enum Failure {
    /// Already classified.
    Classified(ViewError),
    /// Foreign error that has not been classified yet.
    Unclassified(BoxError),
}

impl Failure {
    /// Wrap any foreign error.
    pub fn other<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Unclassified(error.into())
    }

    pub const fn as_view_error(&self) -> Option<&ViewError> {
        match self {
            Self::Classified(err) => Some(err),
            Self::Unclassified(_) => None,
        }
    }
}

impl From<ViewError> for Failure {
    fn from(error: ViewError) -> Self {
        Self::Classified(error)
    }
}

impl From<BoxError> for Failure {
    fn from(error: BoxError) -> Self {
        Self::Unclassified(error)
    }
}

/// Builds classified errors for one component.
#[derive(Clone)]
pub struct ErrorFactory {
    component: String,
    capture: Rc<dyn StackCapture>,
    config: ErrorConfig,
}

impl ErrorFactory {
    /// Create a factory using the platform backtrace for stack snapshots.
    pub fn new(component: impl Into<String>, config: ErrorConfig) -> Self {
        let capture: Rc<dyn StackCapture> = if config.capture_stack {
            Rc::new(BacktraceCapture)
        } else {
            Rc::new(NoStackCapture)
        };
        Self::with_capture(component, config, capture)
    }

    pub fn with_capture(
        component: impl Into<String>,
        config: ErrorConfig,
        capture: Rc<dyn StackCapture>,
    ) -> Self {
        Self {
            component: component.into(),
            capture,
            config,
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub const fn config(&self) -> &ErrorConfig {
        &self.config
    }

    pub fn new_error(
        &self,
        code: ErrorCode,
        message: impl Into<String>,
        cause: Option<BoxError>,
    ) -> ViewError {
        self.build(code, String::new(), message.into(), cause)
    }

    pub fn new_error_with_operation(
        &self,
        code: ErrorCode,
        operation: impl Into<String>,
        message: impl Into<String>,
        cause: Option<BoxError>,
    ) -> ViewError {
        self.build(code, operation.into(), message.into(), cause)
    }

    pub fn new_error_with_metadata(
        &self,
        code: ErrorCode,
        operation: impl Into<String>,
        message: impl Into<String>,
        cause: Option<BoxError>,
        metadata: Metadata,
    ) -> ViewError {
        self.build(code, operation.into(), message.into(), cause)
            .with_metadata(metadata)
    }

    /// Classify a transport failure by inspecting its message.
    pub fn wrap_network(&self, operation: impl Into<String>, cause: BoxError) -> ViewError {
        let code = classify_network_message(&cause.to_string());
        self.new_error_with_operation(code, operation, "network request failed", Some(cause))
    }

    pub fn wrap_decoding(
        &self,
        data_type: impl Into<String>,
        operation: impl Into<String>,
        cause: BoxError,
    ) -> ViewError {
        self.wrap_codec(
            ErrorCode::DecodingFailure,
            "decode",
            data_type.into(),
            operation.into(),
            cause,
        )
    }

    pub fn wrap_encoding(
        &self,
        data_type: impl Into<String>,
        operation: impl Into<String>,
        cause: BoxError,
    ) -> ViewError {
        self.wrap_codec(
            ErrorCode::EncodingFailure,
            "encode",
            data_type.into(),
            operation.into(),
            cause,
        )
    }

    fn wrap_codec(
        &self,
        code: ErrorCode,
        verb: &str,
        data_type: String,
        operation: String,
        cause: BoxError,
    ) -> ViewError {
        let message = format!("failed to {verb} {data_type}");
        let mut metadata = Metadata::new();
        metadata.insert("data_type".to_string(), Value::String(data_type));
        metadata.insert("operation".to_string(), Value::String(operation.clone()));
        self.new_error_with_metadata(code, operation, message, Some(cause), metadata)
    }

    /// A rejected input value. Carries no underlying cause.
    pub fn wrap_validation(
        &self,
        field: impl Into<String>,
        value: impl Into<Value>,
        reason: impl Into<String>,
    ) -> ViewError {
        let field = field.into();
        let reason = reason.into();
        let message = format!("validation failed for {field}: {reason}");
        let mut metadata = Metadata::new();
        metadata.insert("field".to_string(), Value::String(field));
        metadata.insert("value".to_string(), value.into());
        metadata.insert("reason".to_string(), Value::String(reason));
        self.new_error_with_metadata(
            ErrorCode::ValidationFailure,
            "validate",
            message,
            None,
            metadata,
        )
    }

    /// Reading a response body failed.
    pub fn wrap_response_read(&self, operation: impl Into<String>, cause: BoxError) -> ViewError {
        self.new_error_with_operation(
            ErrorCode::NetworkFailure,
            operation,
            "failed to read response body",
            Some(cause),
        )
    }

    /// Attach an operation label.
    ///
    /// A classified error keeps its code, severity and recoverability and
    /// only has its operation replaced. Anything else becomes `UnknownError`.
    pub fn wrap_with_operation(&self, failure: Failure, operation: impl Into<String>) -> ViewError {
        match failure {
            Failure::Classified(mut err) => {
                err.context.operation = operation.into();
                err
            }
            Failure::Unclassified(cause) => {
                let message = cause.to_string();
                self.new_error_with_operation(
                    ErrorCode::UnknownError,
                    operation,
                    message,
                    Some(cause),
                )
            }
        }
    }

    /// Classify a foreign error as `UnknownError`, or pass a classified one through.
    pub fn classify(&self, failure: Failure) -> ViewError {
        match failure {
            Failure::Classified(err) => err,
            Failure::Unclassified(cause) => {
                let message = cause.to_string();
                self.new_error(ErrorCode::UnknownError, message, Some(cause))
            }
        }
    }

    fn build(
        &self,
        code: ErrorCode,
        operation: String,
        message: String,
        cause: Option<BoxError>,
    ) -> ViewError {
        let stack_trace = if self.config.capture_stack {
            self.capture.capture(self.config.max_stack_depth)
        } else {
            None
        };

        ViewError {
            code,
            message,
            severity: code.severity(),
            cause,
            context: ErrorContext {
                component: self.component.clone(),
                operation,
                timestamp: Utc::now(),
                metadata: Metadata::new(),
                stack_trace,
            },
            recoverable: code.is_recoverable(),
            user_message: code.user_message().to_string(),
        }
    }
}

fn classify_network_message(message: &str) -> ErrorCode {
    let message = message.to_lowercase();
    if message.contains("timeout") || message.contains("deadline") {
        ErrorCode::Timeout
    } else if message.contains("429") || message.contains("rate limit") {
        ErrorCode::RateLimited
    } else if message.contains("connection refused") {
        ErrorCode::ConnectionRefused
    } else {
        ErrorCode::NetworkFailure
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    fn factory() -> ErrorFactory {
        let config = ErrorConfig {
            capture_stack: false,
            ..ErrorConfig::default()
        };
        ErrorFactory::new("secrets", config)
    }

    fn cause(message: &str) -> BoxError {
        message.to_string().into()
    }

    #[test]
    fn test_new_error_derives_classification() {
        let err = factory().new_error(ErrorCode::ConnectionRefused, "dial failed", None);
        assert_eq!(err.severity, ErrorSeverity::Critical);
        assert!(!err.recoverable);
        assert_eq!(err.context.component, "secrets");
        assert_eq!(err.context.operation, "");
        assert!(err.context.metadata.is_empty());
        assert!(err.context.stack_trace.is_none());
        assert_eq!(err.user_message, ErrorCode::ConnectionRefused.user_message());
        assert_eq!(err.to_string(), "[ConnectionRefused] dial failed");
    }

    #[test]
    fn test_cause_is_error_source() {
        let err = factory().new_error(ErrorCode::InternalError, "boom", Some(cause("inner")));
        assert_eq!(err.source().map(ToString::to_string), Some("inner".to_string()));
        assert_eq!(err.cause_message().as_deref(), Some("inner"));
    }

    #[test]
    fn test_metadata_is_merged() {
        let mut metadata = Metadata::new();
        metadata.insert("secret".to_string(), Value::from("db-password"));
        let err = factory()
            .new_error_with_metadata(ErrorCode::ResourceNotFound, "get", "missing", None, metadata)
            .with_meta("version", 3);
        assert_eq!(err.operation(), "get");
        assert_eq!(err.context.metadata["secret"], Value::from("db-password"));
        assert_eq!(err.context.metadata["version"], Value::from(3));
    }

    #[test]
    fn test_network_heuristics() {
        let f = factory();
        let cases = [
            ("request Timeout after 30s", ErrorCode::Timeout),
            ("context deadline exceeded", ErrorCode::Timeout),
            ("HTTP 429 Too Many Requests", ErrorCode::RateLimited),
            ("Rate Limit exceeded", ErrorCode::RateLimited),
            ("dial tcp: connection refused", ErrorCode::ConnectionRefused),
            ("no route to host", ErrorCode::NetworkFailure),
        ];
        for (message, code) in cases {
            let err = f.wrap_network("list", cause(message));
            assert_eq!(err.code, code, "{message}");
            assert_eq!(err.operation(), "list");
        }
    }

    #[test]
    fn test_codec_wrappers_tag_metadata() {
        let f = factory();
        let err = f.wrap_decoding("Secret", "list", cause("eof"));
        assert_eq!(err.code, ErrorCode::DecodingFailure);
        assert_eq!(err.context.metadata["data_type"], Value::from("Secret"));
        assert_eq!(err.context.metadata["operation"], Value::from("list"));

        let err = f.wrap_encoding("Payload", "create", cause("bad utf8"));
        assert_eq!(err.code, ErrorCode::EncodingFailure);
        assert_eq!(err.context.metadata["data_type"], Value::from("Payload"));
    }

    #[test]
    fn test_validation_has_no_cause() {
        let err = factory().wrap_validation("name", "", "must not be empty");
        assert_eq!(err.code, ErrorCode::ValidationFailure);
        assert!(err.cause.is_none());
        assert_eq!(err.context.metadata["field"], Value::from("name"));
        assert_eq!(err.context.metadata["value"], Value::from(""));
        assert_eq!(err.context.metadata["reason"], Value::from("must not be empty"));
    }

    #[test]
    fn test_response_read_is_network_failure() {
        let err = factory().wrap_response_read("get", cause("timeout while reading"));
        assert_eq!(err.code, ErrorCode::NetworkFailure);
    }

    #[test]
    fn test_wrap_with_operation_preserves_classification() {
        let f = factory();
        let original =
            f.new_error_with_operation(ErrorCode::RateLimited, "list", "slow down", None);
        let wrapped = f.wrap_with_operation(original.into(), "refresh");
        assert_eq!(wrapped.code, ErrorCode::RateLimited);
        assert_eq!(wrapped.severity, ErrorSeverity::Medium);
        assert!(wrapped.recoverable);
        assert_eq!(wrapped.operation(), "refresh");
        assert_eq!(wrapped.message, "slow down");
    }

    #[test]
    fn test_wrap_with_operation_classifies_foreign_errors() {
        let wrapped = factory().wrap_with_operation(Failure::other("disk full"), "save");
        assert_eq!(wrapped.code, ErrorCode::UnknownError);
        assert!(wrapped.recoverable);
        assert_eq!(wrapped.operation(), "save");
    }

    struct FixedCapture;

    impl StackCapture for FixedCapture {
        fn capture(&self, max_depth: usize) -> Option<String> {
            Some(format!("depth={max_depth}"))
        }
    }

    #[test]
    fn test_stack_capture_follows_config() {
        let config = ErrorConfig {
            capture_stack: true,
            max_stack_depth: 4,
            ..ErrorConfig::default()
        };
        let f = ErrorFactory::with_capture("ui", config, Rc::new(FixedCapture));
        let err = f.new_error(ErrorCode::UiRenderError, "draw", None);
        assert_eq!(err.context.stack_trace.as_deref(), Some("depth=4"));

        let f = ErrorFactory::with_capture(
            "ui",
            ErrorConfig {
                capture_stack: false,
                ..config
            },
            Rc::new(FixedCapture),
        );
        assert!(f.new_error(ErrorCode::UiRenderError, "draw", None).context.stack_trace.is_none());
    }

    #[test]
    fn test_backtrace_snapshot_starts_past_capture_code() {
        let config = ErrorConfig {
            capture_stack: true,
            max_stack_depth: 5,
            ..ErrorConfig::default()
        };
        let err = ErrorFactory::new("ui", config).new_error(ErrorCode::InternalError, "x", None);
        let Some(trace) = err.context.stack_trace else {
            return;
        };
        assert!(trace.lines().count() <= 5);
        assert!(!trace.contains("lazyview::error::stack"), "{trace}");
        assert!(!trace.contains("ErrorFactory"), "{trace}");
    }
}
