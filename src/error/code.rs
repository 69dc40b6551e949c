use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of every failure the application can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    NetworkFailure,
    Timeout,
    RateLimited,
    ConnectionRefused,
    DecodingFailure,
    EncodingFailure,
    ValidationFailure,
    UserInputError,
    ResourceNotFound,
    PermissionDenied,
    ConfigurationError,
    InitializationError,
    StateInconsistency,
    InternalError,
    UiRenderError,
    UnknownError,
}

impl ErrorCode {
    pub const ALL: [Self; 16] = [
        Self::NetworkFailure,
        Self::Timeout,
        Self::RateLimited,
        Self::ConnectionRefused,
        Self::DecodingFailure,
        Self::EncodingFailure,
        Self::ValidationFailure,
        Self::UserInputError,
        Self::ResourceNotFound,
        Self::PermissionDenied,
        Self::ConfigurationError,
        Self::InitializationError,
        Self::StateInconsistency,
        Self::InternalError,
        Self::UiRenderError,
        Self::UnknownError,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NetworkFailure => "NetworkFailure",
            Self::Timeout => "Timeout",
            Self::RateLimited => "RateLimited",
            Self::ConnectionRefused => "ConnectionRefused",
            Self::DecodingFailure => "DecodingFailure",
            Self::EncodingFailure => "EncodingFailure",
            Self::ValidationFailure => "ValidationFailure",
            Self::UserInputError => "UserInputError",
            Self::ResourceNotFound => "ResourceNotFound",
            Self::PermissionDenied => "PermissionDenied",
            Self::ConfigurationError => "ConfigurationError",
            Self::InitializationError => "InitializationError",
            Self::StateInconsistency => "StateInconsistency",
            Self::InternalError => "InternalError",
            Self::UiRenderError => "UIRenderError",
            Self::UnknownError => "UnknownError",
        }
    }

    pub const fn severity(self) -> ErrorSeverity {
        match self {
            Self::ConnectionRefused | Self::ConfigurationError | Self::InitializationError => {
                ErrorSeverity::Critical
            }
            Self::NetworkFailure
            | Self::Timeout
            | Self::StateInconsistency
            | Self::InternalError => ErrorSeverity::High,
            Self::RateLimited
            | Self::DecodingFailure
            | Self::ValidationFailure
            | Self::UiRenderError => ErrorSeverity::Medium,
            Self::UserInputError | Self::ResourceNotFound => ErrorSeverity::Low,
            Self::EncodingFailure | Self::PermissionDenied | Self::UnknownError => {
                ErrorSeverity::Medium
            }
        }
    }

    /// Whether a failure of this kind is worth retrying or recovering from.
    ///
    /// Codes without an explicit decision are treated optimistically.
    pub const fn is_recoverable(self) -> bool {
        match self {
            Self::RateLimited | Self::Timeout | Self::UserInputError | Self::ResourceNotFound => {
                true
            }
            Self::ConnectionRefused
            | Self::ConfigurationError
            | Self::InitializationError
            | Self::InternalError => false,
            Self::NetworkFailure
            | Self::DecodingFailure
            | Self::EncodingFailure
            | Self::ValidationFailure
            | Self::PermissionDenied
            | Self::StateInconsistency
            | Self::UiRenderError
            | Self::UnknownError => true,
        }
    }

    /// Message safe to show to the user.
    pub const fn user_message(self) -> &'static str {
        match self {
            Self::NetworkFailure => {
                "Unable to connect to the service. Please check your network connection."
            }
            Self::Timeout => "The operation timed out. Please try again.",
            Self::RateLimited => "Too many requests. Please wait a moment before trying again.",
            Self::ValidationFailure => "Invalid input. Please check your input and try again.",
            Self::ResourceNotFound => "The requested resource was not found.",
            Self::PermissionDenied => {
                "Permission denied. Please check your credentials and access rights."
            }
            _ => "An unexpected error occurred. Please try again.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Impact of a failure, ordered from `Info` (lowest) to `Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
