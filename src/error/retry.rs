use std::time::Duration;

use crate::error::code::ErrorCode;
use crate::error::view_error::{Failure, ViewError};

const RATE_LIMIT_DELAY: Duration = Duration::from_secs(5);
const TIMEOUT_DELAY: Duration = Duration::from_secs(2);
const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// Whether `error` may be retried and how long to wait first.
///
/// Unclassified and absent errors are never retried.
pub fn retryable_error(error: Option<&Failure>) -> (bool, Duration) {
    error
        .and_then(Failure::as_view_error)
        .map_or((false, Duration::ZERO), ViewError::retry_policy)
}

impl ViewError {
    /// Retry eligibility and backoff for this error.
    pub const fn retry_policy(&self) -> (bool, Duration) {
        if !self.recoverable {
            return (false, Duration::ZERO);
        }
        let delay = match self.code {
            ErrorCode::RateLimited => RATE_LIMIT_DELAY,
            ErrorCode::Timeout => TIMEOUT_DELAY,
            ErrorCode::UserInputError => Duration::ZERO,
            _ => DEFAULT_DELAY,
        };
        (true, delay)
    }
}
