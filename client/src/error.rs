//! Stable error codes shared by every client error type.

/// Maps an error to a stable code and a retry classification.
///
/// Structural errors (unknown types, missing fields) are never retryable;
/// transport errors are, and the poller retries them on its own.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}
