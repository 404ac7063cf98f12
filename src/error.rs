//! Event Feed Errors
//!
//! One error type for the whole feed surface. Variants fall into three
//! classes: validation (never retried), transient connection failures
//! (retried inside the connection manager), and fatal session errors
//! (surfaced to the caller, end the stream).

/// Errors produced by the frame codec, subscription builder and
/// connection manager.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// A field failed validation.
    #[error("validation error field={field} reason={reason}")]
    Validation {
        /// Offending field (wire key or parameter name).
        field: String,
        /// Short machine-readable reason.
        reason: String,
    },

    /// A frame item had no key/value delimiter.
    #[error("event frame missing delimiter")]
    MissingDelimiter,

    /// A Base64 or Shift_JIS payload could not be decoded.
    #[error("text decode failed: {0}")]
    TextDecode(String),

    /// The event endpoint base URL is blank.
    #[error("event base URL is empty")]
    EmptyBaseUrl,

    /// The event endpoint base URL does not parse.
    #[error("invalid event URL: {0}")]
    InvalidUrl(String),

    /// The endpoint provider has no event URL yet (login not done).
    #[error("event endpoint unavailable: {0}")]
    EndpointUnavailable(String),

    /// Opening the socket failed.
    #[error("event connect failed: {0}")]
    Connect(String),

    /// Reading from the socket failed.
    #[error("event read failed: {0}")]
    Read(String),

    /// Another session is already open on this client.
    #[error("event session already active")]
    SessionActive,

    /// The connection was closed explicitly.
    #[error("event connection closed")]
    Closed,

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl EventError {
    /// Build a validation error from a field and reason.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for the `p_cmd` / `unsupported` validation failure.
    ///
    /// The connection manager downgrades exactly this error to an
    /// `Event::Unknown` at the read boundary.
    pub fn is_unsupported_command(&self) -> bool {
        matches!(
            self,
            Self::Validation { field, reason }
                if field == "p_cmd" && reason.eq_ignore_ascii_case("unsupported")
        )
    }

    /// True for socket-level failures the connection manager retries.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Read(_))
    }
}

/// Result alias used across the feed.
pub type EventResult<T> = Result<T, EventError>;
