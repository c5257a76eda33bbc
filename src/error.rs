use thiserror::Error;

/// Errors returned by the Mobile-ID client.
///
/// Every public operation fails with exactly one of these kinds. Callers are
/// expected to branch on the variant, never on the message text.
#[derive(Error, Debug)]
pub enum MidError {
    /// The request was malformed or a required parameter was missing.
    #[error("missing or invalid parameter: {0}")]
    MissingOrInvalidParameter(String),

    #[error("request unauthorized: {0}")]
    Unauthorized(String),

    /// The service is temporarily unavailable, the call may be retried later.
    #[error("Mobile-ID service is temporarily unavailable")]
    ServiceUnavailable,

    /// The server presented a public key that is not in the pinned set.
    #[error("SSL public key is untrusted for host: {url}")]
    SslPinning { url: String },

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("user is not a Mobile-ID client")]
    NotMidClient,

    #[error("user cancelled the operation")]
    UserCancelled,

    #[error("phone is not available")]
    PhoneNotAvailable,

    #[error("SMS sending or SIM error")]
    Delivery,

    #[error("Mobile-ID configuration on the user's SIM card differs from the service side")]
    InvalidUserConfiguration,

    #[error("session timed out before the user completed the operation")]
    SessionTimeout,

    /// Unexpected or unparseable response from the service.
    #[error("internal error: {0}")]
    Internal(String),

    /// The client itself could not be constructed.
    #[error("invalid client configuration: {0}")]
    Configuration(String),
}

impl MidError {
    pub fn parameter(message: impl Into<String>) -> Self {
        Self::MissingOrInvalidParameter(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether the same call may succeed if repeated later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ServiceUnavailable)
    }
}

/// Convenient Result type alias
pub type MidResult<T> = Result<T, MidError>;
