//! Mapping of service result codes and HTTP statuses onto [`MidError`].

use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::error;

use crate::error::{MidError, MidResult};

/// Result code of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionResult {
    Ok,
    Timeout,
    ExpiredTransaction,
    NotMidClient,
    UserCancelled,
    PhoneAbsent,
    SignatureHashMismatch,
    SimError,
    DeliveryError,
    /// Any code outside the documented set, kept as received.
    Unknown(String),
}

impl SessionResult {
    /// Parses a result code, ignoring case.
    pub fn parse(code: &str) -> Self {
        match code.to_ascii_uppercase().as_str() {
            "OK" => Self::Ok,
            "TIMEOUT" => Self::Timeout,
            "EXPIRED_TRANSACTION" => Self::ExpiredTransaction,
            "NOT_MID_CLIENT" => Self::NotMidClient,
            "USER_CANCELLED" => Self::UserCancelled,
            "PHONE_ABSENT" => Self::PhoneAbsent,
            "SIGNATURE_HASH_MISMATCH" => Self::SignatureHashMismatch,
            "SIM_ERROR" => Self::SimError,
            "DELIVERY_ERROR" => Self::DeliveryError,
            _ => Self::Unknown(code.to_string()),
        }
    }

    /// Turns the code into the outcome of the whole operation.
    pub fn into_result(self) -> MidResult<()> {
        match self {
            Self::Ok => Ok(()),
            Self::Timeout | Self::ExpiredTransaction => {
                error!("Session timeout");
                Err(MidError::SessionTimeout)
            }
            Self::NotMidClient => {
                error!("User is not Mobile-ID client");
                Err(MidError::NotMidClient)
            }
            Self::UserCancelled => {
                error!("User cancelled the operation");
                Err(MidError::UserCancelled)
            }
            Self::PhoneAbsent => {
                error!("Sim not available");
                Err(MidError::PhoneNotAvailable)
            }
            Self::SignatureHashMismatch => {
                error!("Hash does not match with certificate type");
                Err(MidError::InvalidUserConfiguration)
            }
            Self::SimError | Self::DeliveryError => {
                error!("SMS sending or SIM error");
                Err(MidError::Delivery)
            }
            Self::Unknown(code) => {
                error!("MID returned error code '{}'", code);
                Err(MidError::internal(format!("MID returned error code '{code}'")))
            }
        }
    }
}

impl fmt::Display for SessionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::ExpiredTransaction => write!(f, "EXPIRED_TRANSACTION"),
            Self::NotMidClient => write!(f, "NOT_MID_CLIENT"),
            Self::UserCancelled => write!(f, "USER_CANCELLED"),
            Self::PhoneAbsent => write!(f, "PHONE_ABSENT"),
            Self::SignatureHashMismatch => write!(f, "SIGNATURE_HASH_MISMATCH"),
            Self::SimError => write!(f, "SIM_ERROR"),
            Self::DeliveryError => write!(f, "DELIVERY_ERROR"),
            Self::Unknown(code) => write!(f, "{code}"),
        }
    }
}

/// Checks the result code of a terminal session.
pub fn validate_session_result(code: &str) -> MidResult<()> {
    SessionResult::parse(code).into_result()
}

/// Result code embedded in a certificate lookup response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateResult {
    Ok,
    NotFound,
    Unknown(String),
}

impl CertificateResult {
    pub fn parse(code: &str) -> Self {
        match code.to_ascii_uppercase().as_str() {
            "OK" => Self::Ok,
            "NOT_FOUND" => Self::NotFound,
            _ => Self::Unknown(code.to_string()),
        }
    }

    pub fn into_result(self) -> MidResult<()> {
        match self {
            Self::Ok => Ok(()),
            Self::NotFound => {
                error!("No certificate for the user were found");
                Err(MidError::NotMidClient)
            }
            Self::Unknown(code) => {
                error!("MID returned error code '{}'", code);
                Err(MidError::internal(format!("MID returned error code '{code}'")))
            }
        }
    }
}

pub fn validate_certificate_result(code: &str) -> MidResult<()> {
    CertificateResult::parse(code).into_result()
}

/// Maps a non-200 HTTP response onto an error.
///
/// For 400, 401 and 405 the message is taken from the body's `error` field
/// when the body carries one.
pub fn error_for_status(status: StatusCode, body: &str) -> MidError {
    let body_error = || {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|json| json.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| format!("MID API returned HTTP status code {}", status.as_u16()))
    };

    match status {
        StatusCode::BAD_REQUEST | StatusCode::METHOD_NOT_ALLOWED => {
            MidError::MissingOrInvalidParameter(body_error())
        }
        StatusCode::UNAUTHORIZED => MidError::Unauthorized(body_error()),
        StatusCode::SERVICE_UNAVAILABLE => MidError::ServiceUnavailable,
        other => MidError::internal(format!(
            "MID returned unknown status code {}, response was '{}'",
            other.as_u16(),
            body
        )),
    }
}
