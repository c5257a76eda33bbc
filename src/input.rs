//! Validation of the subject identifiers shared by all request builders.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{MidError, MidResult};

static PHONE_NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+\d{8,30}$").expect("valid phone number regex"));
static NATIONAL_IDENTITY_NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{11}$").expect("valid national identity number regex"));

pub fn is_phone_number_valid(phone_number: &str) -> bool {
    PHONE_NUMBER_REGEX.is_match(phone_number)
}

pub fn is_national_identity_number_valid(national_identity_number: &str) -> bool {
    NATIONAL_IDENTITY_NUMBER_REGEX.is_match(national_identity_number)
}

/// Checks that the phone number and national identity number are both present
/// and well formed.
///
/// The service identifies a user by the pair, so one without the other is
/// rejected the same way as a malformed value.
pub fn validate_user_input(
    phone_number: Option<&str>,
    national_identity_number: Option<&str>,
) -> MidResult<()> {
    let phone_number = phone_number
        .filter(|p| !p.is_empty())
        .ok_or_else(|| MidError::parameter("phoneNumber must be set"))?;
    let national_identity_number = national_identity_number
        .filter(|n| !n.is_empty())
        .ok_or_else(|| MidError::parameter("nationalIdentityNumber must be set"))?;

    if !is_phone_number_valid(phone_number) {
        return Err(MidError::parameter(format!(
            "phone number {phone_number} must be '+' followed by 8 to 30 digits"
        )));
    }
    if !is_national_identity_number_valid(national_identity_number) {
        return Err(MidError::parameter(format!(
            "national identity number {national_identity_number} must be 11 digits"
        )));
    }
    Ok(())
}
