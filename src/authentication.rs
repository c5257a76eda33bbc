//! Outcome of a successful authentication session.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use x509_parser::oid_registry::{
    OID_X509_COUNTRY_NAME, OID_X509_GIVEN_NAME, OID_X509_SERIALNUMBER, OID_X509_SURNAME,
};
use x509_parser::parse_x509_certificate;
use x509_parser::x509::AttributeTypeAndValue;

use crate::error::{MidError, MidResult};
use crate::hash::HashToSign;
use crate::rest::dao::SessionStatus;

/// Signature produced on the user's phone over the authentication hash,
/// together with the certificate that made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MobileIdAuthentication {
    result: String,
    signature_value: String,
    algorithm_name: String,
    signed_hash: HashToSign,
    certificate: Vec<u8>,
}

/// Person named in an authentication certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthenticationIdentity {
    pub given_name: String,
    pub surname: String,
    pub identity_code: String,
    pub country: String,
}

impl MobileIdAuthentication {
    /// Creates the result from the final status of an authentication session.
    ///
    /// # Errors
    /// Returns [`MidError::Internal`] if the status carries no signature or no
    /// certificate, or if the certificate is not valid base64.
    pub fn from_session(status: &SessionStatus, signed_hash: &HashToSign) -> MidResult<Self> {
        let signature = status.signature().ok_or_else(|| {
            MidError::internal("Signature is missing in the session status response")
        })?;
        let certificate = status.cert().ok_or_else(|| {
            MidError::internal("Certificate is missing in the session status response")
        })?;
        let certificate = STANDARD
            .decode(certificate)
            .map_err(|e| MidError::internal(format!("certificate is not valid base64: {e}")))?;

        Ok(Self {
            result: status.result().unwrap_or_default().to_string(),
            signature_value: signature.value.clone(),
            algorithm_name: signature.algorithm.clone(),
            signed_hash: signed_hash.clone(),
            certificate,
        })
    }

    pub fn result(&self) -> &str {
        &self.result
    }

    /// Base64 encoded signature as returned by the service.
    pub fn signature_value_in_base64(&self) -> &str {
        &self.signature_value
    }

    pub fn signature_value(&self) -> MidResult<Vec<u8>> {
        STANDARD
            .decode(&self.signature_value)
            .map_err(|e| MidError::internal(format!("signature is not valid base64: {e}")))
    }

    pub fn algorithm_name(&self) -> &str {
        &self.algorithm_name
    }

    pub fn signed_hash(&self) -> &HashToSign {
        &self.signed_hash
    }

    /// DER encoded certificate of the user.
    pub fn certificate(&self) -> &[u8] {
        &self.certificate
    }

    pub fn identity(&self) -> MidResult<AuthenticationIdentity> {
        identity_from_certificate(&self.certificate)
    }
}

/// Reads the person's name, identity code and country from the subject of a
/// DER encoded certificate.
pub fn identity_from_certificate(certificate_der: &[u8]) -> MidResult<AuthenticationIdentity> {
    let (_, certificate) = parse_x509_certificate(certificate_der)
        .map_err(|e| MidError::internal(format!("failed to parse certificate: {e}")))?;
    let subject = certificate.subject();

    Ok(AuthenticationIdentity {
        given_name: first_value(subject.iter_by_oid(&OID_X509_GIVEN_NAME)),
        surname: first_value(subject.iter_by_oid(&OID_X509_SURNAME)),
        identity_code: strip_identity_code_prefix(&first_value(
            subject.iter_by_oid(&OID_X509_SERIALNUMBER),
        )),
        country: first_value(subject.iter_by_oid(&OID_X509_COUNTRY_NAME)),
    })
}

fn first_value<'a, 'b: 'a>(
    mut attributes: impl Iterator<Item = &'a AttributeTypeAndValue<'b>>,
) -> String {
    attributes
        .find_map(|attribute| attribute.as_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// ETSI semantics identifiers look like `PNOEE-38001085718`.
fn strip_identity_code_prefix(serial_number: &str) -> String {
    match serial_number.split_once('-') {
        Some((prefix, code)) if prefix.len() == 5 && prefix.starts_with("PNO") => code.to_string(),
        _ => serial_number.to_string(),
    }
}
