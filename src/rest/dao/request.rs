//! Request bodies sent to the service and their validating builders.
//!
//! Requests are immutable once built. The relying party can be left empty on
//! a request and is then filled in from the connector's defaults on a copy.

use std::marker::PhantomData;
use std::ops::Deref;

use serde::Serialize;

use crate::error::{MidError, MidResult};
use crate::hash::{HashToSign, HashType};
use crate::input::validate_user_input;
use crate::language::{DisplayTextFormat, Language};

/// Longest display text the service accepts.
pub const MAX_DISPLAY_TEXT_LENGTH: usize = 40;

/// Identity of the registered caller on whose behalf an operation runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelyingParty {
    #[serde(rename = "relyingPartyUUID", skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(rename = "relyingPartyName", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RelyingParty {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: Some(uuid.into()),
            name: Some(name.into()),
        }
    }

    /// Fills the missing fields from `defaults`, then requires both to be non-empty.
    pub fn merged_with(&self, defaults: &RelyingParty) -> MidResult<RelyingParty> {
        let uuid = self.uuid.clone().or_else(|| defaults.uuid.clone());
        let name = self.name.clone().or_else(|| defaults.name.clone());

        if uuid.as_deref().is_none_or(str::is_empty) {
            return Err(MidError::parameter(
                "Relying Party UUID parameter must be set in client or request",
            ));
        }
        if name.as_deref().is_none_or(str::is_empty) {
            return Err(MidError::parameter(
                "Relying Party Name parameter must be set in client or request",
            ));
        }
        Ok(RelyingParty { uuid, name })
    }
}

/// Requests that carry a relying party the connector may need to complete.
pub trait RelyingPartyRequest: Serialize + Clone + Send + Sync {
    fn relying_party(&self) -> &RelyingParty;

    fn with_relying_party(self, relying_party: RelyingParty) -> Self;
}

/// Body shared by authentication and signing requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HashRequest {
    #[serde(flatten)]
    relying_party: RelyingParty,
    phone_number: String,
    national_identity_number: String,
    hash: String,
    hash_type: HashType,
    language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_text_format: Option<DisplayTextFormat>,
}

impl HashRequest {
    pub fn relying_party(&self) -> &RelyingParty {
        &self.relying_party
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn national_identity_number(&self) -> &str {
        &self.national_identity_number
    }

    /// Base64 encoded hash to sign.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn hash_type(&self) -> HashType {
        self.hash_type
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn display_text(&self) -> Option<&str> {
        self.display_text.as_deref()
    }

    pub fn display_text_format(&self) -> Option<DisplayTextFormat> {
        self.display_text_format
    }
}

/// Starts a Mobile-ID authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AuthenticationRequest(HashRequest);

/// Starts a Mobile-ID signing operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SignRequest(HashRequest);

impl AuthenticationRequest {
    pub fn builder() -> AuthenticationRequestBuilder {
        HashRequestBuilder::default()
    }
}

impl SignRequest {
    pub fn builder() -> SignRequestBuilder {
        HashRequestBuilder::default()
    }
}

macro_rules! impl_hash_request {
    ($request:ty) => {
        impl Deref for $request {
            type Target = HashRequest;

            fn deref(&self) -> &HashRequest {
                &self.0
            }
        }

        impl From<HashRequest> for $request {
            fn from(request: HashRequest) -> Self {
                Self(request)
            }
        }

        impl RelyingPartyRequest for $request {
            fn relying_party(&self) -> &RelyingParty {
                &self.0.relying_party
            }

            fn with_relying_party(mut self, relying_party: RelyingParty) -> Self {
                self.0.relying_party = relying_party;
                self
            }
        }
    };
}

impl_hash_request!(AuthenticationRequest);
impl_hash_request!(SignRequest);

pub type AuthenticationRequestBuilder = HashRequestBuilder<AuthenticationRequest>;
pub type SignRequestBuilder = HashRequestBuilder<SignRequest>;

/// Fluent builder for [`AuthenticationRequest`] and [`SignRequest`].
///
/// Nothing is validated until [`build`](Self::build), which either returns a
/// complete request or the first validation failure.
#[derive(Debug, Clone)]
pub struct HashRequestBuilder<R> {
    relying_party: RelyingParty,
    phone_number: Option<String>,
    national_identity_number: Option<String>,
    hash_to_sign: Option<HashToSign>,
    language: Option<Language>,
    display_text: Option<String>,
    display_text_format: Option<DisplayTextFormat>,
    _request: PhantomData<R>,
}

impl<R> Default for HashRequestBuilder<R> {
    fn default() -> Self {
        Self {
            relying_party: RelyingParty::default(),
            phone_number: None,
            national_identity_number: None,
            hash_to_sign: None,
            language: None,
            display_text: None,
            display_text_format: None,
            _request: PhantomData,
        }
    }
}

impl<R: From<HashRequest>> HashRequestBuilder<R> {
    pub fn with_relying_party_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.relying_party.uuid = Some(uuid.into());
        self
    }

    pub fn with_relying_party_name(mut self, name: impl Into<String>) -> Self {
        self.relying_party.name = Some(name.into());
        self
    }

    pub fn with_phone_number(mut self, phone_number: impl Into<String>) -> Self {
        self.phone_number = Some(phone_number.into());
        self
    }

    pub fn with_national_identity_number(
        mut self,
        national_identity_number: impl Into<String>,
    ) -> Self {
        self.national_identity_number = Some(national_identity_number.into());
        self
    }

    pub fn with_hash_to_sign(mut self, hash_to_sign: HashToSign) -> Self {
        self.hash_to_sign = Some(hash_to_sign);
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    pub fn with_display_text(mut self, display_text: impl Into<String>) -> Self {
        self.display_text = Some(display_text.into());
        self
    }

    pub fn with_display_text_format(mut self, format: DisplayTextFormat) -> Self {
        self.display_text_format = Some(format);
        self
    }

    /// Validates the collected fields and builds the request.
    ///
    /// # Errors
    /// Returns [`MidError::MissingOrInvalidParameter`] for the first of: an
    /// invalid phone number / national identity number pair, a missing hash,
    /// a missing language, a display text longer than
    /// [`MAX_DISPLAY_TEXT_LENGTH`] characters.
    pub fn build(self) -> MidResult<R> {
        validate_user_input(
            self.phone_number.as_deref(),
            self.national_identity_number.as_deref(),
        )?;
        let hash_to_sign = self
            .hash_to_sign
            .ok_or_else(|| MidError::parameter("hashToSign must be set"))?;
        let language = self.language.ok_or_else(|| {
            MidError::parameter("Language for user dialog in mobile phone must be set")
        })?;
        if let Some(text) = &self.display_text {
            validate_display_text(text)?;
        }

        Ok(R::from(HashRequest {
            relying_party: self.relying_party,
            // both are validated as present above
            phone_number: self.phone_number.unwrap_or_default(),
            national_identity_number: self.national_identity_number.unwrap_or_default(),
            hash: hash_to_sign.hash_in_base64(),
            hash_type: hash_to_sign.hash_type(),
            language,
            display_text: self.display_text,
            display_text_format: self.display_text_format,
        }))
    }
}

fn validate_display_text(text: &str) -> MidResult<()> {
    let length = text.chars().count();
    if length > MAX_DISPLAY_TEXT_LENGTH {
        return Err(MidError::parameter(format!(
            "displayText must not be longer than {MAX_DISPLAY_TEXT_LENGTH} characters, got {length}"
        )));
    }
    Ok(())
}

/// Looks up the signing certificate of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequest {
    #[serde(flatten)]
    relying_party: RelyingParty,
    phone_number: String,
    national_identity_number: String,
}

impl CertificateRequest {
    pub fn builder() -> CertificateRequestBuilder {
        CertificateRequestBuilder::default()
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn national_identity_number(&self) -> &str {
        &self.national_identity_number
    }
}

impl RelyingPartyRequest for CertificateRequest {
    fn relying_party(&self) -> &RelyingParty {
        &self.relying_party
    }

    fn with_relying_party(mut self, relying_party: RelyingParty) -> Self {
        self.relying_party = relying_party;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct CertificateRequestBuilder {
    relying_party: RelyingParty,
    phone_number: Option<String>,
    national_identity_number: Option<String>,
}

impl CertificateRequestBuilder {
    pub fn with_relying_party_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.relying_party.uuid = Some(uuid.into());
        self
    }

    pub fn with_relying_party_name(mut self, name: impl Into<String>) -> Self {
        self.relying_party.name = Some(name.into());
        self
    }

    pub fn with_phone_number(mut self, phone_number: impl Into<String>) -> Self {
        self.phone_number = Some(phone_number.into());
        self
    }

    pub fn with_national_identity_number(
        mut self,
        national_identity_number: impl Into<String>,
    ) -> Self {
        self.national_identity_number = Some(national_identity_number.into());
        self
    }

    pub fn build(self) -> MidResult<CertificateRequest> {
        validate_user_input(
            self.phone_number.as_deref(),
            self.national_identity_number.as_deref(),
        )?;
        Ok(CertificateRequest {
            relying_party: self.relying_party,
            phone_number: self.phone_number.unwrap_or_default(),
            national_identity_number: self.national_identity_number.unwrap_or_default(),
        })
    }
}

/// Asks for the current state of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatusRequest {
    session_id: String,
    timeout_ms: Option<u64>,
}

impl SessionStatusRequest {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            timeout_ms: None,
        }
    }

    /// Asks the service to hold the response for up to `timeout_ms`
    /// milliseconds while the session is still running.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn timeout_ms(&self) -> Option<u64> {
        self.timeout_ms
    }
}
