use serde::Deserialize;

/// Session handle returned when an operation is started.
///
/// The service has used both `sessionID` and `sessionId` spellings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionResponse {
    #[serde(rename = "sessionID", alias = "sessionId")]
    session_id: String,
}

impl SessionResponse {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

pub type AuthenticationResponse = SessionResponse;
pub type SignResponse = SessionResponse;

/// Result of a certificate lookup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateResponse {
    result: String,
    #[serde(default)]
    cert: Option<String>,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    trace_id: Option<String>,
}

impl CertificateResponse {
    pub fn result(&self) -> &str {
        &self.result
    }

    /// Base64 encoded DER certificate.
    pub fn cert(&self) -> Option<&str> {
        self.cert.as_deref()
    }

    pub fn time(&self) -> Option<&str> {
        self.time.as_deref()
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }
}
