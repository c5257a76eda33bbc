use serde::Deserialize;

pub const STATE_RUNNING: &str = "RUNNING";
pub const STATE_COMPLETE: &str = "COMPLETE";

/// Snapshot of a session as reported by the service.
///
/// `result` is only set once the session has left the `RUNNING` state.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    state: String,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    signature: Option<SessionSignature>,
    #[serde(default)]
    cert: Option<String>,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    trace_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionSignature {
    /// Base64 encoded signature value.
    pub value: String,
    pub algorithm: String,
}

impl SessionStatus {
    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn signature(&self) -> Option<&SessionSignature> {
        self.signature.as_ref()
    }

    /// Base64 encoded DER certificate of the signer.
    pub fn cert(&self) -> Option<&str> {
        self.cert.as_deref()
    }

    pub fn time(&self) -> Option<&str> {
        self.time.as_deref()
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.state.eq_ignore_ascii_case(STATE_RUNNING)
    }

    pub fn is_complete(&self) -> bool {
        self.state.eq_ignore_ascii_case(STATE_COMPLETE)
    }
}
