//! Scripted connector for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::connector::MobileIdConnector;
use super::dao::{
    AuthenticationRequest, AuthenticationResponse, CertificateRequest, CertificateResponse,
    SessionStatus, SessionStatusRequest, SignRequest, SignResponse,
};
use crate::error::{MidError, MidResult};

pub fn status(json: &str) -> SessionStatus {
    serde_json::from_str(json).unwrap()
}

pub fn running() -> SessionStatus {
    status(r#"{"state":"RUNNING"}"#)
}

pub fn complete(result: &str) -> SessionStatus {
    status(&format!(r#"{{"state":"COMPLETE","result":"{result}"}}"#))
}

#[derive(Default)]
pub struct MockConnector {
    pub session_id: String,
    pub certificate: Option<MidResult<CertificateResponse>>,
    pub statuses: Mutex<VecDeque<MidResult<SessionStatus>>>,
    pub status_requests: Mutex<Vec<SessionStatusRequest>>,
}

impl MockConnector {
    pub fn with_statuses(statuses: impl IntoIterator<Item = MidResult<SessionStatus>>) -> Self {
        Self {
            session_id: "de305d54-75b4-431b-adb2-eb6b9e546014".to_string(),
            statuses: Mutex::new(statuses.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn status_requests(&self) -> Vec<SessionStatusRequest> {
        self.status_requests.lock().unwrap().clone()
    }

    fn session_response(&self) -> MidResult<AuthenticationResponse> {
        serde_json::from_value(serde_json::json!({ "sessionID": self.session_id }))
            .map_err(|e| MidError::internal(e.to_string()))
    }
}

#[async_trait]
impl MobileIdConnector for MockConnector {
    async fn init_authentication(
        &self,
        _request: &AuthenticationRequest,
    ) -> MidResult<AuthenticationResponse> {
        self.session_response()
    }

    async fn init_sign(&self, _request: &SignRequest) -> MidResult<SignResponse> {
        self.session_response()
    }

    async fn pull_certificate(
        &self,
        _request: &CertificateRequest,
    ) -> MidResult<CertificateResponse> {
        match &self.certificate {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(_)) => Err(MidError::NotMidClient),
            None => Err(MidError::internal("no certificate scripted")),
        }
    }

    async fn pull_session_status(
        &self,
        request: &SessionStatusRequest,
    ) -> MidResult<SessionStatus> {
        self.status_requests.lock().unwrap().push(request.clone());
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(MidError::internal("no more statuses scripted")))
    }
}
