//! High level entry point combining a connector with a session poller.

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use tracing::{info, instrument};

use crate::authentication::MobileIdAuthentication;
use crate::error::{MidError, MidResult};
use crate::hash::HashToSign;
use crate::rest::dao::{AuthenticationRequest, CertificateRequest, SessionStatus, SignRequest};
use crate::rest::{MobileIdConnector, PollerConfig, SessionStatusPoller};

#[derive(Clone)]
pub struct MobileIdClient {
    poller: SessionStatusPoller,
    connector: Arc<dyn MobileIdConnector>,
}

impl MobileIdClient {
    pub fn new(
        connector: Arc<dyn MobileIdConnector>,
        poller_config: PollerConfig,
    ) -> MidResult<Self> {
        let poller = SessionStatusPoller::new(connector.clone(), poller_config)?;
        Ok(Self { poller, connector })
    }

    pub fn connector(&self) -> &Arc<dyn MobileIdConnector> {
        &self.connector
    }

    pub fn poller(&self) -> &SessionStatusPoller {
        &self.poller
    }

    /// Looks up the user's signing certificate and returns it DER encoded.
    #[instrument(skip_all)]
    pub async fn get_certificate(&self, request: &CertificateRequest) -> MidResult<Vec<u8>> {
        let response = self.connector.pull_certificate(request).await?;
        let cert = response.cert().ok_or_else(|| {
            MidError::internal("Certificate is missing in the certificate response")
        })?;
        STANDARD
            .decode(cert)
            .map_err(|e| MidError::internal(format!("certificate is not valid base64: {e}")))
    }

    /// Starts an authentication session and waits until the user has entered
    /// their PIN.
    #[instrument(skip_all)]
    pub async fn authenticate(
        &self,
        request: &AuthenticationRequest,
    ) -> MidResult<MobileIdAuthentication> {
        let signed_hash = HashToSign::from_base64(request.hash(), request.hash_type())?;
        let response = self.connector.init_authentication(request).await?;
        info!(session_id = %response.session_id(), "Authentication session started");

        let status = self
            .poller
            .fetch_final_authentication_session_status(response.session_id())
            .await?;
        MobileIdAuthentication::from_session(&status, &signed_hash)
    }

    /// Starts a signing session and returns its final status, which carries
    /// the signature.
    #[instrument(skip_all)]
    pub async fn sign(&self, request: &SignRequest) -> MidResult<SessionStatus> {
        let response = self.connector.init_sign(request).await?;
        info!(session_id = %response.session_id(), "Signature session started");

        let status = self
            .poller
            .fetch_final_signature_session_status(response.session_id())
            .await?;
        if status.signature().is_none() {
            return Err(MidError::internal(
                "Signature is missing in the session status response",
            ));
        }
        Ok(status)
    }
}

impl std::fmt::Debug for MobileIdClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MobileIdClient")
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::hash::HashType;
    use crate::language::Language;
    use crate::rest::dao::CertificateResponse;
    use crate::rest::mock::{MockConnector, complete, running, status};

    fn client(connector: MockConnector) -> MobileIdClient {
        MobileIdClient::new(
            Arc::new(connector),
            PollerConfig::default().with_polling_sleep(Duration::from_secs(1)),
        )
        .unwrap()
    }

    fn authentication_request(hash: &HashToSign) -> AuthenticationRequest {
        AuthenticationRequest::builder()
            .with_phone_number("+37200000766")
            .with_national_identity_number("60001019906")
            .with_hash_to_sign(hash.clone())
            .with_language(Language::ENG)
            .build()
            .unwrap()
    }

    fn certificate_response(json: &str) -> CertificateResponse {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_get_certificate_decodes_der() {
        let connector = MockConnector {
            certificate: Some(Ok(certificate_response(r#"{"result":"OK","cert":"AQID"}"#))),
            ..MockConnector::default()
        };
        let request = CertificateRequest::builder()
            .with_phone_number("+37200000766")
            .with_national_identity_number("60001019906")
            .build()
            .unwrap();

        let der = client(connector).get_certificate(&request).await.unwrap();
        assert_eq!(der, vec![1u8, 2, 3]);
    }

    #[tokio::test]
    async fn test_get_certificate_without_cert() {
        let connector = MockConnector {
            certificate: Some(Ok(certificate_response(r#"{"result":"OK"}"#))),
            ..MockConnector::default()
        };
        let request = CertificateRequest::builder()
            .with_phone_number("+37200000766")
            .with_national_identity_number("60001019906")
            .build()
            .unwrap();

        let err = client(connector)
            .get_certificate(&request)
            .await
            .unwrap_err();
        assert!(matches!(err, MidError::Internal(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_authenticate() {
        let hash = HashToSign::generate_random(HashType::SHA256);
        let connector = MockConnector::with_statuses([
            Ok(running()),
            Ok(status(
                r#"{"state":"COMPLETE","result":"OK",
                    "signature":{"value":"c2lnbmF0dXJl","algorithm":"SHA256WithECEncryption"},
                    "cert":"AQID"}"#,
            )),
        ]);

        let client = client(connector);
        let authentication = client
            .authenticate(&authentication_request(&hash))
            .await
            .unwrap();
        assert_eq!(authentication.signed_hash(), &hash);
        assert_eq!(authentication.certificate(), &[1u8, 2, 3]);
        assert_eq!(authentication.signature_value_in_base64(), "c2lnbmF0dXJl");
    }

    #[tokio::test]
    async fn test_authenticate_propagates_result_code() {
        let hash = HashToSign::generate_random(HashType::SHA256);
        let connector = MockConnector::with_statuses([Ok(complete("PHONE_ABSENT"))]);

        let err = client(connector)
            .authenticate(&authentication_request(&hash))
            .await
            .unwrap_err();
        assert!(matches!(err, MidError::PhoneNotAvailable));
    }

    #[tokio::test]
    async fn test_sign_requires_signature() {
        let hash = HashToSign::generate_random(HashType::SHA512);
        let request = SignRequest::builder()
            .with_phone_number("+37200000766")
            .with_national_identity_number("60001019906")
            .with_hash_to_sign(hash)
            .with_language(Language::EST)
            .build()
            .unwrap();

        let err = client(MockConnector::with_statuses([Ok(complete("OK"))]))
            .sign(&request)
            .await
            .unwrap_err();
        assert!(matches!(err, MidError::Internal(_)));

        let signed = client(MockConnector::with_statuses([Ok(status(
            r#"{"state":"COMPLETE","result":"OK",
                "signature":{"value":"AAAA","algorithm":"SHA512WithECEncryption"}}"#,
        ))]))
        .sign(&request)
        .await
        .unwrap();
        assert_eq!(signed.signature().unwrap().algorithm, "SHA512WithECEncryption");
    }
}
