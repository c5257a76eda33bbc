mod utils;

use mid_rest_client::MidError;
use mid_rest_client::rest::dao::CertificateRequest;
use mid_rest_client::rest::pinning::public_key_pin;
use mid_rest_client::rest::{ConnectorConfig, MobileIdConnector, MobileIdRestConnector};

fn certificate_request() -> CertificateRequest {
    CertificateRequest::builder()
        .with_phone_number("+37200000766")
        .with_national_identity_number("60001019906")
        .build()
        .unwrap()
}

fn pinned_connector(endpoint_url: &str, pins: &str) -> MobileIdRestConnector {
    MobileIdRestConnector::new(
        ConnectorConfig::new(endpoint_url)
            .with_ssl_pinned_public_keys(pins)
            .with_relying_party_uuid(utils::RELYING_PARTY_UUID)
            .with_relying_party_name(utils::RELYING_PARTY_NAME),
    )
    .unwrap()
}

#[tokio::test]
async fn test_unpinned_server_key_is_rejected() {
    let certificate = utils::generate_server_certificate();
    let endpoint_url = utils::spawn_tls_server(&certificate).await;

    let other_key = public_key_pin(&utils::generate_server_certificate().der()).unwrap();
    let connector = pinned_connector(&endpoint_url, &other_key);

    let err = connector
        .pull_certificate(&certificate_request())
        .await
        .unwrap_err();
    match err {
        MidError::SslPinning { url } => assert_eq!(url, format!("{endpoint_url}/certificate")),
        other => panic!("expected SslPinning, got {other:?}"),
    }
}

#[tokio::test]
async fn test_pinned_key_on_untrusted_chain_is_not_a_pinning_error() {
    let certificate = utils::generate_server_certificate();
    let endpoint_url = utils::spawn_tls_server(&certificate).await;

    // The pinned key matches, but the self-signed certificate chains to no trusted root
    let pins = format!(
        "{};{}",
        utils::UNUSED_PIN,
        public_key_pin(&certificate.der()).unwrap()
    );
    let connector = pinned_connector(&endpoint_url, &pins);

    let err = connector
        .pull_certificate(&certificate_request())
        .await
        .unwrap_err();
    assert!(matches!(err, MidError::Internal(_)), "got {err:?}");
}
