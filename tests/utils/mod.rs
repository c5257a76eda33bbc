use std::net::SocketAddr;

use axum::{Router, routing::post};
use axum_server::{Handle, tls_openssl::OpenSSLConfig};
use mid_rest_client::rest::{ConnectorConfig, MobileIdRestConnector};
use mid_rest_client::telemetry;
use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::extension::{BasicConstraints, KeyUsage, SubjectAlternativeName};
use openssl::x509::{X509, X509Builder, X509Name, X509NameBuilder};

pub const RELYING_PARTY_UUID: &str = "00000000-0000-0000-0000-000000000000";
pub const RELYING_PARTY_NAME: &str = "DEMO";
/// Never matches a real key, plain HTTP tests do not perform a handshake.
pub const UNUSED_PIN: &str = "sha256//AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

#[allow(dead_code)]
pub struct ServerCertificate {
    pub cert: X509,
    pub key: PKey<Private>,
}

#[allow(dead_code)]
impl ServerCertificate {
    pub fn der(&self) -> Vec<u8> {
        self.cert.to_der().unwrap()
    }
}

/// Connector with a default relying party pointed at a plain HTTP endpoint.
#[allow(dead_code)]
pub fn connector(endpoint_url: &str) -> MobileIdRestConnector {
    telemetry::init_tracing();
    MobileIdRestConnector::new(
        ConnectorConfig::new(endpoint_url)
            .with_ssl_pinned_public_keys(UNUSED_PIN)
            .with_relying_party_uuid(RELYING_PARTY_UUID)
            .with_relying_party_name(RELYING_PARTY_NAME),
    )
    .unwrap()
}

/// Starts an HTTPS server answering every certificate request, returns its URL.
#[allow(dead_code)]
pub async fn spawn_tls_server(certificate: &ServerCertificate) -> String {
    telemetry::init_tracing();

    let tls_config = OpenSSLConfig::from_pem(
        &certificate.cert.to_pem().unwrap(),
        &certificate.key.private_key_to_pem_pkcs8().unwrap(),
    )
    .unwrap();
    let app = Router::new().route(
        "/mid-api/certificate",
        post(|| async { r#"{"result":"NOT_FOUND"}"# }),
    );

    let handle = Handle::new();
    let server = axum_server::bind_openssl(SocketAddr::from(([127, 0, 0, 1], 0)), tls_config)
        .handle(handle.clone())
        .serve(app.into_make_service());
    tokio::spawn(server);

    let addr = handle.listening().await.unwrap();
    format!("https://localhost:{}/mid-api", addr.port())
}

/// Self-signed certificate for `localhost`, not trusted by any root store.
#[allow(dead_code)]
pub fn generate_server_certificate() -> ServerCertificate {
    let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

    let mut cert_builder = X509Builder::new().unwrap();
    cert_builder.set_version(2).unwrap();
    cert_builder
        .set_serial_number(&generate_serial_number())
        .unwrap();

    let subject_name =
        create_x509_name(&[("C", "EE"), ("O", "Test"), ("CN", "localhost")]).unwrap();
    cert_builder.set_subject_name(&subject_name).unwrap();
    cert_builder.set_issuer_name(&subject_name).unwrap();
    cert_builder.set_pubkey(&key).unwrap();

    cert_builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    cert_builder
        .set_not_after(&Asn1Time::days_from_now(365).unwrap())
        .unwrap();

    cert_builder
        .append_extension(BasicConstraints::new().build().unwrap())
        .unwrap();
    cert_builder
        .append_extension(
            KeyUsage::new()
                .critical()
                .digital_signature()
                .key_encipherment()
                .build()
                .unwrap(),
        )
        .unwrap();
    cert_builder
        .append_extension(
            SubjectAlternativeName::new()
                .dns("localhost")
                .ip("127.0.0.1")
                .build(&cert_builder.x509v3_context(None, None))
                .unwrap(),
        )
        .unwrap();

    cert_builder.sign(&key, MessageDigest::sha256()).unwrap();

    ServerCertificate {
        cert: cert_builder.build(),
        key,
    }
}

fn generate_serial_number() -> Asn1Integer {
    let mut serial = BigNum::new().unwrap();
    serial.rand(128, MsbOption::MAYBE_ZERO, false).unwrap();
    serial.to_asn1_integer().unwrap()
}

fn create_x509_name(entries: &[(&str, &str)]) -> Result<X509Name, openssl::error::ErrorStack> {
    let mut name_builder = X509NameBuilder::new()?;
    for (key, value) in entries {
        name_builder.append_entry_by_text(key, value)?;
    }
    Ok(name_builder.build())
}
