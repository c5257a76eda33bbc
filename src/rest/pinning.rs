//! TLS public key pinning.
//!
//! Pins use the curl `CURLOPT_PINNEDPUBLICKEY` notation: one or more
//! `sha256//<base64 of SHA-256(SubjectPublicKeyInfo)>` entries separated by `;`.

use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rustls::client::{Resumption, WebPkiServerVerifier};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, ring};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{
    CertificateError, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme,
};
use tracing::{debug, error};
use x509_parser::parse_x509_certificate;

use crate::error::{MidError, MidResult};
use crate::hash::HashType;

/// Message carried by the handshake error when the server key is not pinned.
pub const PINNED_KEY_MISMATCH: &str = "public key does not match pinned public key";

const SHA256_PREFIX: &str = "sha256//";

/// Set of trusted SHA-256 hashes of server public keys. Never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct PinnedPublicKeys(Vec<Vec<u8>>);

impl PinnedPublicKeys {
    /// Whether the public key of the DER encoded certificate is pinned.
    pub fn matches(&self, certificate_der: &[u8]) -> MidResult<bool> {
        let key_hash = spki_sha256(certificate_der)?;
        Ok(self.0.iter().any(|pin| *pin == key_hash))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for PinnedPublicKeys {
    type Err = MidError;

    fn from_str(pins: &str) -> Result<Self, Self::Err> {
        let mut hashes = Vec::new();
        for pin in pins.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let encoded = pin.strip_prefix(SHA256_PREFIX).ok_or_else(|| {
                MidError::configuration(format!(
                    "pinned public key '{pin}' must start with '{SHA256_PREFIX}'"
                ))
            })?;
            let hash = STANDARD.decode(encoded).map_err(|e| {
                MidError::configuration(format!(
                    "pinned public key '{pin}' is not valid base64: {e}"
                ))
            })?;
            if hash.len() != HashType::SHA256.length_in_bytes() {
                return Err(MidError::configuration(format!(
                    "pinned public key '{pin}' is not a SHA-256 hash"
                )));
            }
            hashes.push(hash);
        }

        if hashes.is_empty() {
            return Err(MidError::configuration(
                "You need to set hash value(s) of trusted API host SSL public keys",
            ));
        }
        Ok(Self(hashes))
    }
}

impl fmt::Debug for PinnedPublicKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(|hash| encode_pin(hash)))
            .finish()
    }
}

fn encode_pin(hash: &[u8]) -> String {
    format!("{SHA256_PREFIX}{}", STANDARD.encode(hash))
}

fn spki_sha256(certificate_der: &[u8]) -> MidResult<Vec<u8>> {
    let (_, certificate) = parse_x509_certificate(certificate_der)
        .map_err(|e| MidError::internal(format!("failed to parse server certificate: {e}")))?;
    Ok(HashType::SHA256.digest(certificate.public_key().raw))
}

/// Computes the pin string of a DER encoded certificate, in the format
/// accepted by [`PinnedPublicKeys::from_str`].
pub fn public_key_pin(certificate_der: &[u8]) -> MidResult<String> {
    Ok(encode_pin(&spki_sha256(certificate_der)?))
}

/// Certificate verifier that rejects servers whose key is not pinned, then
/// applies the usual chain and host name checks.
#[derive(Debug)]
pub struct PinnedKeyVerifier {
    pins: PinnedPublicKeys,
    inner: Arc<WebPkiServerVerifier>,
}

impl PinnedKeyVerifier {
    pub fn new(pins: PinnedPublicKeys, provider: Arc<CryptoProvider>) -> MidResult<Self> {
        let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let inner = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider)
            .build()
            .map_err(|e| {
                MidError::configuration(format!("failed to build certificate verifier: {e}"))
            })?;
        Ok(Self { pins, inner })
    }
}

impl ServerCertVerifier for PinnedKeyVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        match self.pins.matches(end_entity.as_ref()) {
            Ok(true) => debug!("Server public key matches a pinned key"),
            Ok(false) => {
                error!("Server {server_name:?} presented a key that is not pinned");
                return Err(rustls::Error::General(PINNED_KEY_MISMATCH.to_string()));
            }
            Err(e) => {
                error!("Cannot read server certificate: {}", e);
                return Err(rustls::Error::InvalidCertificate(
                    CertificateError::BadEncoding,
                ));
            }
        }

        self.inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// Builds the rustls client configuration enforcing `pins`.
///
/// Session resumption is disabled: a resumed handshake carries no server
/// certificate, so the pin could not be checked.
pub fn client_config(pins: PinnedPublicKeys) -> MidResult<ClientConfig> {
    let provider = Arc::new(ring::default_provider());
    let verifier = PinnedKeyVerifier::new(pins, provider.clone())?;

    let mut config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| MidError::configuration(format!("unsupported TLS configuration: {e}")))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth();
    config.resumption = Resumption::disabled();
    Ok(config)
}

/// Whether any error in the chain reports a pinned key mismatch.
pub fn is_pinned_key_mismatch(error: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if err.to_string().contains(PINNED_KEY_MISMATCH) {
            return true;
        }
        current = err.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use openssl::asn1::Asn1Time;
    use openssl::hash::MessageDigest;
    use openssl::pkey::PKey;
    use openssl::rsa::Rsa;
    use openssl::x509::{X509Builder, X509NameBuilder};

    use super::*;

    fn self_signed_certificate() -> Vec<u8> {
        let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", "localhost").unwrap();
        let name = name.build();

        let mut builder = X509Builder::new().unwrap();
        builder.set_version(2).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&key).unwrap();
        builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
        builder.set_not_after(&Asn1Time::days_from_now(1).unwrap()).unwrap();
        builder.sign(&key, MessageDigest::sha256()).unwrap();
        builder.build().to_der().unwrap()
    }

    fn zero_pin() -> String {
        format!("{SHA256_PREFIX}{}", STANDARD.encode([0u8; 32]))
    }

    #[test]
    fn test_parse_pins() {
        let pins: PinnedPublicKeys = format!("{};{}", zero_pin(), zero_pin())
            .parse()
            .unwrap();
        assert_eq!(pins.len(), 2);

        let empty = "".parse::<PinnedPublicKeys>();
        assert!(matches!(empty, Err(MidError::Configuration(_))));
        assert!("sha1//AAAA".parse::<PinnedPublicKeys>().is_err());
        assert!("sha256//not-base64".parse::<PinnedPublicKeys>().is_err());
        assert!("sha256//AAAA".parse::<PinnedPublicKeys>().is_err());
    }

    #[test]
    fn test_pin_of_certificate_matches() {
        let certificate = self_signed_certificate();
        let pin = public_key_pin(&certificate).unwrap();

        let pins: PinnedPublicKeys = format!("{};{pin}", zero_pin()).parse().unwrap();
        assert!(pins.matches(&certificate).unwrap());

        let other: PinnedPublicKeys = zero_pin().parse().unwrap();
        assert!(!other.matches(&certificate).unwrap());
    }

    #[test]
    fn test_verifier_rejects_unpinned_key() {
        let certificate = CertificateDer::from(self_signed_certificate());
        let verifier = PinnedKeyVerifier::new(
            zero_pin().parse().unwrap(),
            Arc::new(ring::default_provider()),
        )
        .unwrap();

        let err = verifier
            .verify_server_cert(
                &certificate,
                &[],
                &ServerName::try_from("localhost").unwrap(),
                &[],
                UnixTime::now(),
            )
            .unwrap_err();
        assert!(is_pinned_key_mismatch(&err));
    }

    #[test]
    fn test_verifier_still_checks_chain_for_pinned_key() {
        let der = self_signed_certificate();
        let pins: PinnedPublicKeys = public_key_pin(&der).unwrap().parse().unwrap();
        let provider = Arc::new(ring::default_provider());
        let verifier = PinnedKeyVerifier::new(pins, provider).unwrap();

        let err = verifier
            .verify_server_cert(
                &CertificateDer::from(der),
                &[],
                &ServerName::try_from("localhost").unwrap(),
                &[],
                UnixTime::now(),
            )
            .unwrap_err();
        assert!(!is_pinned_key_mismatch(&err));
        assert!(matches!(err, rustls::Error::InvalidCertificate(_)));
    }

    #[test]
    fn test_client_config_builds() {
        assert!(client_config(zero_pin().parse().unwrap()).is_ok());
    }

    #[test]
    fn test_client_config_disables_resumption() {
        let config = client_config(zero_pin().parse().unwrap()).unwrap();

        let resumption = format!("{:?}", config.resumption);
        assert!(resumption.contains("NoClientSessionStorage"));
        assert!(resumption.contains("Disabled"));
    }
}
