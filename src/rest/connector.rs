use std::error::Error as StdError;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder, StatusCode, Url, redirect};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, instrument};

use super::dao::{
    AuthenticationRequest, AuthenticationResponse, CertificateRequest, CertificateResponse,
    RelyingParty, RelyingPartyRequest, SessionStatus, SessionStatusRequest, SignRequest,
    SignResponse,
};
use super::pinning::{self, PinnedPublicKeys};
use super::result_codes::{error_for_status, validate_certificate_result};
use crate::error::{MidError, MidResult};

pub const AUTHENTICATION_PATH: &str = "/authentication";
pub const SIGNATURE_PATH: &str = "/signature";
pub const CERTIFICATE_PATH: &str = "/certificate";
pub const SESSION_STATUS_PATH: &str = "/session";

/// Operations offered by the Mobile-ID REST service.
#[async_trait]
pub trait MobileIdConnector: Send + Sync {
    async fn init_authentication(
        &self,
        request: &AuthenticationRequest,
    ) -> MidResult<AuthenticationResponse>;

    async fn init_sign(&self, request: &SignRequest) -> MidResult<SignResponse>;

    async fn pull_certificate(
        &self,
        request: &CertificateRequest,
    ) -> MidResult<CertificateResponse>;

    async fn pull_session_status(
        &self,
        request: &SessionStatusRequest,
    ) -> MidResult<SessionStatus>;
}

/// Settings of a [`MobileIdRestConnector`].
#[derive(Debug, Clone, Default)]
pub struct ConnectorConfig {
    pub endpoint_url: String,
    /// Used for requests that do not name their own relying party.
    pub relying_party: RelyingParty,
    /// Mandatory, see [`PinnedPublicKeys`] for the format.
    pub ssl_pinned_public_keys: Option<String>,
    /// Local IP address or interface name to send requests from.
    pub network_interface: Option<String>,
    pub custom_headers: Vec<(String, String)>,
    pub request_timeout: Option<Duration>,
}

impl ConnectorConfig {
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            ..Self::default()
        }
    }

    pub fn with_relying_party_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.relying_party.uuid = Some(uuid.into());
        self
    }

    pub fn with_relying_party_name(mut self, name: impl Into<String>) -> Self {
        self.relying_party.name = Some(name.into());
        self
    }

    pub fn with_ssl_pinned_public_keys(mut self, pins: impl Into<String>) -> Self {
        self.ssl_pinned_public_keys = Some(pins.into());
        self
    }

    pub fn with_network_interface(mut self, interface: impl Into<String>) -> Self {
        self.network_interface = Some(interface.into());
        self
    }

    /// Adds a header sent with every request.
    ///
    /// `Content-Type` and `Content-Length` are always set by the connector and
    /// cannot be overridden here.
    pub fn with_custom_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

/// Connector talking to the service over HTTPS with public key pinning.
///
/// The connector never changes after construction and can be shared between
/// pollers running on different sessions.
#[derive(Debug, Clone)]
pub struct MobileIdRestConnector {
    endpoint_url: String,
    relying_party: RelyingParty,
    custom_headers: HeaderMap,
    http_client: Client,
}

impl MobileIdRestConnector {
    /// Validates `config` and creates the connector.
    ///
    /// # Errors
    /// Returns [`MidError::Configuration`] when no pinned public key is set, a
    /// pin or custom header is malformed, the endpoint is not an http(s) URL,
    /// or the network interface cannot be bound on this platform.
    pub fn new(config: ConnectorConfig) -> MidResult<Self> {
        let pins: PinnedPublicKeys = config
            .ssl_pinned_public_keys
            .as_deref()
            .ok_or_else(|| {
                MidError::configuration(
                    "You need to set hash value(s) of trusted API host SSL public keys",
                )
            })?
            .parse()?;

        let endpoint = Url::parse(&config.endpoint_url).map_err(|e| {
            MidError::configuration(format!("invalid endpoint URL '{}': {e}", config.endpoint_url))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(MidError::configuration(format!(
                "endpoint URL '{}' must use http or https",
                config.endpoint_url
            )));
        }

        let mut builder = Client::builder()
            .use_preconfigured_tls(pinning::client_config(pins)?)
            .redirect(redirect::Policy::none())
            // no pooled connections and no TLS resumption, so every request
            // goes through a full handshake and a pin check
            .pool_max_idle_per_host(0);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let interface = config.network_interface.as_deref();
        if let Some(interface) = interface.filter(|i| !i.is_empty()) {
            debug!("Binding outgoing connections to {}", interface);
            builder = bind_interface(builder, interface)?;
        }
        let http_client = builder.build().map_err(|e| {
            MidError::configuration(format!("Failed to create HTTP client: {e}"))
        })?;

        Ok(Self {
            endpoint_url: config.endpoint_url.trim_end_matches('/').to_string(),
            relying_party: config.relying_party,
            custom_headers: parse_custom_headers(&config.custom_headers)?,
            http_client,
        })
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    pub fn relying_party(&self) -> &RelyingParty {
        &self.relying_party
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint_url, path)
    }

    fn session_status_url(&self, request: &SessionStatusRequest) -> String {
        let mut url = format!(
            "{}{}/{}",
            self.endpoint_url,
            SESSION_STATUS_PATH,
            urlencoding::encode(request.session_id())
        );
        if let Some(timeout_ms) = request.timeout_ms() {
            url.push_str(&format!("?timeoutMs={timeout_ms}"));
        }
        url
    }

    /// Returns a copy of `request` with the connector's relying party filling
    /// the gaps.
    fn with_relying_party_defaults<R: RelyingPartyRequest>(&self, request: &R) -> MidResult<R> {
        let relying_party = request.relying_party().merged_with(&self.relying_party)?;
        Ok(request.clone().with_relying_party(relying_party))
    }

    async fn post_request<B, T>(&self, url: &str, body: &B) -> MidResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let json = serde_json::to_string(body)
            .map_err(|e| MidError::internal(format!("failed to serialize request: {e}")))?;
        debug!("POST {} contents: {}", url, json);

        let mut headers = self.custom_headers.clone();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(json.len()));

        let response = self
            .http_client
            .post(url)
            .headers(headers)
            .body(json)
            .send()
            .await
            .map_err(|e| transport_error(url, &e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| transport_error(url, &e))?;
        parse_response(url, status, &body)
    }

    async fn get_request(&self, url: &str) -> MidResult<String> {
        let mut headers = self.custom_headers.clone();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self
            .http_client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| transport_error(url, &e))?;
        let body = response.text().await.map_err(|e| transport_error(url, &e))?;
        debug!("Result is {}", body);
        Ok(body)
    }
}

#[async_trait]
impl MobileIdConnector for MobileIdRestConnector {
    #[instrument(skip_all)]
    async fn init_authentication(
        &self,
        request: &AuthenticationRequest,
    ) -> MidResult<AuthenticationResponse> {
        let request = self.with_relying_party_defaults(request)?;
        self.post_request(&self.url(AUTHENTICATION_PATH), &request)
            .await
    }

    #[instrument(skip_all)]
    async fn init_sign(&self, request: &SignRequest) -> MidResult<SignResponse> {
        let request = self.with_relying_party_defaults(request)?;
        self.post_request(&self.url(SIGNATURE_PATH), &request).await
    }

    #[instrument(skip_all)]
    async fn pull_certificate(
        &self,
        request: &CertificateRequest,
    ) -> MidResult<CertificateResponse> {
        let request = self.with_relying_party_defaults(request)?;
        debug!(
            "Getting certificate for phone number: {}",
            request.phone_number()
        );

        let json: Value = self
            .post_request(&self.url(CERTIFICATE_PATH), &request)
            .await?;
        let response = parse_certificate_response(json)?;
        validate_certificate_result(response.result())?;
        Ok(response)
    }

    #[instrument(skip_all, fields(session_id = %request.session_id()))]
    async fn pull_session_status(
        &self,
        request: &SessionStatusRequest,
    ) -> MidResult<SessionStatus> {
        let url = self.session_status_url(request);
        debug!("Sending get request to {}", url);

        let body = self.get_request(&url).await?;
        parse_session_status(request.session_id(), &body)
    }
}

fn parse_response<T: DeserializeOwned>(
    url: &str,
    status: StatusCode,
    body: &str,
) -> MidResult<T> {
    if status == StatusCode::OK {
        return serde_json::from_str(body).map_err(|e| {
            MidError::internal(format!("POST request to '{url}' returned invalid json: {e}"))
        });
    }

    debug!("Response was '{}', status code was {}", body, status.as_u16());
    Err(error_for_status(status, body))
}

/// A certificate response with an `error` field means the relying party was
/// rejected, even though the service answered 200.
fn parse_certificate_response(json: Value) -> MidResult<CertificateResponse> {
    if let Some(error) = json.get("error") {
        let message = match error.as_str() {
            Some(text) => text.to_string(),
            None => error.to_string(),
        };
        error!("Certificate request was rejected: {}", message);
        return Err(MidError::Unauthorized(message));
    }

    serde_json::from_value(json)
        .map_err(|e| MidError::internal(format!("unexpected certificate response: {e}")))
}

fn parse_session_status(session_id: &str, body: &str) -> MidResult<SessionStatus> {
    let json: Value = serde_json::from_str(body).map_err(|e| {
        MidError::internal(format!("GET request to MID returned invalid json: {e}"))
    })?;

    match &json {
        Value::Object(fields) if !fields.is_empty() => {}
        _ => {
            return Err(MidError::internal(
                "GET request to MID returned an empty response",
            ));
        }
    }
    if json.get("error").is_some() {
        return Err(MidError::SessionNotFound(session_id.to_string()));
    }

    serde_json::from_value(json)
        .map_err(|e| MidError::internal(format!("unexpected session status response: {e}")))
}

fn transport_error(url: &str, error: &reqwest::Error) -> MidError {
    let message = format!(
        "While trying to connect to '{url}' got error: {}",
        error_chain(error)
    );
    error!("{}", message);

    if pinning::is_pinned_key_mismatch(error) {
        MidError::SslPinning {
            url: url.to_string(),
        }
    } else {
        MidError::Internal(message)
    }
}

fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut current = error.source();
    while let Some(err) = current {
        message.push_str(": ");
        message.push_str(&err.to_string());
        current = err.source();
    }
    message
}

fn parse_custom_headers(headers: &[(String, String)]) -> MidResult<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            MidError::configuration(format!("invalid header name '{name}': {e}"))
        })?;
        if name == CONTENT_TYPE || name == CONTENT_LENGTH {
            debug!("Ignoring custom header {}, it is set by the connector", name);
            continue;
        }
        let value = HeaderValue::from_str(value).map_err(|e| {
            MidError::configuration(format!("invalid value for header '{name}': {e}"))
        })?;
        map.append(name, value);
    }
    Ok(map)
}

fn bind_interface(builder: ClientBuilder, interface: &str) -> MidResult<ClientBuilder> {
    if let Ok(address) = interface.parse::<IpAddr>() {
        return Ok(builder.local_address(address));
    }
    bind_interface_name(builder, interface)
}

#[cfg(any(target_os = "android", target_os = "fuchsia", target_os = "linux"))]
fn bind_interface_name(builder: ClientBuilder, interface: &str) -> MidResult<ClientBuilder> {
    Ok(builder.interface(interface))
}

#[cfg(not(any(target_os = "android", target_os = "fuchsia", target_os = "linux")))]
fn bind_interface_name(_builder: ClientBuilder, interface: &str) -> MidResult<ClientBuilder> {
    Err(MidError::configuration(format!(
        "binding to network interface '{interface}' by name is not supported here, \
         use an IP address"
    )))
}
