use std::{collections::HashMap, sync::Arc, time::Duration};

use config::{Config as ConfigLib, ConfigError, Environment, File};
use serde::Deserialize;

use crate::client::MobileIdClient;
use crate::error::MidResult;
use crate::rest::{ConnectorConfig, MobileIdRestConnector, PollerConfig};

pub const DEMO_ENDPOINT_URL: &str = "https://tsp.demo.sk.ee/mid-api";
pub const DEMO_RELYING_PARTY_UUID: &str = "00000000-0000-0000-0000-000000000000";
pub const DEMO_RELYING_PARTY_NAME: &str = "DEMO";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub connector: ConnectorSettings,
    #[serde(default)]
    pub poller: PollerSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorSettings {
    pub endpoint_url: String,
    pub relying_party_uuid: Option<String>,
    pub relying_party_name: Option<String>,
    /// `sha256//<base64>` pins separated by `;`.
    pub ssl_pinned_public_keys: Option<String>,
    pub network_interface: Option<String>,
    #[serde(default)]
    pub custom_headers: HashMap<String, String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PollerSettings {
    pub polling_sleep_secs: Option<u64>,
    pub long_poll_timeout_secs: Option<u64>,
}

impl ConnectorSettings {
    pub fn to_connector_config(&self) -> ConnectorConfig {
        let mut config = ConnectorConfig::new(&self.endpoint_url);
        config.relying_party.uuid = self.relying_party_uuid.clone();
        config.relying_party.name = self.relying_party_name.clone();
        config.ssl_pinned_public_keys = self.ssl_pinned_public_keys.clone();
        config.network_interface = self.network_interface.clone();
        config.request_timeout = self.request_timeout_secs.map(Duration::from_secs);

        let mut headers: Vec<_> = self.custom_headers.iter().collect();
        headers.sort();
        for (name, value) in headers {
            config = config.with_custom_header(name, value);
        }
        config
    }
}

impl PollerSettings {
    pub fn to_poller_config(&self) -> PollerConfig {
        PollerConfig {
            polling_sleep: self.polling_sleep_secs.map(Duration::from_secs),
            long_poll_timeout: self.long_poll_timeout_secs.map(Duration::from_secs),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_sources(None)
    }

    pub fn load_with_sources(
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ConfigLib::builder()
            .set_default("connector.endpoint_url", DEMO_ENDPOINT_URL)?
            .set_default("connector.relying_party_uuid", DEMO_RELYING_PARTY_UUID)?
            .set_default("connector.relying_party_name", DEMO_RELYING_PARTY_NAME)?
            .add_source(File::with_name("config/settings").required(false));

        // Explicit sources replace the process environment so tests stay isolated
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // Format: MID_CONNECTOR__ENDPOINT_URL or MID_POLLER__POLLING_SLEEP_SECS
            builder = builder.add_source(
                Environment::with_prefix("MID")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        builder.build()?.try_deserialize()
    }

    /// Creates the REST connector described by the `connector` section.
    pub fn connector(&self) -> MidResult<MobileIdRestConnector> {
        MobileIdRestConnector::new(self.connector.to_connector_config())
    }

    pub fn poller(&self) -> PollerConfig {
        self.poller.to_poller_config()
    }

    pub fn client(&self) -> MidResult<MobileIdClient> {
        MobileIdClient::new(Arc::new(self.connector()?), self.poller())
    }
}
