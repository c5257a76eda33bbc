//! REST transport: request/response bodies, the connector and the session poller.

pub mod connector;
pub mod dao;
pub mod pinning;
pub mod poller;
pub mod result_codes;

#[cfg(test)]
pub(crate) mod mock;

pub use connector::{ConnectorConfig, MobileIdConnector, MobileIdRestConnector};
pub use pinning::PinnedPublicKeys;
pub use poller::{PollerConfig, SessionStatusPoller};
