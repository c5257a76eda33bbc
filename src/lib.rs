//! Client for the Mobile-ID REST service: start authentication and signing
//! sessions, pull signing certificates and poll sessions to completion.

pub mod authentication;
pub mod client;
pub mod config;
pub mod error;
pub mod hash;
pub mod input;
pub mod language;
pub mod rest;
pub mod telemetry;

pub use authentication::{AuthenticationIdentity, MobileIdAuthentication};
pub use client::MobileIdClient;
pub use error::{MidError, MidResult};
pub use hash::{HashToSign, HashType};
pub use language::{DisplayTextFormat, Language};
