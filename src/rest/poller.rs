use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, instrument};

use super::connector::MobileIdConnector;
use super::dao::{SessionStatus, SessionStatusRequest};
use super::result_codes::validate_session_result;
use crate::error::{MidError, MidResult};


/// Sleep between polls when neither a sleep nor long polling is configured.
pub const DEFAULT_POLLING_SLEEP: Duration = Duration::from_secs(3);

/// Long poll used by the authentication and signature shortcuts when none is
/// configured.
pub const DEFAULT_LONG_POLL_TIMEOUT: Duration = Duration::from_secs(20);

/// Settings of a [`SessionStatusPoller`].
///
/// | `polling_sleep` | `long_poll_timeout` | behaviour                          |
/// |-----------------|---------------------|------------------------------------|
/// | unset           | unset               | sleep [`DEFAULT_POLLING_SLEEP`]    |
/// | unset           | set                 | no client sleep, service waits     |
/// | set             | any                 | sleep the given duration           |
///
/// A long poll timeout under one millisecond, or a zero sleep without long
/// polling, is rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollerConfig {
    pub polling_sleep: Option<Duration>,
    pub long_poll_timeout: Option<Duration>,
}

impl PollerConfig {
    pub fn with_polling_sleep(mut self, sleep: Duration) -> Self {
        self.polling_sleep = Some(sleep);
        self
    }

    pub fn with_long_poll_timeout(mut self, timeout: Duration) -> Self {
        self.long_poll_timeout = Some(timeout);
        self
    }
}

/// Polls a session until the service reports a final state, then checks its
/// result code.
#[derive(Clone)]
pub struct SessionStatusPoller {
    connector: Arc<dyn MobileIdConnector>,
    polling_sleep: Duration,
    long_poll_timeout: Option<Duration>,
}

impl SessionStatusPoller {
    /// # Errors
    /// Returns [`MidError::Configuration`] for the combinations rejected by
    /// [`PollerConfig`].
    pub fn new(connector: Arc<dyn MobileIdConnector>, config: PollerConfig) -> MidResult<Self> {
        if config.long_poll_timeout.is_some_and(|t| t.as_millis() == 0) {
            return Err(MidError::configuration(
                "long poll timeout must be at least one millisecond",
            ));
        }

        let polling_sleep = match (config.polling_sleep, config.long_poll_timeout) {
            (Some(sleep), None) if sleep.is_zero() => {
                return Err(MidError::configuration(
                    "polling sleep of zero requires a long poll timeout",
                ));
            }
            (Some(sleep), _) => sleep,
            (None, Some(_)) => Duration::ZERO,
            (None, None) => DEFAULT_POLLING_SLEEP,
        };

        Ok(Self {
            connector,
            polling_sleep,
            long_poll_timeout: config.long_poll_timeout,
        })
    }

    pub fn polling_sleep(&self) -> Duration {
        self.polling_sleep
    }

    pub fn long_poll_timeout(&self) -> Option<Duration> {
        self.long_poll_timeout
    }

    /// Waits for a signing session, long polling for
    /// [`DEFAULT_LONG_POLL_TIMEOUT`] unless another timeout is configured.
    pub async fn fetch_final_signature_session_status(
        &self,
        session_id: &str,
    ) -> MidResult<SessionStatus> {
        let long_poll = self.long_poll_timeout.unwrap_or(DEFAULT_LONG_POLL_TIMEOUT);
        self.fetch_final_session_status_with_long_poll(session_id, Some(long_poll))
            .await
    }

    /// Waits for an authentication session, long polling for
    /// [`DEFAULT_LONG_POLL_TIMEOUT`] unless another timeout is configured.
    pub async fn fetch_final_authentication_session_status(
        &self,
        session_id: &str,
    ) -> MidResult<SessionStatus> {
        let long_poll = self.long_poll_timeout.unwrap_or(DEFAULT_LONG_POLL_TIMEOUT);
        self.fetch_final_session_status_with_long_poll(session_id, Some(long_poll))
            .await
    }

    /// Waits for the session to finish using the configured long poll timeout.
    pub async fn fetch_final_session_status(&self, session_id: &str) -> MidResult<SessionStatus> {
        self.fetch_final_session_status_with_long_poll(session_id, self.long_poll_timeout)
            .await
    }

    /// Waits for the session to finish, asking the service to hold each
    /// status response for up to `long_poll` while the session is running.
    ///
    /// Without a long poll the client sleeps between requests, using
    /// [`DEFAULT_POLLING_SLEEP`] if the poller was configured for long polling
    /// only.
    ///
    /// The returned status is guaranteed to carry the `OK` result code; any
    /// other code is turned into the matching [`MidError`].
    #[instrument(skip(self))]
    pub async fn fetch_final_session_status_with_long_poll(
        &self,
        session_id: &str,
        long_poll: Option<Duration>,
    ) -> MidResult<SessionStatus> {
        let status = self
            .poll_for_final_session_status(session_id, long_poll)
            .await?;
        validate_result(&status)?;
        Ok(status)
    }

    async fn poll_for_final_session_status(
        &self,
        session_id: &str,
        long_poll: Option<Duration>,
    ) -> MidResult<SessionStatus> {
        let mut request = SessionStatusRequest::new(session_id);
        if let Some(timeout) = long_poll {
            let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            if timeout_ms == 0 {
                return Err(MidError::parameter(
                    "long poll timeout must be at least one millisecond",
                ));
            }
            request = request.with_timeout_ms(timeout_ms);
        }

        let polling_sleep = match long_poll {
            None if self.polling_sleep.is_zero() => DEFAULT_POLLING_SLEEP,
            _ => self.polling_sleep,
        };

        loop {
            debug!("Polling session status");
            let status = self.connector.pull_session_status(&request).await?;

            if status.is_complete() {
                debug!("Session is complete");
                return Ok(status);
            }
            if !status.is_running() {
                debug!(
                    "Got final session status response with state {}",
                    status.state()
                );
                return Ok(status);
            }

            if !polling_sleep.is_zero() {
                debug!("Sleeping for {:?}", polling_sleep);
                tokio::time::sleep(polling_sleep).await;
            }
        }
    }
}

impl std::fmt::Debug for SessionStatusPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStatusPoller")
            .field("polling_sleep", &self.polling_sleep)
            .field("long_poll_timeout", &self.long_poll_timeout)
            .finish_non_exhaustive()
    }
}

fn validate_result(status: &SessionStatus) -> MidResult<()> {
    match status.result() {
        Some(result) => validate_session_result(result),
        None => {
            error!("Result is missing in the session status response");
            Err(MidError::internal(
                "Result is missing in the session status response",
            ))
        }
    }
}
